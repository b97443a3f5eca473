pub mod config;
pub mod logging;

// Core modules
pub mod error;
pub mod fidelity;
pub mod hydration;
pub mod importer;
pub mod loader;
pub mod predictor;
pub mod registry;
pub mod scheduler;
pub mod visibility;
