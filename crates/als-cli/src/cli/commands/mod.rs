mod config_cmd;
mod run;

pub use config_cmd::{run_config_init, run_config_show};
pub use run::run_session;

#[cfg(test)]
pub(crate) use run::{replay, SessionScript, Step};
