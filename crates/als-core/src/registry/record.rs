//! Per-resource load record.

use crate::error::LoadError;
use crate::importer::ModulePayload;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Terminal or in-progress outcome delivered to attached callers.
pub type LoadOutcome = Result<Arc<ModulePayload>, LoadError>;

/// Full per-key state, including the cached value or terminal error.
#[derive(Debug)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded(Arc<ModulePayload>),
    Failed(LoadError),
}

/// Copyable view of a record's state for pure status reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Bookkeeping for one resource key.
///
/// Invariant: `waiters` is non-empty only while `state` is `Loading`;
/// the waiter list is the single-flight attachment point, drained
/// exactly once when the flight reaches a terminal state.
#[derive(Debug)]
pub struct LoadRecord {
    pub state: LoadState,
    pub attempts: u32,
    pub size_bytes: Option<u64>,
    pub waiters: Vec<oneshot::Sender<LoadOutcome>>,
}

impl LoadRecord {
    pub fn new(size_hint: Option<u64>) -> Self {
        Self {
            state: LoadState::Idle,
            attempts: 0,
            size_bytes: size_hint,
            waiters: Vec::new(),
        }
    }

    pub fn status(&self) -> LoadStatus {
        match self.state {
            LoadState::Idle => LoadStatus::Idle,
            LoadState::Loading => LoadStatus::Loading,
            LoadState::Loaded(_) => LoadStatus::Loaded,
            LoadState::Failed(_) => LoadStatus::Failed,
        }
    }
}
