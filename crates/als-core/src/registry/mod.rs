//! Module registry: per-resource load state, attempt counts, sizes.
//!
//! One owned, dependency-injected instance per scheduler (never a
//! global), shared behind an `Arc`. The runtime is cooperative, so the
//! only hazard is a logical race: two callers both seeing `Idle` and
//! both starting a fetch. `begin` closes that window by checking state
//! and marking `Loading` under a single mutex lock with no suspension
//! point in between.

mod record;
mod report;

pub use record::{LoadOutcome, LoadRecord, LoadState, LoadStatus};
pub use report::{ModuleReportEntry, ModulesReport};

use crate::config::{ConfigTable, ResourceConfig, ResourceKey};
use crate::error::LoadError;
use crate::importer::ModulePayload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Result of an atomic check-and-mark on one key.
pub(crate) enum Begin {
    /// Already loaded; the cached value.
    Cached(Arc<ModulePayload>),
    /// Terminal failure already recorded; the cached error.
    Failed(LoadError),
    /// A flight is in progress; attached to it.
    Wait(oneshot::Receiver<LoadOutcome>),
    /// This caller moved the record `Idle → Loading` and must drive
    /// the flight (the single-flight winner).
    Start(oneshot::Receiver<LoadOutcome>),
}

/// Tracks every requested resource for the life of the process.
/// Records are never evicted: this is a within-session cache.
pub struct ModuleRegistry {
    table: ConfigTable,
    records: Mutex<HashMap<ResourceKey, LoadRecord>>,
}

impl ModuleRegistry {
    pub fn new(table: ConfigTable) -> Self {
        Self {
            table,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Static config for a key, if registered.
    pub fn config(&self, key: &ResourceKey) -> Option<&ResourceConfig> {
        self.table.get(key)
    }

    pub fn table(&self) -> &ConfigTable {
        &self.table
    }

    /// Pure read; never creates a record or triggers loading.
    pub fn status(&self, key: &ResourceKey) -> LoadStatus {
        self.records
            .lock()
            .unwrap()
            .get(key)
            .map(LoadRecord::status)
            .unwrap_or(LoadStatus::Idle)
    }

    /// Attempt count so far for a key (0 if never requested).
    pub fn attempts(&self, key: &ResourceKey) -> u32 {
        self.records
            .lock()
            .unwrap()
            .get(key)
            .map(|r| r.attempts)
            .unwrap_or(0)
    }

    /// Atomic check-and-mark. Creates the record on first request,
    /// seeding `size_bytes` from the config's size hint.
    pub(crate) fn begin(&self, key: &ResourceKey) -> Result<Begin, LoadError> {
        let size_hint = match self.table.get(key) {
            Some(cfg) => cfg.size_hint,
            None => return Err(LoadError::UnknownKey { key: key.clone() }),
        };

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(key.clone())
            .or_insert_with(|| LoadRecord::new(size_hint));

        match &record.state {
            LoadState::Loaded(payload) => Ok(Begin::Cached(Arc::clone(payload))),
            LoadState::Failed(err) => Ok(Begin::Failed(err.clone())),
            LoadState::Loading => {
                let (tx, rx) = oneshot::channel();
                record.waiters.push(tx);
                Ok(Begin::Wait(rx))
            }
            LoadState::Idle => {
                record.state = LoadState::Loading;
                let (tx, rx) = oneshot::channel();
                record.waiters.push(tx);
                Ok(Begin::Start(rx))
            }
        }
    }

    /// Attach another waiter to a key that is already `Loading`.
    /// Test hook; production callers always attach through `begin`.
    #[cfg(test)]
    pub(crate) fn attach(&self, key: &ResourceKey) -> Option<oneshot::Receiver<LoadOutcome>> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(key)?;
        match record.state {
            LoadState::Loading => {
                let (tx, rx) = oneshot::channel();
                record.waiters.push(tx);
                Some(rx)
            }
            _ => None,
        }
    }

    /// Record one failed attempt; the key stays `Loading`. Returns the
    /// new attempt count.
    pub(crate) fn note_attempt_failure(&self, key: &ResourceKey) -> u32 {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(key) {
            Some(record) => {
                record.attempts = record.attempts.saturating_add(1);
                record.attempts
            }
            None => 0,
        }
    }

    /// Terminal success: cache the payload, record its actual size,
    /// resolve every attached waiter with the same value.
    pub(crate) fn complete(&self, key: &ResourceKey, payload: ModulePayload) {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(key) else {
            return;
        };
        let payload = Arc::new(payload);
        record.attempts = record.attempts.saturating_add(1);
        record.size_bytes = Some(payload.size_bytes());
        record.state = LoadState::Loaded(Arc::clone(&payload));
        for waiter in record.waiters.drain(..) {
            // A closed receiver means the caller withdrew; the cache
            // is warm either way.
            let _ = waiter.send(Ok(Arc::clone(&payload)));
        }
    }

    /// Terminal failure: park the record in `Failed`, reject every
    /// attached waiter with the same error.
    pub(crate) fn fail(&self, key: &ResourceKey, error: LoadError) {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(key) else {
            return;
        };
        record.state = LoadState::Failed(error.clone());
        for waiter in record.waiters.drain(..) {
            let _ = waiter.send(Err(error.clone()));
        }
    }

    /// Manual `Failed → Idle` reset with attempts zeroed, allowing a
    /// fresh retry cycle. No-op while a flight is active or when the
    /// key is already loaded. Returns whether a reset happened.
    pub fn reset(&self, key: &ResourceKey) -> bool {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(key) {
            Some(record) if matches!(record.state, LoadState::Failed(_)) => {
                record.state = LoadState::Idle;
                record.attempts = 0;
                true
            }
            _ => false,
        }
    }

    /// Bytes actually loaded so far.
    pub fn total_loaded_size(&self) -> u64 {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| matches!(r.state, LoadState::Loaded(_)))
            .filter_map(|r| r.size_bytes)
            .sum()
    }

    /// Bytes across every record with a known size (size hints count
    /// until the real size replaces them).
    pub fn total_registered_size(&self) -> u64 {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter_map(|r| r.size_bytes)
            .sum()
    }
}
