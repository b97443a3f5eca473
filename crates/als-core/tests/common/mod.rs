//! Shared fakes for the integration tests: scripted importers, a
//! manual idle queue, and a hand-fed visibility observer. Each test
//! binary pulls in what it needs.
#![allow(dead_code)]

use als_core::config::{ConfigTable, PriorityTier, ResourceConfig, ResourceKey};
use als_core::error::ImportError;
use als_core::importer::{Importer, ModulePayload};
use als_core::scheduler::IdleScheduler;
use als_core::visibility::{IntersectionEvent, ObserveOptions, VisibilityObserver};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Builds a config table entry with sensible test defaults.
pub fn resource(key: &str, tier: PriorityTier) -> ResourceConfig {
    ResourceConfig {
        key: key.into(),
        tier,
        prefetch: true,
        preload: false,
        size_hint: None,
    }
}

pub fn table(entries: Vec<ResourceConfig>) -> ConfigTable {
    ConfigTable::from_entries(entries).unwrap()
}

/// Importer that counts invocations per key and can be scripted to
/// fail the first N attempts for a key before succeeding.
pub struct CountingImporter {
    calls: Mutex<HashMap<ResourceKey, usize>>,
    failures_remaining: Mutex<HashMap<ResourceKey, u32>>,
    latency: Duration,
    payload_bytes: usize,
}

impl CountingImporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(HashMap::new()),
            failures_remaining: Mutex::new(HashMap::new()),
            latency: Duration::from_millis(10),
            payload_bytes: 64,
        })
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(HashMap::new()),
            failures_remaining: Mutex::new(HashMap::new()),
            latency,
            payload_bytes: 64,
        })
    }

    /// The next `n` attempts for `key` will fail.
    pub fn fail_next(&self, key: &ResourceKey, n: u32) {
        self.failures_remaining
            .lock()
            .unwrap()
            .insert(key.clone(), n);
    }

    pub fn calls_for(&self, key: &ResourceKey) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl Importer for CountingImporter {
    fn import(&self, key: &ResourceKey) -> BoxFuture<'static, Result<ModulePayload, ImportError>> {
        *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
        let fail = {
            let mut failures = self.failures_remaining.lock().unwrap();
            match failures.get_mut(key) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        };
        let latency = self.latency;
        let bytes = self.payload_bytes;
        let key = key.clone();
        Box::pin(async move {
            tokio::time::sleep(latency).await;
            if fail {
                Err(ImportError::new(format!("scripted failure for {key}")))
            } else {
                Ok(ModulePayload::new(vec![0xAB; bytes]))
            }
        })
    }
}

/// Idle strategy that queues callbacks until the test drains them.
#[derive(Default)]
pub struct ManualIdle {
    queued: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    scheduled: AtomicUsize,
}

impl ManualIdle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queued_count(&self) -> usize {
        self.scheduled.load(Ordering::Relaxed)
    }

    /// Simulate an idle period: run everything queued so far.
    pub fn go_idle(&self) {
        let callbacks: Vec<_> = self.queued.lock().unwrap().drain(..).collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl IdleScheduler for ManualIdle {
    fn run_when_idle(&self, callback: Box<dyn FnOnce() + Send>) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
        self.queued.lock().unwrap().push(callback);
    }
}

/// Observer whose intersection events are fed by hand per target.
#[derive(Default)]
pub struct ScriptedObserver {
    senders: Mutex<HashMap<String, mpsc::Sender<IntersectionEvent>>>,
}

impl ScriptedObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push one intersection sample for a target. Returns false when
    /// the observation was torn down (receiver dropped).
    pub async fn emit(&self, target: &str, ratio: f64, is_intersecting: bool) -> bool {
        let sender = {
            let senders = self.senders.lock().unwrap();
            senders.get(target).cloned()
        };
        match sender {
            Some(tx) => tx
                .send(IntersectionEvent {
                    ratio,
                    is_intersecting,
                })
                .await
                .is_ok(),
            None => false,
        }
    }
}

impl VisibilityObserver for ScriptedObserver {
    fn observe(
        &self,
        target: &String,
        _options: &ObserveOptions,
    ) -> mpsc::Receiver<IntersectionEvent> {
        let (tx, rx) = mpsc::channel(8);
        self.senders.lock().unwrap().insert(target.clone(), tx);
        rx
    }
}
