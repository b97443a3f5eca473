//! Single-flight deduplicating loader with retry/backoff.
//!
//! `request` is the one entry point for actually fetching a unit. The
//! first caller for an `Idle` key wins the flight and a detached driver
//! task runs the importer under the retry policy; every later caller
//! attaches to that flight and receives the identical outcome. A caller
//! that stops awaiting detaches only itself: the driver keeps going and
//! warms the cache for future callers.

mod backoff;

pub use backoff::{Decision, RetryPolicy};

use crate::config::ResourceKey;
use crate::error::LoadError;
use crate::importer::Importer;
use crate::registry::{Begin, LoadOutcome, ModuleRegistry};
use std::sync::Arc;

/// Deduplicating loader over a shared registry. Cheap to clone.
#[derive(Clone)]
pub struct DedupLoader {
    registry: Arc<ModuleRegistry>,
    importer: Arc<dyn Importer>,
    policy: RetryPolicy,
}

impl DedupLoader {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        importer: Arc<dyn Importer>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            importer,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Request a unit: returns the cached value, attaches to an
    /// in-flight load, or starts a new flight. Must run inside a tokio
    /// runtime (the flight is a spawned task).
    pub async fn request(&self, key: &ResourceKey) -> LoadOutcome {
        let rx = match self.registry.begin(key)? {
            Begin::Cached(payload) => return Ok(payload),
            Begin::Failed(err) => return Err(err),
            Begin::Wait(rx) => rx,
            Begin::Start(rx) => {
                self.spawn_flight(key.clone());
                rx
            }
        };
        rx.await.unwrap_or_else(|_| {
            Err(LoadError::Detached { key: key.clone() })
        })
    }

    /// Explicit retry affordance: re-arm a `Failed` key and request it
    /// again. On a healthy key this is just `request`.
    pub async fn retry(&self, key: &ResourceKey) -> LoadOutcome {
        if self.registry.reset(key) {
            tracing::debug!(%key, "failed record reset for manual retry");
        }
        self.request(key).await
    }

    fn spawn_flight(&self, key: ResourceKey) {
        let registry = Arc::clone(&self.registry);
        let importer = Arc::clone(&self.importer);
        let policy = self.policy;
        tokio::spawn(async move {
            loop {
                match importer.import(&key).await {
                    Ok(payload) => {
                        tracing::debug!(%key, size = payload.size_bytes(), "module loaded");
                        registry.complete(&key, payload);
                        return;
                    }
                    Err(err) => {
                        let attempts = registry.note_attempt_failure(&key);
                        match policy.decide(attempts) {
                            Decision::RetryAfter(delay) => {
                                tracing::debug!(
                                    %key,
                                    attempt = attempts,
                                    delay_ms = delay.as_millis() as u64,
                                    error = %err,
                                    "transient load failure; backing off"
                                );
                                tokio::time::sleep(delay).await;
                            }
                            Decision::GiveUp => {
                                tracing::warn!(
                                    %key,
                                    attempts,
                                    error = %err,
                                    "load failed permanently"
                                );
                                registry.fail(
                                    &key,
                                    LoadError::Permanent {
                                        key: key.clone(),
                                        attempts,
                                        reason: err.message.into(),
                                    },
                                );
                                return;
                            }
                        }
                    }
                }
            }
        });
    }
}
