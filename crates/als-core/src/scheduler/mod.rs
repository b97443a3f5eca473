//! Priority-tiered load scheduler.
//!
//! Routes a load to immediate, timer-delayed, or idle-time dispatch
//! based on the resource's tier. Scheduling never blocks the caller:
//! every dispatch path ends in a fire-and-forget `request` whose
//! outcome lands in the registry either way.

mod idle;

pub use idle::{IdleScheduler, TimerIdle};

use crate::config::{AlsConfig, PriorityTier, ResourceConfig, ResourceKey};
use crate::loader::DedupLoader;
use std::sync::Arc;
use std::time::Duration;

/// Tier delay knobs, extracted from [`AlsConfig`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerTimings {
    /// Delay before medium-tier dispatch, to keep out of the way of
    /// above-the-fold work.
    pub medium_delay: Duration,
    /// Fallback delay for low-tier dispatch when the idle strategy is
    /// the built-in timer.
    pub low_fallback_delay: Duration,
}

impl Default for SchedulerTimings {
    fn default() -> Self {
        Self {
            medium_delay: Duration::from_millis(1000),
            low_fallback_delay: Duration::from_millis(3000),
        }
    }
}

impl From<&AlsConfig> for SchedulerTimings {
    fn from(cfg: &AlsConfig) -> Self {
        Self {
            medium_delay: Duration::from_millis(cfg.medium_delay_ms),
            low_fallback_delay: Duration::from_millis(cfg.low_fallback_delay_ms),
        }
    }
}

/// Routes loads by tier. Cheap to clone; clones share the loader.
#[derive(Clone)]
pub struct LoadScheduler {
    loader: DedupLoader,
    timings: SchedulerTimings,
    idle: Arc<dyn IdleScheduler>,
}

impl LoadScheduler {
    pub fn new(loader: DedupLoader, timings: SchedulerTimings, idle: Arc<dyn IdleScheduler>) -> Self {
        Self {
            loader,
            timings,
            idle,
        }
    }

    /// Scheduler with the built-in timer fallback as its idle strategy.
    pub fn with_timer_idle(loader: DedupLoader, timings: SchedulerTimings) -> Self {
        let idle = Arc::new(TimerIdle::new(timings.low_fallback_delay));
        Self::new(loader, timings, idle)
    }

    pub fn loader(&self) -> &DedupLoader {
        &self.loader
    }

    /// Route one resource by its configured tier.
    pub fn schedule(&self, cfg: &ResourceConfig) {
        self.schedule_as(&cfg.key, cfg.tier);
    }

    /// Route with an explicit tier, overriding the configured one.
    /// The predictor forces `Low` through here; the visibility trigger
    /// bypasses the scheduler entirely and calls `request` directly.
    pub fn schedule_as(&self, key: &ResourceKey, tier: PriorityTier) {
        match tier {
            PriorityTier::Critical | PriorityTier::High => {
                self.dispatch_now(key.clone());
            }
            PriorityTier::Medium => {
                self.dispatch_after(key.clone(), self.timings.medium_delay);
            }
            PriorityTier::Low => {
                let loader = self.loader.clone();
                let key = key.clone();
                self.idle.run_when_idle(Box::new(move || {
                    dispatch(loader, key);
                }));
            }
            PriorityTier::OnDemand => {
                tracing::trace!(%key, "on-demand tier: not auto-dispatched");
            }
        }
    }

    /// Schedule every listed key whose config opts into prefetch, at
    /// low priority. Keys without the prefetch flag are skipped.
    pub fn prefetch(&self, keys: &[ResourceKey]) {
        for key in keys {
            match self.loader.registry().config(key) {
                Some(cfg) if cfg.prefetch => self.schedule_as(key, PriorityTier::Low),
                Some(_) => tracing::trace!(%key, "prefetch skipped: not flagged"),
                None => tracing::warn!(%key, "prefetch skipped: unknown key"),
            }
        }
    }

    fn dispatch_now(&self, key: ResourceKey) {
        dispatch(self.loader.clone(), key);
    }

    fn dispatch_after(&self, key: ResourceKey, delay: Duration) {
        let loader = self.loader.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatch(loader, key);
        });
    }
}

/// Fire-and-forget request; failures are logged, the registry keeps
/// the terminal state for anyone who asks later.
fn dispatch(loader: DedupLoader, key: ResourceKey) {
    tokio::spawn(async move {
        if let Err(err) = loader.request(&key).await {
            tracing::warn!(%key, error = %err, "scheduled load failed");
        }
    });
}
