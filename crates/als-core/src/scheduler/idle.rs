//! Idle-time execution capability.
//!
//! Environments differ in whether a native idle primitive exists, so
//! the strategy is chosen once at scheduler construction instead of
//! being probed at each call site. The crate ships only the timer
//! fallback; a host with real idle callbacks supplies its own impl.

use std::time::Duration;

/// Runs a callback during a low-activity period.
pub trait IdleScheduler: Send + Sync {
    fn run_when_idle(&self, callback: Box<dyn FnOnce() + Send>);
}

/// Fallback strategy: approximate "idle" with a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct TimerIdle {
    pub delay: Duration,
}

impl TimerIdle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl IdleScheduler for TimerIdle {
    fn run_when_idle(&self, callback: Box<dyn FnOnce() + Send>) {
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
    }
}
