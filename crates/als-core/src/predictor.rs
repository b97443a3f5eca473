//! Interaction-sequence prefetch predictor.
//!
//! Keeps a bounded history of user interactions and, after each one,
//! predicts likely next subjects by matching the window of the two most
//! recent events against every earlier occurrence in the history.
//! Predicted subjects resolve through a route map and are scheduled at
//! low priority so speculation never contends with real work. There is
//! no decay step: the ring buffer ages stale patterns out on its own.

use crate::config::{PriorityTier, ResourceKey};
use crate::scheduler::LoadScheduler;
use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

/// Bounded history capacity; oldest events are evicted first.
pub const HISTORY_CAPACITY: usize = 50;

/// One recorded interaction (a navigation, hover, click subject).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub subject: String,
    /// Milliseconds since the Unix epoch at record time.
    pub at_ms: u64,
}

/// Frequency-table predictor over a bounded interaction ring.
pub struct InteractionPredictor {
    history: VecDeque<InteractionEvent>,
    routes: HashMap<String, ResourceKey>,
    scheduler: LoadScheduler,
}

impl InteractionPredictor {
    /// `routes` maps an interaction subject to the resource key that
    /// serves it; subjects without a route are predicted but simply
    /// not prefetched.
    pub fn new(scheduler: LoadScheduler, routes: HashMap<String, ResourceKey>) -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            routes,
            scheduler,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Record an interaction and prefetch whatever it makes likely.
    pub fn record(&mut self, subject: &str) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(InteractionEvent {
            subject: subject.to_string(),
            at_ms: now_ms(),
        });

        for predicted in self.predict_successors() {
            let Some(key) = self.routes.get(&predicted) else {
                tracing::trace!(subject = %predicted, "predicted subject has no route");
                continue;
            };
            tracing::debug!(subject = %predicted, %key, "prefetching predicted successor");
            self.scheduler.schedule_as(key, PriorityTier::Low);
        }
    }

    /// Subjects that historically followed the two most recent events,
    /// ordered by descending frequency (ties by first occurrence).
    /// Empty when the history is shorter than three events.
    pub fn predict_successors(&self) -> Vec<String> {
        if self.history.len() < 3 {
            return Vec::new();
        }
        let n = self.history.len();
        let window = (
            self.history[n - 2].subject.as_str(),
            self.history[n - 1].subject.as_str(),
        );

        // Count the event following each earlier occurrence of the
        // window; the final window itself has no successor yet.
        let mut counts: HashMap<&str, u32> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for i in 0..n - 2 {
            let pair = (
                self.history[i].subject.as_str(),
                self.history[i + 1].subject.as_str(),
            );
            if pair == window {
                let successor = self.history[i + 2].subject.as_str();
                let count = counts.entry(successor).or_insert(0);
                if *count == 0 {
                    order.push(successor);
                }
                *count += 1;
            }
        }

        order.sort_by(|a, b| counts[b].cmp(&counts[a]));
        order.into_iter().map(str::to_string).collect()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
