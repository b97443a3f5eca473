//! Incremental hydration batcher.
//!
//! Reveals a fixed set of pending UI items in priority-and-visibility
//! order, a few per batch with a pause in between, so activation work
//! never monopolizes the one thread of control. Batches are strictly
//! sequential: batch N+1 starts only after batch N completed and its
//! delay elapsed.

use crate::config::{AlsConfig, PriorityTier};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// One pending UI unit. Visibility is computed by the caller at
/// batch-build time, not tracked continuously.
#[derive(Debug, Clone, Deserialize)]
pub struct HydrationItem {
    pub id: String,
    pub tier: PriorityTier,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct HydrationOptions {
    /// Items revealed per batch.
    pub batch_size: usize,
    /// Pause after each batch before the next one starts.
    pub batch_delay: Duration,
}

impl Default for HydrationOptions {
    fn default() -> Self {
        Self {
            batch_size: 3,
            batch_delay: Duration::from_millis(100),
        }
    }
}

impl From<&AlsConfig> for HydrationOptions {
    fn from(cfg: &AlsConfig) -> Self {
        Self {
            batch_size: cfg.hydration_batch_size.max(1),
            batch_delay: Duration::from_millis(cfg.hydration_batch_delay_ms),
        }
    }
}

/// Snapshot handed to the per-batch callback.
#[derive(Debug, Clone)]
pub struct HydrationProgress {
    /// Ids revealed by the batch that just completed, in order.
    pub batch: Vec<String>,
    pub processed: usize,
    pub total: usize,
    /// `round(processed / total * 100)`.
    pub percent: u8,
}

/// Outcome of one hydration run. The run is discarded after use; a new
/// item set means a new run.
#[derive(Debug, Clone)]
pub struct HydrationReport {
    hydrated: HashSet<String>,
    /// Ids in the order they were revealed.
    pub hydrated_order: Vec<String>,
    pub batch_sizes: Vec<usize>,
    /// Percent after each batch; final entry is always 100.
    pub progress_updates: Vec<u8>,
    pub is_complete: bool,
    pub progress: u8,
}

impl HydrationReport {
    /// Pure membership query against the hydrated set.
    pub fn is_hydrated(&self, id: &str) -> bool {
        self.hydrated.contains(id)
    }

    pub fn hydrated_count(&self) -> usize {
        self.hydrated.len()
    }
}

/// Run hydration to completion with a per-batch callback.
///
/// Sort order: tier ascending (more urgent first), then visible items
/// before hidden ones within a tier. The sort is stable, so equal
/// items keep their input order.
pub async fn run_hydration_with<F>(
    items: Vec<HydrationItem>,
    options: HydrationOptions,
    mut on_batch: F,
) -> HydrationReport
where
    F: FnMut(&HydrationProgress),
{
    let total = items.len();
    if total == 0 {
        // Nothing to reveal: complete immediately, no batches, no delay.
        return HydrationReport {
            hydrated: HashSet::new(),
            hydrated_order: Vec::new(),
            batch_sizes: Vec::new(),
            progress_updates: Vec::new(),
            is_complete: true,
            progress: 100,
        };
    }

    let mut ordered = items;
    ordered.sort_by_key(|item| (item.tier, !item.visible));

    let batch_size = options.batch_size.max(1);
    let mut hydrated = HashSet::with_capacity(total);
    let mut hydrated_order = Vec::with_capacity(total);
    let mut batch_sizes = Vec::new();
    let mut progress_updates = Vec::new();
    let mut processed = 0usize;

    for chunk in ordered.chunks(batch_size) {
        let batch: Vec<String> = chunk.iter().map(|item| item.id.clone()).collect();
        for id in &batch {
            hydrated.insert(id.clone());
            hydrated_order.push(id.clone());
        }
        processed += batch.len();
        let percent = percent_of(processed, total);
        batch_sizes.push(batch.len());
        progress_updates.push(percent);
        tracing::trace!(processed, total, percent, "hydration batch complete");

        on_batch(&HydrationProgress {
            batch,
            processed,
            total,
            percent,
        });

        if processed < total {
            tokio::time::sleep(options.batch_delay).await;
        }
    }

    HydrationReport {
        hydrated,
        hydrated_order,
        batch_sizes,
        progress_updates,
        is_complete: true,
        progress: 100,
    }
}

/// Run hydration to completion without observing intermediate batches.
pub async fn run_hydration(items: Vec<HydrationItem>, options: HydrationOptions) -> HydrationReport {
    run_hydration_with(items, options, |_| {}).await
}

fn percent_of(processed: usize, total: usize) -> u8 {
    ((processed as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, tier: PriorityTier, visible: bool) -> HydrationItem {
        HydrationItem {
            id: id.to_string(),
            tier,
            visible,
        }
    }

    #[test]
    fn sort_key_puts_urgent_visible_first() {
        let mut items = vec![
            item("low-hidden", PriorityTier::Low, false),
            item("high-hidden", PriorityTier::High, false),
            item("high-visible", PriorityTier::High, true),
            item("critical-hidden", PriorityTier::Critical, false),
        ];
        items.sort_by_key(|i| (i.tier, !i.visible));
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["critical-hidden", "high-visible", "high-hidden", "low-hidden"]
        );
    }

    #[test]
    fn rounding_matches_the_documented_sequence() {
        assert_eq!(percent_of(3, 7), 43);
        assert_eq!(percent_of(6, 7), 86);
        assert_eq!(percent_of(7, 7), 100);
    }
}
