//! Viewport-visibility trigger.
//!
//! Wraps an external intersection signal behind a capability trait so
//! tests can script it without a rendering surface. When an observed
//! target crosses the configured threshold, the associated resource is
//! requested immediately, overriding its configured tier: imminent
//! rendering is now known with certainty.

use crate::config::ResourceKey;
use crate::loader::DedupLoader;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One intersection sample for an observed target.
#[derive(Debug, Clone, Copy)]
pub struct IntersectionEvent {
    /// Fraction of the target inside the viewport, in [0.0, 1.0].
    pub ratio: f64,
    /// Whether the target currently intersects at all.
    pub is_intersecting: bool,
}

/// Observation parameters, mirroring the host observer's options.
#[derive(Debug, Clone, Copy)]
pub struct ObserveOptions {
    /// Margin around the viewport root, in pixels (may be negative).
    pub root_margin_px: i32,
    /// Minimum intersection ratio that counts as visible.
    pub threshold: f64,
    /// Tear the observation down after the first firing.
    pub trigger_once: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            root_margin_px: 0,
            threshold: 0.1,
            trigger_once: true,
        }
    }
}

/// Handle identifying one render target to the host observer.
pub type TargetId = String;

/// External viewport-intersection capability. Implementations send an
/// event per threshold crossing (enter and exit both delivered; exits
/// are ignored for loading).
pub trait VisibilityObserver: Send + Sync {
    fn observe(&self, target: &TargetId, options: &ObserveOptions)
        -> mpsc::Receiver<IntersectionEvent>;
}

/// Forces a load when its render target enters the viewport.
#[derive(Clone)]
pub struct VisibilityTrigger {
    loader: DedupLoader,
    observer: Arc<dyn VisibilityObserver>,
}

impl VisibilityTrigger {
    pub fn new(loader: DedupLoader, observer: Arc<dyn VisibilityObserver>) -> Self {
        Self { loader, observer }
    }

    pub fn loader(&self) -> &DedupLoader {
        &self.loader
    }

    /// Watch `target`; on the first qualifying enter-crossing, request
    /// `key`. With `trigger_once` the watcher stops after firing once,
    /// so at most one forced request ever happens for the target.
    pub fn observe(
        &self,
        target: TargetId,
        key: ResourceKey,
        options: ObserveOptions,
    ) -> JoinHandle<()> {
        let mut events = self.observer.observe(&target, &options);
        let loader = self.loader.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if !event.is_intersecting || event.ratio < options.threshold {
                    continue;
                }
                tracing::debug!(%key, target = %target, ratio = event.ratio, "target visible");
                if let Err(err) = loader.request(&key).await {
                    tracing::warn!(%key, error = %err, "visibility-forced load failed");
                }
                if options.trigger_once {
                    // Dropping the receiver tears the observation down.
                    return;
                }
            }
        })
    }
}
