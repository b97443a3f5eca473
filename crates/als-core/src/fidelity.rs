//! Progressive fidelity state machine.
//!
//! Governs the Initial → Skeleton → LowFidelity → Full sequence for a
//! single rendered unit. The machine owns timing and stage selection
//! only; what each stage looks like comes from externally supplied
//! renderers, pure functions of stage props. Stages never regress,
//! `Skeleton` is never skipped, and `Full` is terminal. A stage that
//! was asked to advance early still dwells for its configured minimum
//! so placeholders don't flash.

use std::time::Duration;
use tokio::time::Instant;

/// One step in the content-richness progression. Ordered; `Full` is
/// terminal. `LowFidelity` is skipped when no renderer is supplied
/// for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FidelityStage {
    Initial,
    Skeleton,
    LowFidelity,
    Full,
}

impl FidelityStage {
    /// Coarse per-stage percentage for UI feedback only; never used
    /// for control flow.
    pub fn percent(self) -> u8 {
        match self {
            FidelityStage::Initial => 0,
            FidelityStage::Skeleton => 25,
            FidelityStage::LowFidelity => 50,
            FidelityStage::Full => 100,
        }
    }
}

/// Stage timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct FidelityConfig {
    /// Delay before leaving `Initial`.
    pub initial_delay: Duration,
    /// Minimum time `Skeleton` stays on screen.
    pub min_skeleton: Duration,
    /// Minimum time `LowFidelity` stays on screen (when present).
    pub min_low_fidelity: Duration,
    /// Extra delay added to every non-initial transition.
    pub stage_delay: Duration,
}

impl Default for FidelityConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            min_skeleton: Duration::from_millis(500),
            min_low_fidelity: Duration::from_millis(400),
            stage_delay: Duration::ZERO,
        }
    }
}

/// Per-stage renderers: pure functions from props to rendered output.
/// `skeleton` and `full` are required; `low_fidelity` being absent
/// removes that stage from the sequence.
pub struct StageRenderers<P, R> {
    pub initial: Option<Box<dyn Fn(&P) -> R + Send>>,
    pub skeleton: Box<dyn Fn(&P) -> R + Send>,
    pub low_fidelity: Option<Box<dyn Fn(&P) -> R + Send>>,
    pub full: Box<dyn Fn(&P) -> R + Send>,
}

/// State machine for one rendered unit. Created per unit, discarded
/// when the unit leaves the view.
pub struct FidelityMachine<P, R> {
    stage: FidelityStage,
    entered_at: Instant,
    renderers: StageRenderers<P, R>,
    config: FidelityConfig,
}

impl<P, R> FidelityMachine<P, R> {
    pub fn new(renderers: StageRenderers<P, R>, config: FidelityConfig) -> Self {
        Self {
            stage: FidelityStage::Initial,
            entered_at: Instant::now(),
            renderers,
            config,
        }
    }

    pub fn stage(&self) -> FidelityStage {
        self.stage
    }

    pub fn progress(&self) -> u8 {
        self.stage.percent()
    }

    /// Render the current stage. `None` only in `Initial` with no
    /// initial renderer supplied.
    pub fn render(&self, props: &P) -> Option<R> {
        match self.stage {
            FidelityStage::Initial => self.renderers.initial.as_ref().map(|f| f(props)),
            FidelityStage::Skeleton => Some((self.renderers.skeleton)(props)),
            FidelityStage::LowFidelity => {
                // Unreachable without a renderer; the machine never
                // enters this stage when `low_fidelity` is `None`.
                self.renderers.low_fidelity.as_ref().map(|f| f(props))
            }
            FidelityStage::Full => Some((self.renderers.full)(props)),
        }
    }

    /// The stage that follows the current one. `Skeleton` hands off to
    /// `LowFidelity` only when a renderer exists for it.
    fn next_stage(&self) -> Option<FidelityStage> {
        match self.stage {
            FidelityStage::Initial => Some(FidelityStage::Skeleton),
            FidelityStage::Skeleton => {
                if self.renderers.low_fidelity.is_some() {
                    Some(FidelityStage::LowFidelity)
                } else {
                    Some(FidelityStage::Full)
                }
            }
            FidelityStage::LowFidelity => Some(FidelityStage::Full),
            FidelityStage::Full => None,
        }
    }

    fn min_dwell(&self) -> Duration {
        match self.stage {
            FidelityStage::Initial => self.config.initial_delay,
            FidelityStage::Skeleton => self.config.min_skeleton,
            FidelityStage::LowFidelity => self.config.min_low_fidelity,
            FidelityStage::Full => Duration::ZERO,
        }
    }

    /// Request the next stage. Waits out the current stage's remaining
    /// minimum dwell (plus the configured stage delay) before the
    /// transition actually happens, then returns the new stage. A
    /// machine already at `Full` returns immediately.
    pub async fn advance(&mut self) -> FidelityStage {
        let Some(next) = self.next_stage() else {
            return self.stage;
        };

        let elapsed = self.entered_at.elapsed();
        let remaining = self.min_dwell().saturating_sub(elapsed);
        let wait = if self.stage == FidelityStage::Initial {
            remaining
        } else {
            remaining + self.config.stage_delay
        };
        if wait > Duration::ZERO {
            tokio::time::sleep(wait).await;
        }

        tracing::trace!(from = ?self.stage, to = ?next, "fidelity transition");
        self.stage = next;
        self.entered_at = Instant::now();
        self.stage
    }

    /// Drive every remaining transition in order, ending at `Full`.
    pub async fn run_to_full(&mut self) -> FidelityStage {
        while self.stage != FidelityStage::Full {
            self.advance().await;
        }
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderers(with_low: bool) -> StageRenderers<String, String> {
        StageRenderers {
            initial: None,
            skeleton: Box::new(|p: &String| format!("skeleton:{p}")),
            low_fidelity: if with_low {
                Some(Box::new(|p: &String| format!("low:{p}")))
            } else {
                None
            },
            full: Box::new(|p: &String| format!("full:{p}")),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_sequence_with_low_fidelity() {
        let mut m = FidelityMachine::new(renderers(true), FidelityConfig::default());
        assert_eq!(m.stage(), FidelityStage::Initial);
        assert_eq!(m.progress(), 0);
        assert!(m.render(&"x".to_string()).is_none());

        assert_eq!(m.advance().await, FidelityStage::Skeleton);
        assert_eq!(m.progress(), 25);
        assert_eq!(m.render(&"x".to_string()).unwrap(), "skeleton:x");

        assert_eq!(m.advance().await, FidelityStage::LowFidelity);
        assert_eq!(m.progress(), 50);

        assert_eq!(m.advance().await, FidelityStage::Full);
        assert_eq!(m.progress(), 100);
        assert_eq!(m.render(&"x".to_string()).unwrap(), "full:x");

        // Full is terminal: advancing again changes nothing.
        assert_eq!(m.advance().await, FidelityStage::Full);
    }

    #[tokio::test(start_paused = true)]
    async fn low_fidelity_is_skipped_without_a_renderer() {
        let mut m = FidelityMachine::new(renderers(false), FidelityConfig::default());
        assert_eq!(m.advance().await, FidelityStage::Skeleton);
        assert_eq!(m.advance().await, FidelityStage::Full);
    }

    #[tokio::test(start_paused = true)]
    async fn early_advance_waits_out_minimum_dwell() {
        let cfg = FidelityConfig {
            min_skeleton: Duration::from_millis(300),
            ..FidelityConfig::default()
        };
        let mut m = FidelityMachine::new(renderers(false), cfg);
        m.advance().await; // -> Skeleton at t=0

        tokio::time::sleep(Duration::from_millis(100)).await;
        let before = Instant::now();
        m.advance().await; // requested at t=100, must land at t=300
        assert_eq!(before.elapsed(), Duration::from_millis(200));
        assert_eq!(m.stage(), FidelityStage::Full);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_after_dwell_elapsed_is_immediate() {
        let cfg = FidelityConfig {
            min_skeleton: Duration::from_millis(300),
            ..FidelityConfig::default()
        };
        let mut m = FidelityMachine::new(renderers(false), cfg);
        m.advance().await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        let before = Instant::now();
        m.advance().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn stage_sequence_never_skips_skeleton() {
        let mut m = FidelityMachine::new(renderers(true), FidelityConfig::default());
        let mut seen = vec![m.stage()];
        while m.stage() != FidelityStage::Full {
            seen.push(m.advance().await);
        }
        assert_eq!(
            seen,
            vec![
                FidelityStage::Initial,
                FidelityStage::Skeleton,
                FidelityStage::LowFidelity,
                FidelityStage::Full,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_to_full_drives_remaining_stages() {
        let mut m = FidelityMachine::new(renderers(false), FidelityConfig::default());
        let start = Instant::now();
        assert_eq!(m.run_to_full().await, FidelityStage::Full);
        // Skeleton must dwell its full minimum even when driven straight through.
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }
}
