//! `als run` – replay a session script against a simulated importer.
//!
//! The script declares the resource table (with per-resource simulated
//! latency and scripted failures) and a sequence of steps: direct
//! requests, scheduled loads, user interactions for the predictor,
//! visibility firings, and waits. After the steps, the run settles so
//! delayed and idle dispatches can land, then the loaded-modules
//! report is printed.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use als_core::config::{
    self, AlsConfig, ConfigTable, PriorityTier, ResourceConfig, ResourceKey,
};
use als_core::error::ImportError;
use als_core::hydration::{run_hydration, HydrationItem, HydrationOptions};
use als_core::importer::{FnImporter, ModulePayload};
use als_core::loader::{DedupLoader, RetryPolicy};
use als_core::predictor::InteractionPredictor;
use als_core::registry::{LoadStatus, ModuleRegistry, ModulesReport};
use als_core::scheduler::{LoadScheduler, SchedulerTimings};

fn default_latency_ms() -> u64 {
    10
}

/// One simulated resource: the real config entry plus simulation knobs.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SimResource {
    #[serde(flatten)]
    pub config: ResourceConfig,
    /// Simulated importer latency for this resource.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Number of attempts that fail before one succeeds.
    #[serde(default)]
    pub fail_attempts: u32,
}

/// One replay step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Step {
    /// Explicit `request(key)`: awaited, like a caller that needs the
    /// value now.
    Request { key: ResourceKey },
    /// Route through the scheduler at the configured tier.
    Schedule { key: ResourceKey },
    /// Record a user interaction for the predictor.
    Interact { subject: String },
    /// A render target became visible: forced immediate request.
    Visible { key: ResourceKey },
    /// Reveal a set of pending UI items in hydration batches.
    Hydrate { items: Vec<HydrationItem> },
    /// Let simulated time pass.
    Wait { ms: u64 },
}

/// Parsed session script.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionScript {
    #[serde(default, rename = "resource")]
    pub resources: Vec<SimResource>,
    /// Interaction subject → resource key, for the predictor.
    #[serde(default)]
    pub routes: HashMap<String, ResourceKey>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl SessionScript {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

struct SimState {
    latency: Duration,
    failures_remaining: Mutex<u32>,
    size_bytes: usize,
}

fn build_importer(
    resources: &[SimResource],
) -> impl als_core::importer::Importer + 'static {
    let states: Arc<HashMap<ResourceKey, SimState>> = Arc::new(
        resources
            .iter()
            .map(|r| {
                (
                    r.config.key.clone(),
                    SimState {
                        latency: Duration::from_millis(r.latency_ms),
                        failures_remaining: Mutex::new(r.fail_attempts),
                        size_bytes: r.config.size_hint.unwrap_or(1024) as usize,
                    },
                )
            })
            .collect(),
    );

    FnImporter::new(move |key: ResourceKey| {
        let states = Arc::clone(&states);
        async move {
            let Some(state) = states.get(&key) else {
                return Err(ImportError::new(format!("no simulated resource for {key}")));
            };
            tokio::time::sleep(state.latency).await;
            let fail = {
                let mut remaining = state.failures_remaining.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    true
                } else {
                    false
                }
            };
            if fail {
                Err(ImportError::new(format!("simulated failure for {key}")))
            } else {
                Ok(ModulePayload::new(vec![0u8; state.size_bytes]))
            }
        }
    })
}

/// Drive the core through the script and return the final report.
pub(crate) async fn replay(
    script: &SessionScript,
    cfg: &AlsConfig,
    settle: Duration,
) -> Result<ModulesReport> {
    let table = ConfigTable::from_entries(
        script.resources.iter().map(|r| r.config.clone()).collect(),
    )
    .context("build resource table")?;
    let registry = Arc::new(ModuleRegistry::new(table));

    let policy = cfg
        .retry
        .as_ref()
        .map(RetryPolicy::from)
        .unwrap_or_default();
    let importer = Arc::new(build_importer(&script.resources));
    let loader = DedupLoader::new(Arc::clone(&registry), importer, policy);
    let scheduler = LoadScheduler::with_timer_idle(loader.clone(), SchedulerTimings::from(cfg));
    let mut predictor = InteractionPredictor::new(scheduler.clone(), script.routes.clone());

    for step in &script.steps {
        match step {
            Step::Request { key } => match loader.request(key).await {
                Ok(payload) => {
                    tracing::info!(%key, size = payload.size_bytes(), "request resolved")
                }
                Err(err) => tracing::warn!(%key, error = %err, "request failed"),
            },
            Step::Schedule { key } => match registry.config(key) {
                Some(resource) => scheduler.schedule(resource),
                None => tracing::warn!(%key, "schedule step names an unknown key"),
            },
            Step::Interact { subject } => predictor.record(subject),
            Step::Visible { key } => {
                if let Err(err) = loader.request(key).await {
                    tracing::warn!(%key, error = %err, "visibility-forced request failed");
                }
            }
            Step::Hydrate { items } => {
                let report = run_hydration(items.clone(), HydrationOptions::from(cfg)).await;
                tracing::info!(
                    hydrated = report.hydrated_count(),
                    batches = report.batch_sizes.len(),
                    "hydration run complete"
                );
            }
            Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
        }
    }

    // Let delayed, idle, and retrying dispatches land.
    tokio::time::sleep(settle).await;

    Ok(registry.loaded_modules_report())
}

pub async fn run_session(script_path: &Path, json: bool, settle_ms: u64) -> Result<()> {
    let text = std::fs::read_to_string(script_path)
        .with_context(|| format!("read session script: {}", script_path.display()))?;
    let script = SessionScript::parse(&text)
        .with_context(|| format!("parse session script: {}", script_path.display()))?;
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);

    let report = replay(&script, &cfg, Duration::from_millis(settle_ms)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{:<24} {:<10} {:<8} {:>8} {:>12}",
        "KEY", "TIER", "STATUS", "ATTEMPTS", "SIZE"
    );
    for module in &report.modules {
        println!(
            "{:<24} {:<10} {:<8} {:>8} {:>12}",
            module.key,
            tier_str(module.tier),
            status_str(module.status),
            module.attempts,
            module
                .size_bytes
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    let loaded = report
        .modules
        .iter()
        .filter(|m| m.status == LoadStatus::Loaded)
        .count();
    println!(
        "\nloaded {}/{} modules, {} of {} bytes ({:.0}%)",
        loaded,
        report.modules.len(),
        report.total_loaded_bytes,
        report.total_registered_bytes,
        report.loaded_fraction() * 100.0,
    );
    Ok(())
}

fn tier_str(tier: PriorityTier) -> &'static str {
    match tier {
        PriorityTier::Critical => "critical",
        PriorityTier::High => "high",
        PriorityTier::Medium => "medium",
        PriorityTier::Low => "low",
        PriorityTier::OnDemand => "on_demand",
    }
}

fn status_str(status: LoadStatus) -> &'static str {
    match status {
        LoadStatus::Idle => "idle",
        LoadStatus::Loading => "loading",
        LoadStatus::Loaded => "loaded",
        LoadStatus::Failed => "failed",
    }
}
