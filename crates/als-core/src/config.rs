use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Opaque identifier for one loadable unit (a code module, data block,
/// or UI subtree). Unique within a registry instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Priority class governing when a resource is scheduled.
///
/// Total order by declaration: lower ordinal = more urgent. Used both
/// for dispatch routing and as the primary hydration sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Critical,
    High,
    Medium,
    Low,
    OnDemand,
}

/// Static per-resource configuration. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Identifier this entry applies to.
    pub key: ResourceKey,
    /// Priority tier for scheduling.
    pub tier: PriorityTier,
    /// Eligible for speculative prefetch (predictor, `prefetch()`).
    #[serde(default)]
    pub prefetch: bool,
    /// Hint to the host document to preload this unit's bytes.
    #[serde(default)]
    pub preload: bool,
    /// Expected size in bytes, if known up front. Seeds the registry's
    /// size accounting before the unit has actually loaded.
    #[serde(default)]
    pub size_hint: Option<u64>,
}

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per resource (including the first).
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Global configuration loaded from `~/.config/als/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlsConfig {
    /// Delay before dispatching medium-tier loads (milliseconds).
    pub medium_delay_ms: u64,
    /// Fixed delay used for low-tier loads when no native idle
    /// primitive is available (milliseconds).
    pub low_fallback_delay_ms: u64,
    /// Number of items revealed per hydration batch.
    pub hydration_batch_size: usize,
    /// Pause between hydration batches (milliseconds).
    pub hydration_batch_delay_ms: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Static resource table.
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceConfig>,
}

impl Default for AlsConfig {
    fn default() -> Self {
        Self {
            medium_delay_ms: 1000,
            low_fallback_delay_ms: 3000,
            hydration_batch_size: 3,
            hydration_batch_delay_ms: 100,
            retry: None,
            resources: Vec::new(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("als")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AlsConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = AlsConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: AlsConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Static `{key → ResourceConfig}` table, loaded once at startup.
///
/// The registry refuses to load keys this table does not know about, so
/// the table doubles as the allow-list for the whole scheduler.
#[derive(Debug, Clone, Default)]
pub struct ConfigTable {
    entries: HashMap<ResourceKey, ResourceConfig>,
}

impl ConfigTable {
    /// Build a table from a list of entries. Duplicate keys are a
    /// configuration error.
    pub fn from_entries(entries: Vec<ResourceConfig>) -> Result<Self> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let key = entry.key.clone();
            if map.insert(key.clone(), entry).is_some() {
                anyhow::bail!("duplicate resource key in config: {}", key);
            }
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceConfig> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all registered entries (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.entries.values()
    }
}
