//! Load failure taxonomy.
//!
//! Transient failures never appear here: they are absorbed by the
//! loader's retry loop (see `loader`). What callers can observe is an
//! unknown key, an exhausted retry budget, or the internal marker for a
//! flight whose waiters all withdrew.

use crate::config::ResourceKey;
use std::sync::Arc;

/// Error surfaced to callers of `request`/`schedule`.
///
/// `Clone` because one terminal outcome fans out to every caller
/// attached to the same in-flight load.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// The key is not present in the config table. Never retried.
    #[error("unknown resource key: {key}")]
    UnknownKey { key: ResourceKey },

    /// All retry attempts failed; the record is parked in `Failed`
    /// until an explicit reset.
    #[error("load of {key} failed permanently after {attempts} attempt(s): {reason}")]
    Permanent {
        key: ResourceKey,
        attempts: u32,
        reason: Arc<str>,
    },

    /// The attachment to the flight closed before an outcome was
    /// delivered. Withdrawal is modelled as dropping the attachment,
    /// so a caller that kept awaiting should never observe this.
    #[error("detached from load of {key} before completion")]
    Detached { key: ResourceKey },
}

/// Error returned by an importer for a single attempt.
///
/// Intentionally just a message: the importer is an opaque capability,
/// and every importer failure is treated as transient until the retry
/// budget runs out.
#[derive(Debug, Clone)]
pub struct ImportError {
    pub message: String,
}

impl ImportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ImportError {}
