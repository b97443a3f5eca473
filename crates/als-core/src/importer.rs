//! Importer capability: the opaque transport that fetches a unit's bytes.
//!
//! The core never talks to the network itself; the host supplies an
//! [`Importer`] and the loader drives it. Keeping the trait object-safe
//! (boxed futures) lets tests and the CLI substitute scripted importers.

use crate::config::ResourceKey;
use crate::error::ImportError;
use futures::future::BoxFuture;
use std::future::Future;

/// Content of one loaded unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePayload {
    pub bytes: Vec<u8>,
}

impl ModulePayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Fetches the named unit's content. One call per load attempt; the
/// loader owns dedup and retries, so implementations stay stateless.
pub trait Importer: Send + Sync {
    fn import(&self, key: &ResourceKey) -> BoxFuture<'static, Result<ModulePayload, ImportError>>;
}

/// Adapter turning an async closure into an [`Importer`].
pub struct FnImporter<F>(F);

impl<F, Fut> FnImporter<F>
where
    F: Fn(ResourceKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ModulePayload, ImportError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, Fut> Importer for FnImporter<F>
where
    F: Fn(ResourceKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ModulePayload, ImportError>> + Send + 'static,
{
    fn import(&self, key: &ResourceKey) -> BoxFuture<'static, Result<ModulePayload, ImportError>> {
        Box::pin((self.0)(key.clone()))
    }
}
