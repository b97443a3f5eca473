//! Retry/backoff behavior: deterministic delays, bounded attempts,
//! permanent failure fan-out, manual retry.

mod common;

use als_core::config::{PriorityTier, ResourceKey};
use als_core::error::LoadError;
use als_core::loader::{DedupLoader, RetryPolicy};
use als_core::registry::{LoadStatus, ModuleRegistry};
use common::{resource, table, CountingImporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const IMPORT_LATENCY: Duration = Duration::from_millis(10);

fn loader(importer: Arc<CountingImporter>) -> DedupLoader {
    let registry = Arc::new(ModuleRegistry::new(table(vec![resource(
        "y",
        PriorityTier::High,
    )])));
    DedupLoader::new(registry, importer, RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn two_failures_then_success_with_documented_backoff() {
    let importer = CountingImporter::with_latency(IMPORT_LATENCY);
    let loader = loader(Arc::clone(&importer));
    let key: ResourceKey = "y".into();
    importer.fail_next(&key, 2);

    let start = Instant::now();
    let value = loader.request(&key).await.unwrap();
    let elapsed = start.elapsed();

    assert!(!value.bytes.is_empty());
    assert_eq!(importer.calls_for(&key), 3, "loaded on the third attempt");
    assert_eq!(loader.registry().attempts(&key), 3);
    assert_eq!(loader.registry().status(&key), LoadStatus::Loaded);
    // Three attempts at 10ms each, plus backoffs of 1000ms then 2000ms.
    assert_eq!(elapsed, IMPORT_LATENCY * 3 + Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_every_attached_caller() {
    let importer = CountingImporter::with_latency(IMPORT_LATENCY);
    let loader = loader(Arc::clone(&importer));
    let key: ResourceKey = "y".into();
    importer.fail_next(&key, 10); // more than the budget

    let (a, b) = tokio::join!(loader.request(&key), loader.request(&key));
    for outcome in [a, b] {
        match outcome.unwrap_err() {
            LoadError::Permanent { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected permanent failure, got {other:?}"),
        }
    }

    assert_eq!(importer.calls_for(&key), 3, "attempts never exceed the budget");
    assert_eq!(loader.registry().status(&key), LoadStatus::Failed);

    // A later request observes the parked failure without refetching.
    let err = loader.request(&key).await.unwrap_err();
    assert!(matches!(err, LoadError::Permanent { .. }));
    assert_eq!(importer.calls_for(&key), 3);
}

#[tokio::test(start_paused = true)]
async fn manual_retry_rearms_a_failed_key() {
    let importer = CountingImporter::with_latency(IMPORT_LATENCY);
    let loader = loader(Arc::clone(&importer));
    let key: ResourceKey = "y".into();
    importer.fail_next(&key, 3);

    let err = loader.request(&key).await.unwrap_err();
    assert!(matches!(err, LoadError::Permanent { .. }));

    // Importer is healthy again; an explicit retry starts a new cycle.
    let value = loader.retry(&key).await.unwrap();
    assert!(!value.bytes.is_empty());
    assert_eq!(loader.registry().status(&key), LoadStatus::Loaded);
    assert_eq!(loader.registry().attempts(&key), 1, "attempts reset with the record");
    assert_eq!(importer.calls_for(&key), 4);
}

#[tokio::test(start_paused = true)]
async fn backoff_delays_are_nondecreasing() {
    let importer = CountingImporter::with_latency(Duration::ZERO);
    let registry = Arc::new(ModuleRegistry::new(table(vec![resource(
        "y",
        PriorityTier::High,
    )])));
    let policy = RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(250),
    };
    let loader = DedupLoader::new(registry, importer.clone(), policy);
    let key: ResourceKey = "y".into();
    importer.fail_next(&key, 4);

    let start = Instant::now();
    loader.request(&key).await.unwrap();
    // 100 + 200 + 250 + 250: doubling until the cap takes over.
    assert_eq!(start.elapsed(), Duration::from_millis(800));
    assert_eq!(importer.calls_for(&key), 5);
}
