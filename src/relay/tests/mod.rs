use super::*;
use crate::config::{RetryConfig, StagingConfig};
use crate::report::Reporter;
use crate::storage::Storage;
use crate::test_helpers::{MemorySource, RecordingReporter, RecordingStorage, make_task};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;


/// Config staging into `temp_dir` with fast retries
fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        staging: StagingConfig {
            temp_dir: temp_dir.path().join("cache"),
            clean_on_start: true,
        },
        ..Default::default()
    }
}

fn test_pipeline(
    config: Config,
    source: Arc<MemorySource>,
    storages: StorageRegistry,
) -> Pipeline {
    let config = Arc::new(config);
    let persister = Persister::new(storages, config.retry.clone());
    Pipeline::new(config, source, persister)
}

/// Registry with a single backend named "local"
fn local(storage: Arc<dyn Storage>) -> StorageRegistry {
    StorageRegistry::new().with("local", storage)
}

/// Poll `condition` until it holds, failing the test after 5 seconds
async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

fn reporter() -> Arc<RecordingReporter> {
    Arc::new(RecordingReporter::default())
}

fn as_reporter(reporter: &Arc<RecordingReporter>) -> Arc<dyn Reporter> {
    reporter.clone()
}
