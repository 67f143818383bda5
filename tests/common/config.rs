//! Relay configurations for integration tests

use std::time::Duration;

use file_relay::{Config, RetryConfig, StagingConfig};
use tempfile::TempDir;

/// Config staging into `temp_dir/cache` with millisecond retry delays
pub fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
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
