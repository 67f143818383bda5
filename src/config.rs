//! Configuration types for file-relay

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "FILE_RELAY_";

/// One mebibyte
const MIB: u64 = 1024 * 1024;

/// Main configuration for [`Relay`](crate::Relay)
///
/// Built once at startup and handed to the pool and persister constructors.
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Number of worker loops draining the queue (default: 3)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the global concurrency limiter (default: same as `workers`)
    ///
    /// Independent of `workers` so concurrency can be tuned without changing
    /// the number of worker loops.
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Retry policy for backend writes
    #[serde(default)]
    pub retry: RetryConfig,

    /// Local staging area
    #[serde(default)]
    pub staging: StagingConfig,

    /// Remote transfer tuning
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Logging output
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_concurrent: None,
            retry: RetryConfig::default(),
            staging: StagingConfig::default(),
            transfer: TransferConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document and validate the result
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply `FILE_RELAY_*` environment overrides
    ///
    /// Recognized variables: `FILE_RELAY_WORKERS`, `FILE_RELAY_MAX_CONCURRENT`,
    /// `FILE_RELAY_RETRY`, `FILE_RELAY_TEMP_DIR`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read '{}': {}", path.display(), e),
            key: None,
        })?;

        let mut config: Config = toml::from_str(&content)?;
        config.apply_overrides_from(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
        Ok(config)
    }

    /// Apply overrides from a variable lookup (usually the process environment)
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = var("WORKERS") {
            self.workers = parse_override("workers", &value)?;
        }
        if let Some(value) = var("MAX_CONCURRENT") {
            self.max_concurrent = Some(parse_override("max_concurrent", &value)?);
        }
        if let Some(value) = var("RETRY") {
            self.retry.max_attempts = parse_override("retry.max_attempts", &value)?;
        }
        if let Some(value) = var("TEMP_DIR") {
            self.staging.temp_dir = PathBuf::from(value);
        }

        Ok(())
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.workers < 1 {
            return Err(invalid("workers", "must be at least 1"));
        }
        if self.max_concurrent == Some(0) {
            return Err(invalid("max_concurrent", "must be at least 1"));
        }
        if self.retry.max_attempts < 1 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(invalid("retry.backoff_multiplier", "must be >= 1.0"));
        }
        if self.transfer.chunk_size == Some(0) {
            return Err(invalid("transfer.chunk_size", "must be greater than 0"));
        }
        if self.transfer.single_shot_limit == 0 {
            return Err(invalid("transfer.single_shot_limit", "must be greater than 0"));
        }
        Ok(())
    }

    /// Capacity of the concurrency limiter
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent.unwrap_or(self.workers)
    }

    /// Staging directory
    pub fn temp_dir(&self) -> &PathBuf {
        &self.staging.temp_dir
    }
}

fn invalid(key: &str, message: &str) -> Error {
    Error::Config {
        message: format!("{key} {message}"),
        key: Some(key.to_string()),
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::Config {
        message: format!("invalid value '{value}' for {key}"),
        key: Some(key.to_string()),
    })
}

/// Retry configuration for backend writes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of write attempts, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before the second attempt (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between attempts (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Local staging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Directory holding files between download and backend write (default: "cache")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Remove leftover staged files when the relay starts (default: true)
    #[serde(default = "default_true")]
    pub clean_on_start: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            clean_on_start: true,
        }
    }
}

/// Remote transfer tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Fixed chunk size in bytes (default: derived from the file size)
    #[serde(default)]
    pub chunk_size: Option<u64>,

    /// Cap for whole-object fetches of size-unknown files (default: 1 MiB)
    #[serde(default = "default_single_shot_limit")]
    pub single_shot_limit: u64,

    /// Files smaller than this get no progress edits (default: 50 MiB)
    #[serde(default = "default_progress_threshold")]
    pub progress_threshold: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: None,
            single_shot_limit: default_single_shot_limit(),
            progress_threshold: default_progress_threshold(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path; daily rolled files are written next to it (default: none)
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Number of rolled log files to keep (default: 7)
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            max_files: default_max_log_files(),
        }
    }
}

fn default_workers() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_single_shot_limit() -> u64 {
    MIB
}

fn default_progress_threshold() -> u64 {
    50 * MIB
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    7
}

// Durations are written as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.concurrency_limit(), 3);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.staging.temp_dir, PathBuf::from("cache"));
        assert_eq!(config.transfer.single_shot_limit, 1024 * 1024);
        assert_eq!(config.transfer.progress_threshold, 50 * 1024 * 1024);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.max_files, 7);
    }

    #[test]
    fn parses_nested_sections() {
        let config = Config::from_toml_str(
            r#"
            workers = 5
            max_concurrent = 2

            [retry]
            max_attempts = 4
            initial_delay = 2
            jitter = false

            [staging]
            temp_dir = "/var/tmp/relay"

            [log]
            level = "debug"
            file = "logs/relay.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.workers, 5);
        assert_eq!(config.concurrency_limit(), 2);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
        assert!(!config.retry.jitter);
        assert_eq!(config.temp_dir(), &PathBuf::from("/var/tmp/relay"));
        assert_eq!(config.log.file, Some(PathBuf::from("logs/relay.log")));
    }

    #[test]
    fn rejects_zero_workers() {
        let err = Config::from_toml_str("workers = 0").unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("workers")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_retry_attempts() {
        let err = Config::from_toml_str("[retry]\nmax_attempts = 0").unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("retry.max_attempts")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_concurrency_limit() {
        assert!(Config::from_toml_str("max_concurrent = 0").is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::from_toml_str("workers = \"many\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)), "got: {err:?}");
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<String, String> = [
            ("FILE_RELAY_WORKERS", "8"),
            ("FILE_RELAY_MAX_CONCURRENT", "4"),
            ("FILE_RELAY_RETRY", "6"),
            ("FILE_RELAY_TEMP_DIR", "/tmp/staging"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides_from(|key| vars.get(key).cloned())
            .unwrap();

        assert_eq!(config.workers, 8);
        assert_eq!(config.concurrency_limit(), 4);
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.staging.temp_dir, PathBuf::from("/tmp/staging"));
    }

    #[test]
    fn unparsable_override_names_the_key() {
        let mut config = Config::default();
        let err = config
            .apply_overrides_from(|key| (key == "FILE_RELAY_WORKERS").then(|| "lots".to_string()))
            .unwrap_err();

        match err {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("workers"));
                assert!(message.contains("lots"), "got: {message}");
            }
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "workers = 2\n[transfer]\nchunk_size = 65536\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.transfer.chunk_size, Some(65536));
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Config { key: None, .. }), "got: {err:?}");
    }
}
