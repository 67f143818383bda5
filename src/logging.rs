//! Logging setup.
//!
//! Console output always; optional daily-rotated file output keeping the
//! newest `log.max_files` files. `RUST_LOG` overrides the configured level.

use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogConfig;
use crate::error::{Error, Result};

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// - [`Error::Config`] for an unparsable level, or if a global subscriber is
///   already installed
/// - [`Error::Io`] if the log directory or file cannot be created
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let env_filter = build_filter(&config.level)?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false);

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let (dir, prefix) = split_log_path(path);
            std::fs::create_dir_all(&dir)?;

            let appender = Builder::new()
                .rotation(Rotation::DAILY)
                .filename_prefix(prefix)
                .max_log_files(config.max_files.max(1))
                .build(&dir)
                .map_err(|e| Error::Io(io::Error::other(e.to_string())))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config {
            message: format!("failed to install logger: {e}"),
            key: None,
        })?;

    tracing::debug!(
        level = %config.level,
        file = ?config.file,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// `RUST_LOG` if set, otherwise the configured level
fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| Error::Config {
        message: format!("invalid log level '{level}': {e}"),
        key: Some("log.level".to_string()),
    })
}

/// Split a log file path into its directory and file-name prefix
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file-relay.log".to_string());
    (dir, prefix)
}
