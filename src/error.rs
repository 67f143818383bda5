//! Error types for file-relay
//!
//! Every failure a task can hit while being processed is one variant of [`Error`]:
//! - Remote fetch failures ([`TransportError`])
//! - Session cancellation
//! - Backend write failures after the retry budget is spent ([`StorageError`])
//! - Unknown backend names
//! - Local staging I/O
//!
//! The pipeline catches all of them at the task boundary and turns them into a
//! status transition, so none of them escape a worker.

use thiserror::Error;

/// Result type alias for file-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for file-relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// Remote content source failed after its own transport retries
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Operation aborted by the originating session
    #[error("operation canceled")]
    Canceled,

    /// Backend write failed on every attempt
    #[error("failed to store file in '{backend}' after {attempts} attempt(s): {source}")]
    Persist {
        /// Name of the backend that rejected the write
        backend: String,
        /// Number of write attempts made
        attempts: u32,
        /// The error returned by the last attempt
        #[source]
        source: StorageError,
    },

    /// The task names a backend that is not registered
    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),

    /// Local staging directory or file failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Requested byte range does not fit the object
    #[error("invalid byte range {start}..={end} for object of {total} bytes")]
    InvalidRange {
        /// First byte requested
        start: u64,
        /// Last byte requested (inclusive)
        end: u64,
        /// Declared object length
        total: u64,
    },

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,
}

impl Error {
    /// Whether this error stems from session cancellation
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }

    /// Short machine-readable code, used as a structured log field
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } | Error::ConfigParse(_) => "config_error",
            Error::Transport(_) => "transport_error",
            Error::Canceled => "canceled",
            Error::Persist { .. } => "persist_error",
            Error::UnknownBackend(_) => "unknown_backend",
            Error::Io(_) => "io_error",
            Error::InvalidRange { .. } => "invalid_range",
            Error::ShuttingDown => "shutting_down",
        }
    }
}

/// Failures talking to the remote content source
#[derive(Debug, Error)]
pub enum TransportError {
    /// A byte-range request failed
    #[error("range fetch of {length} bytes at offset {offset} failed: {reason}")]
    RangeFetch {
        /// Offset of the requested window
        offset: u64,
        /// Length of the requested window
        length: u64,
        /// Reason reported by the transport
        reason: String,
    },

    /// A whole-object request failed
    #[error("whole-object fetch failed: {0}")]
    WholeFetch(String),

    /// The remote object returned no data before the declared range ended
    #[error("remote object ended early: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Bytes the caller asked for
        expected: u64,
        /// Bytes actually received
        received: u64,
    },
}

/// Failure reported by a storage backend's write operation
#[derive(Debug, Error)]
pub enum StorageError {
    /// Local or remote filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure (HTTP status, API error, ...)
    #[error("{0}")]
    Backend(String),
}

/// Failure reported by the reporting sink when editing a message
#[derive(Debug, Error)]
#[error("failed to update message: {0}")]
pub struct ReportError(pub String);
