//! # file-relay
//!
//! Task pipeline that relays files referenced in chat messages to pluggable
//! storage backends.
//!
//! ## Design Philosophy
//!
//! file-relay is designed to be:
//! - **Library-first** - The chat front end, remote transport, and storage
//!   backends are traits supplied by the embedding application
//! - **Bounded** - A global limiter caps how many queue entries are handled at once
//! - **Cancelable** - Every task carries a cancellation token honored by every
//!   fetch and every retry
//!
//! A request handler builds a [`Task`] and submits it. A worker stages the
//! remote file under the staging directory (ranged reads for files of known
//! size, one capped fetch otherwise), hands the staged copy to the named
//! backend with bounded retries, removes the staged copy, and re-enqueues
//! the task. When the task comes round again its outcome is written back to
//! the originating chat message.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use file_relay::error::{StorageError, TransportError};
//! use file_relay::{
//!     Config, FileDescriptor, NoOpReporter, Relay, RemoteLocation, RemoteSource, ReportContext,
//!     Storage, StorageRegistry, Task, ChatId, MessageId,
//! };
//!
//! struct Source;
//!
//! #[async_trait]
//! impl RemoteSource for Source {
//!     async fn fetch_range(
//!         &self,
//!         _location: &RemoteLocation,
//!         _offset: u64,
//!         length: u64,
//!     ) -> Result<Vec<u8>, TransportError> {
//!         Ok(vec![0; length as usize])
//!     }
//!
//!     async fn fetch_whole(
//!         &self,
//!         _location: &RemoteLocation,
//!         _max_bytes: u64,
//!     ) -> Result<Vec<u8>, TransportError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl Storage for Discard {
//!     async fn store(&self, _destination: &str, _source: &Path) -> Result<(), StorageError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storages = StorageRegistry::new().with("discard", Arc::new(Discard));
//!     let relay = Relay::new(Config::default(), Arc::new(Source), storages).await?;
//!     relay.start();
//!
//!     let report = ReportContext::new(ChatId(1), MessageId(1), Arc::new(NoOpReporter));
//!     let file = FileDescriptor::new(RemoteLocation::new("doc:42"), 1024, "notes.txt");
//!     relay.submit(Task::new(file, "discard", report))?;
//!
//!     file_relay::run_with_shutdown(relay).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Tracing subscriber setup
pub mod logging;
/// Retry-wrapped persist step
pub mod persist;
/// Chunked remote reader
pub mod reader;
/// Task queue and worker pool
pub mod relay;
/// Remote transport abstraction
pub mod remote;
/// Status message reporting
pub mod report;
/// Retry logic with exponential backoff
pub mod retry;
/// Storage backend abstraction and registry
pub mod storage;
/// Core task types
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, LogConfig, RetryConfig, StagingConfig, TransferConfig};
pub use error::{Error, ReportError, Result, StorageError, TransportError};
pub use logging::{LoggingGuard, init_logging};
pub use persist::Persister;
pub use reader::{ChunkedReader, NoProgress, ProgressSink};
pub use relay::Relay;
pub use remote::RemoteSource;
pub use report::{NoOpReporter, ReportContext, Reporter};
pub use storage::{Storage, StorageRegistry};
pub use types::{
    ChatId, FileDescriptor, MessageId, RemoteLocation, Task, TaskId, TaskStatus,
};

/// Helper function to run the relay with graceful signal handling.
///
/// Waits for a termination signal and then calls the relay's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use file_relay::{Config, Relay, RemoteSource, StorageRegistry, run_with_shutdown};
///
/// async fn serve(source: Arc<dyn RemoteSource>) -> file_relay::Result<()> {
///     let relay = Relay::new(Config::default(), source, StorageRegistry::new()).await?;
///     relay.start();
///
///     // Run with automatic signal handling
///     run_with_shutdown(relay).await
/// }
/// ```
pub async fn run_with_shutdown(relay: Relay) -> Result<()> {
    wait_for_signal().await;
    relay.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm = signal(SignalKind::terminate())
        .inspect_err(|e| tracing::warn!(error = %e, "Could not register SIGTERM handler"))
        .ok();
    let sigint = signal(SignalKind::interrupt())
        .inspect_err(|e| tracing::warn!(error = %e, "Could not register SIGINT handler"))
        .ok();

    match (sigterm, sigint) {
        (Some(mut sigterm), Some(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Some(mut sigterm), None) => {
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (None, Some(mut sigint)) => {
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (None, None) => {
            tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
