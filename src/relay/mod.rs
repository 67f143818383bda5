//! Relay engine split into focused submodules.
//!
//! - [`queue`] - FIFO task queue
//! - [`pipeline`] - Per-task stage and persist flow
//! - [`progress`] - Progress message throttling
//! - [`worker`] - Worker loops and status dispatch
//! - [`lifecycle`] - Startup and shutdown coordination

mod lifecycle;
mod pipeline;
mod progress;
pub mod queue;
mod worker;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::persist::Persister;
use crate::remote::RemoteSource;
use crate::storage::StorageRegistry;
use crate::types::{Task, TaskStatus};
use crate::utils::clear_directory;

use pipeline::Pipeline;
use queue::TaskQueue;

/// Worker-side state
#[derive(Clone)]
pub(crate) struct WorkerState {
    /// Worker loop handles, filled by [`Relay::start`]
    pub(crate) handles: Arc<parking_lot::Mutex<Vec<JoinHandle<()>>>>,
    /// Stops the worker loops between tasks
    pub(crate) shutdown: CancellationToken,
    /// Whether new tasks are accepted (false once shutdown begins)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// File relay instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the task queue, the global concurrency limiter, and the worker pool.
/// Request handlers submit tasks; workers stage each file locally, persist it
/// to its backend, and report the outcome on the task's status message.
#[derive(Clone)]
pub struct Relay {
    /// Configuration (wrapped in Arc for sharing across workers)
    pub(crate) config: Arc<Config>,
    pub(crate) queue: Arc<TaskQueue>,
    /// Bounds queue entries handled at once, across all workers
    pub(crate) limiter: Arc<Semaphore>,
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) workers: WorkerState,
}

impl Relay {
    /// Create a relay over a remote source and a set of storage backends
    ///
    /// Validates the configuration, creates the staging directory, and (if
    /// configured) removes staged files left behind by a previous run. Workers
    /// are not running until [`Relay::start`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings or [`Error::Io`] if the
    /// staging directory cannot be prepared.
    pub async fn new(
        config: Config,
        source: Arc<dyn RemoteSource>,
        storages: StorageRegistry,
    ) -> Result<Self> {
        config.validate()?;

        let temp_dir = config.temp_dir().clone();
        tokio::fs::create_dir_all(&temp_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create temp directory '{}': {}",
                    temp_dir.display(),
                    e
                ),
            ))
        })?;

        if config.staging.clean_on_start {
            let removed = clear_directory(&temp_dir).await?;
            if removed > 0 {
                tracing::info!(
                    removed,
                    temp_dir = %temp_dir.display(),
                    "Removed stale staged files"
                );
            }
        }

        if storages.is_empty() {
            tracing::warn!("No storage backends registered, every task will fail");
        }

        let limit = config.concurrency_limit();
        tracing::info!(
            workers = config.workers,
            concurrency_limit = limit,
            storages = ?storages.names(),
            "Relay initialized"
        );

        let config = Arc::new(config);
        let persister = Persister::new(storages, config.retry.clone());
        let pipeline = Pipeline::new(Arc::clone(&config), source, persister);

        Ok(Self {
            config,
            queue: Arc::new(TaskQueue::new()),
            limiter: Arc::new(Semaphore::new(limit)),
            pipeline: Arc::new(pipeline),
            workers: WorkerState {
                handles: Arc::new(parking_lot::Mutex::new(Vec::new())),
                shutdown: CancellationToken::new(),
                accepting_new: Arc::new(AtomicBool::new(true)),
            },
        })
    }

    /// Queue a pending task, returning the queue length after insertion
    ///
    /// The length is informational (e.g. "queued, N ahead of you").
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once shutdown has begun
    /// - [`Error::Config`] if the task is not pending
    pub fn submit(&self, task: Task) -> Result<usize> {
        if !self.workers.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        if task.status() != TaskStatus::Pending {
            return Err(Error::Config {
                message: format!(
                    "task {} is {}, only pending tasks can be submitted",
                    task.id,
                    task.status()
                ),
                key: None,
            });
        }

        let task_id = task.id;
        self.queue.enqueue(task);
        let len = self.queue.len();
        tracing::info!(task_id = %task_id, queue_len = len, "Task submitted");
        Ok(len)
    }

    /// Number of queue entries waiting for a worker
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Configuration this relay runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of the registered storage backends, sorted
    pub fn storage_names(&self) -> Vec<String> {
        self.pipeline
            .storages()
            .names()
            .into_iter()
            .map(String::from)
            .collect()
    }
}
