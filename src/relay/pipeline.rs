//! Task pipeline: stages a remote file locally and persists it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::persist::Persister;
use crate::reader::{ChunkedReader, preferred_chunk_size};
use crate::remote::RemoteSource;
use crate::storage::StorageRegistry;
use crate::types::Task;
use crate::utils::{remove_staged, sanitize_file_name};

use super::progress::MessageProgress;

/// Per-task control flow for the processing phase
///
/// Phases:
/// 1. Resolve the backend (fail fast, nothing fetched)
/// 2. Stage the remote file under the staging directory
/// 3. Persist the staged copy through the [`Persister`]
/// 4. Remove the staged copy, whatever happened
pub(crate) struct Pipeline {
    config: Arc<Config>,
    source: Arc<dyn RemoteSource>,
    persister: Persister,
}

impl Pipeline {
    pub(crate) fn new(
        config: Arc<Config>,
        source: Arc<dyn RemoteSource>,
        persister: Persister,
    ) -> Self {
        Self {
            config,
            source,
            persister,
        }
    }

    pub(crate) fn storages(&self) -> &StorageRegistry {
        self.persister.storages()
    }

    /// Local path a task is staged at
    ///
    /// Prefixed with the task id so tasks sharing a display name never collide.
    pub(crate) fn staging_path(&self, task: &Task) -> PathBuf {
        self.config
            .temp_dir()
            .join(format!("{}_{}", task.id, sanitize_file_name(task.file_name())))
    }

    /// Run the processing phase and record the outcome on the task
    pub(crate) async fn process(&self, task: &mut Task) {
        tracing::debug!(task_id = %task.id, task = %task, "Start processing task");

        let outcome = self.run(task).await;
        if let Err(e) = &outcome {
            if e.is_canceled() {
                tracing::debug!(task_id = %task.id, "Task canceled during processing");
            } else {
                tracing::error!(
                    task_id = %task.id,
                    storage = %task.storage,
                    error = %e,
                    code = e.code(),
                    "Failed to process task"
                );
            }
        }

        task.complete(outcome);
    }

    async fn run(&self, task: &Task) -> Result<()> {
        self.persister.resolve(&task.storage)?;
        if task.report.is_canceled() {
            return Err(Error::Canceled);
        }

        task.report.update(&format!("Downloading: {task}")).await;
        tokio::fs::create_dir_all(self.config.temp_dir()).await?;

        let staged = self.staging_path(task);
        let outcome = self.stage_and_persist(task, &staged).await;
        remove_staged(&staged).await;
        outcome
    }

    async fn stage_and_persist(&self, task: &Task, staged: &Path) -> Result<()> {
        let bytes = self.stage(task, staged).await?;
        tracing::info!(
            task_id = %task.id,
            path = %staged.display(),
            bytes = bytes,
            "Downloaded file"
        );

        task.report
            .update(&format!(
                "Download complete: {}\nSaving file...",
                task.file_name()
            ))
            .await;

        self.persister.persist(task, staged).await
    }

    /// Download the remote object into `staged`, returning the bytes written
    async fn stage(&self, task: &Task, staged: &Path) -> Result<u64> {
        if task.file.is_size_unknown() {
            return self.stage_whole(task, staged).await;
        }

        let size = task.file.size;
        let chunk_size = self
            .config
            .transfer
            .chunk_size
            .unwrap_or_else(|| preferred_chunk_size(size));
        let progress = MessageProgress::new(
            task.report.clone(),
            task.to_string(),
            size,
            self.config.transfer.progress_threshold,
        );

        let mut reader = ChunkedReader::new(
            Arc::clone(&self.source),
            task.file.location.clone(),
            0,
            size - 1,
            size,
            Arc::new(progress),
            chunk_size,
            task.report.cancel_token().clone(),
        )?;

        let mut file = tokio::fs::File::create(staged).await?;
        let written = reader.copy_to(&mut file).await?;
        file.sync_all().await?;
        Ok(written)
    }

    /// Single-shot fetch for objects of unknown size
    async fn stage_whole(&self, task: &Task, staged: &Path) -> Result<u64> {
        let limit = self.config.transfer.single_shot_limit;
        let cancel = task.report.cancel_token();

        let mut bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            res = self.source.fetch_whole(&task.file.location, limit) => res?,
        };
        // Enforce the cap even if the source ignores it
        bytes.truncate(limit as usize);

        let mut file = tokio::fs::File::create(staged).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        Ok(bytes.len() as u64)
    }
}
