//! Retry-wrapped persist step: hands a staged file to its storage backend.

use std::path::Path;
use std::sync::Arc;

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::retry::{RetryError, with_retry};
use crate::storage::{Storage, StorageRegistry};
use crate::types::Task;

/// Writes staged files to the backend a task names, retrying failed writes
///
/// The caller owns the staged file and removes it afterwards, whatever the
/// outcome.
#[derive(Clone, Debug)]
pub struct Persister {
    storages: StorageRegistry,
    retry: RetryConfig,
}

impl Persister {
    /// Create a persister over the given backends
    pub fn new(storages: StorageRegistry, retry: RetryConfig) -> Self {
        Self { storages, retry }
    }

    /// Resolve a backend name
    ///
    /// # Errors
    ///
    /// [`Error::UnknownBackend`] if no backend is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Storage>> {
        self.storages
            .get(name)
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))
    }

    /// Registered backends
    pub fn storages(&self) -> &StorageRegistry {
        &self.storages
    }

    /// Store `staged` at the task's destination path
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownBackend`] without any write attempt
    /// - [`Error::Canceled`] if the task's session is canceled
    /// - [`Error::Persist`] carrying the last backend error once every attempt failed
    pub async fn persist(&self, task: &Task, staged: &Path) -> Result<()> {
        let storage = self.resolve(&task.storage)?;
        let destination = task.storage_path();

        tracing::debug!(
            task_id = %task.id,
            storage = %task.storage,
            destination = destination,
            staged = %staged.display(),
            "Storing file"
        );

        let result = with_retry(&self.retry, task.report.cancel_token(), || {
            storage.store(destination, staged)
        })
        .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    task_id = %task.id,
                    storage = %task.storage,
                    destination = destination,
                    "File stored"
                );
                Ok(())
            }
            Err(RetryError::Canceled) => Err(Error::Canceled),
            Err(RetryError::Failed { attempts, error }) => Err(Error::Persist {
                backend: task.storage.clone(),
                attempts,
                source: error,
            }),
        }
    }
}
