//! Storage backend registry
//!
//! Backends (local filesystem, WebDAV, remote file managers) are configured
//! outside the core and registered here under their name. Tasks refer to a
//! backend by that exact name.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::StorageError;

/// Write capability of a storage backend
///
/// Implementations must tolerate concurrent writes to distinct destination
/// paths.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Copy the staged file at `source` to `destination` inside the backend
    async fn store(&self, destination: &str, source: &Path) -> Result<(), StorageError>;
}

/// Backends keyed by name
#[derive(Clone, Default)]
pub struct StorageRegistry {
    backends: HashMap<String, Arc<dyn Storage>>,
}

impl StorageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, storage: Arc<dyn Storage>) {
        let name = name.into();
        if self.backends.insert(name.clone(), storage).is_some() {
            tracing::warn!(storage = %name, "Replaced existing storage backend");
        }
    }

    /// Builder-style [`register`](Self::register)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        self.register(name, storage);
        self
    }

    /// Look up a backend by exact name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Storage>> {
        self.backends.get(name).cloned()
    }

    /// Whether a backend with this exact name exists
    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Registered backend names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether no backend is registered
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
