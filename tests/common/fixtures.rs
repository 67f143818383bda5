//! In-memory remote sources, a directory backend, and a recording reporter

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use file_relay::{
    ChatId, FileDescriptor, MessageId, RemoteLocation, RemoteSource, ReportContext, ReportError,
    Reporter, Storage, StorageError, Task, TransportError,
};
use parking_lot::Mutex;

/// Deterministic payload of `len` bytes
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

/// Remote source serving named in-memory objects
#[derive(Default)]
pub struct FakeRemote {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fetches: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an object, returning its location
    pub fn publish(&self, key: &str, data: Vec<u8>) -> RemoteLocation {
        self.objects.lock().insert(key.to_string(), data);
        RemoteLocation::new(key)
    }

    fn object(&self, location: &RemoteLocation) -> Option<Vec<u8>> {
        self.objects.lock().get(location.as_str()).cloned()
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn fetch_range(
        &self,
        location: &RemoteLocation,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let data = self.object(location).ok_or_else(|| TransportError::RangeFetch {
            offset,
            length,
            reason: "no such object".into(),
        })?;
        let start = (offset as usize).min(data.len());
        let end = (start + length as usize).min(data.len());
        Ok(data[start..end].to_vec())
    }

    async fn fetch_whole(
        &self,
        location: &RemoteLocation,
        max_bytes: u64,
    ) -> Result<Vec<u8>, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut data = self
            .object(location)
            .ok_or_else(|| TransportError::WholeFetch("no such object".into()))?;
        data.truncate(max_bytes as usize);
        Ok(data)
    }
}

/// Backend copying files under a root directory
pub struct DirStorage {
    root: PathBuf,
    /// Leading writes that fail
    fail_first: AtomicUsize,
    pub attempts: AtomicUsize,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fail_first: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    pub fn path_of(&self, destination: &str) -> PathBuf {
        self.root.join(destination)
    }
}

#[async_trait]
impl Storage for DirStorage {
    async fn store(&self, destination: &str, source: &Path) -> Result<(), StorageError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!(
                "disk quota exceeded (attempt {})",
                attempt + 1
            )));
        }

        let target = self.path_of(destination);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(source, &target).await?;
        Ok(())
    }
}

/// Reporter keeping every edit per message
#[derive(Default)]
pub struct ChatLog {
    edits: Mutex<Vec<(ChatId, MessageId, String)>>,
}

impl ChatLog {
    pub fn texts(&self) -> Vec<String> {
        self.edits.lock().iter().map(|(_, _, t)| t.clone()).collect()
    }

    pub fn texts_for(&self, message: MessageId) -> Vec<String> {
        self.edits
            .lock()
            .iter()
            .filter(|(_, m, _)| *m == message)
            .map(|(_, _, t)| t.clone())
            .collect()
    }

    pub fn last_for(&self, message: MessageId) -> Option<String> {
        self.texts_for(message).pop()
    }
}

#[async_trait]
impl Reporter for ChatLog {
    async fn update_message(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> Result<(), ReportError> {
        self.edits.lock().push((chat, message, text.to_string()));
        Ok(())
    }
}

/// Pending task for a published object, reporting into `log` under `message`
pub fn task_for(
    location: RemoteLocation,
    size: u64,
    name: &str,
    storage: &str,
    log: &Arc<ChatLog>,
    message: i32,
) -> Task {
    let report = ReportContext::new(ChatId(42), MessageId(message), log.clone());
    Task::new(FileDescriptor::new(location, size, name), storage, report)
}
