//! Shared in-memory collaborators for unit tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

use crate::error::{ReportError, StorageError, TransportError};
use crate::remote::RemoteSource;
use crate::report::{ReportContext, Reporter};
use crate::storage::Storage;
use crate::types::{ChatId, FileDescriptor, MessageId, RemoteLocation, Task};

/// Remote source serving a fixed byte buffer
pub(crate) struct MemorySource {
    data: Vec<u8>,
    /// Every `(offset, length)` passed to `fetch_range`
    pub(crate) range_calls: parking_lot::Mutex<Vec<(u64, u64)>>,
    /// Number of `fetch_whole` calls
    pub(crate) whole_calls: AtomicUsize,
    /// Max bytes returned per range call, to simulate short responses
    max_per_call: Option<u64>,
    /// Fail the range call with this index (0-based)
    fail_range_call: Option<usize>,
    fail_whole: bool,
    /// Cancel the token once this many range calls completed
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MemorySource {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            range_calls: parking_lot::Mutex::new(Vec::new()),
            whole_calls: AtomicUsize::new(0),
            max_per_call: None,
            fail_range_call: None,
            fail_whole: false,
            cancel_after: None,
        }
    }

    /// Deterministic payload of `len` bytes
    pub(crate) fn with_len(len: usize) -> Self {
        Self::new((0..len).map(|i| (i % 251) as u8).collect())
    }

    pub(crate) fn max_per_call(mut self, max: u64) -> Self {
        self.max_per_call = Some(max);
        self
    }

    pub(crate) fn fail_range_call(mut self, index: usize) -> Self {
        self.fail_range_call = Some(index);
        self
    }

    pub(crate) fn fail_whole(mut self) -> Self {
        self.fail_whole = true;
        self
    }

    pub(crate) fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn total_fetches(&self) -> usize {
        self.range_calls.lock().len() + self.whole_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for MemorySource {
    async fn fetch_range(
        &self,
        _location: &RemoteLocation,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, TransportError> {
        let index = {
            let mut calls = self.range_calls.lock();
            calls.push((offset, length));
            calls.len() - 1
        };

        if self.fail_range_call == Some(index) {
            return Err(TransportError::RangeFetch {
                offset,
                length,
                reason: "connection reset".into(),
            });
        }

        let length = self.max_per_call.map_or(length, |max| length.min(max));
        let start = (offset as usize).min(self.data.len());
        let end = (start + length as usize).min(self.data.len());
        let chunk = self.data[start..end].to_vec();

        if let Some((after, token)) = &self.cancel_after
            && index + 1 >= *after
        {
            token.cancel();
        }

        Ok(chunk)
    }

    async fn fetch_whole(
        &self,
        _location: &RemoteLocation,
        max_bytes: u64,
    ) -> Result<Vec<u8>, TransportError> {
        self.whole_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_whole {
            return Err(TransportError::WholeFetch("file reference expired".into()));
        }
        let end = (max_bytes as usize).min(self.data.len());
        Ok(self.data[..end].to_vec())
    }
}

/// Reporter that records every message text
#[derive(Default)]
pub(crate) struct RecordingReporter {
    pub(crate) messages: parking_lot::Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub(crate) fn count_starting_with(&self, prefix: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn update_message(
        &self,
        _chat: ChatId,
        _message: MessageId,
        text: &str,
    ) -> Result<(), ReportError> {
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}

/// Backend that records writes and optionally fails
pub(crate) struct RecordingStorage {
    pub(crate) calls: AtomicUsize,
    /// `(destination, staged path, staged size)` of each call
    pub(crate) writes: parking_lot::Mutex<Vec<(String, PathBuf, u64)>>,
    /// Number of leading calls that fail
    fail_first: usize,
}

impl RecordingStorage {
    pub(crate) fn ok() -> Self {
        Self::failing_first(0)
    }

    pub(crate) fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub(crate) fn failing_first(n: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            writes: parking_lot::Mutex::new(Vec::new()),
            fail_first: n,
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn store(&self, destination: &str, source: &Path) -> Result<(), StorageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let size = tokio::fs::metadata(source).await?.len();
        self.writes
            .lock()
            .push((destination.to_string(), source.to_path_buf(), size));

        if call < self.fail_first {
            return Err(StorageError::Backend(format!("write {} rejected", call + 1)));
        }
        Ok(())
    }
}

/// Pending task reporting into `reporter`
pub(crate) fn make_task(
    name: &str,
    size: u64,
    storage: &str,
    reporter: Arc<dyn Reporter>,
) -> Task {
    let report = ReportContext::new(ChatId(100), MessageId(5), reporter);
    Task::new(
        FileDescriptor::new(RemoteLocation::new(format!("doc:{name}")), size, name),
        storage,
        report,
    )
}
