//! Core types for file-relay

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::report::ReportContext;

/// Source of process-local task identifiers
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task within this process
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Allocate the next identifier
    pub fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation the task originated from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message within a conversation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle identifying an object at the remote content source
///
/// The core never interprets it; it is passed back verbatim to the
/// [`RemoteSource`](crate::remote::RemoteSource).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RemoteLocation(pub String);

impl RemoteLocation {
    /// Wrap a source-specific location string
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Borrow the raw location
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Task status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting to be processed
    Pending,
    /// File stored in the backend; waiting to be reported
    Succeeded,
    /// Processing failed; waiting to be reported
    Failed,
    /// Aborted by the originating session
    Canceled,
}

impl TaskStatus {
    /// Whether no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Remote file referenced by a chat message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Where to fetch the bytes from
    pub location: RemoteLocation,
    /// Declared size in bytes; 0 means unknown (fetch the whole object)
    pub size: u64,
    /// Display name, also the default destination path
    pub name: String,
}

impl FileDescriptor {
    /// Describe a remote file
    pub fn new(location: RemoteLocation, size: u64, name: impl Into<String>) -> Self {
        Self {
            location,
            size,
            name: name.into(),
        }
    }

    /// Whether the size is unknown and the single-shot path must be used
    pub fn is_size_unknown(&self) -> bool {
        self.size == 0
    }
}

/// One unit of work: move a remote file into a storage backend
///
/// Created `Pending` by the request layer and mutated only by workers. The
/// status moves exactly once, from `Pending` to a terminal value.
#[derive(Debug)]
pub struct Task {
    /// Local identifier, used for staging filenames and log correlation
    pub id: TaskId,
    /// Remote file
    pub file: FileDescriptor,
    /// Name of the target backend
    pub storage: String,
    /// Destination path inside the backend (display name when `None`)
    pub storage_path: Option<String>,
    /// Where progress and results are reported
    pub report: ReportContext,
    /// When the request layer created the task
    pub created_at: DateTime<Utc>,
    status: TaskStatus,
    error: Option<Error>,
}

impl Task {
    /// Create a pending task
    pub fn new(file: FileDescriptor, storage: impl Into<String>, report: ReportContext) -> Self {
        Self {
            id: TaskId::next(),
            file,
            storage: storage.into(),
            storage_path: None,
            report,
            created_at: Utc::now(),
            status: TaskStatus::Pending,
            error: None,
        }
    }

    /// Set an explicit destination path
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<String>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Current status
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Error recorded by a failed or canceled processing phase
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Time elapsed since the task was created
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Display name of the file
    pub fn file_name(&self) -> &str {
        &self.file.name
    }

    /// Destination path inside the backend
    pub fn storage_path(&self) -> &str {
        self.storage_path.as_deref().unwrap_or(&self.file.name)
    }

    /// Record the outcome of the processing phase
    ///
    /// `Ok` becomes `Succeeded`, cancellation becomes `Canceled`, any other
    /// error becomes `Failed`. Errors are kept for both terminal error states.
    /// Terminal tasks are left untouched.
    pub fn complete(&mut self, outcome: Result<()>) {
        if self.status.is_terminal() {
            tracing::warn!(
                task_id = %self.id,
                status = %self.status,
                "Ignoring outcome for task already in a terminal state"
            );
            return;
        }

        match outcome {
            Ok(()) => self.status = TaskStatus::Succeeded,
            Err(e) => {
                self.status = if e.is_canceled() {
                    TaskStatus::Canceled
                } else {
                    TaskStatus::Failed
                };
                self.error = Some(e);
            }
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}:{}] {} -> {}:{}",
            self.report.chat_id,
            self.report.message_id,
            self.file.name,
            self.storage,
            self.storage_path()
        )
    }
}
