//! Chunked reader over a remote object
//!
//! [`ChunkedReader`] turns a byte range of a remote object into a sequential,
//! non-seekable stream. It issues one [`RemoteSource::fetch_range`] per chunk
//! window, advances by however many bytes the source actually returned, and
//! notifies a [`ProgressSink`] after every chunk.
//!
//! Objects of unknown size (declared size 0) must not go through the reader;
//! callers fetch them with a single [`RemoteSource::fetch_whole`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use file_relay::reader::{ChunkedReader, NoProgress, preferred_chunk_size};
//! use file_relay::remote::RemoteSource;
//! use file_relay::types::RemoteLocation;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(source: Arc<dyn RemoteSource>) -> file_relay::Result<()> {
//! let size = 5_000_000;
//! let mut reader = ChunkedReader::new(
//!     source,
//!     RemoteLocation::new("doc:1"),
//!     0,
//!     size - 1,
//!     size,
//!     Arc::new(NoProgress),
//!     preferred_chunk_size(size),
//!     CancellationToken::new(),
//! )?;
//!
//! let mut file = tokio::fs::File::create("staged.bin").await?;
//! let written = reader.copy_to(&mut file).await?;
//! assert_eq!(written, size);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures::Stream;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result, TransportError};
use crate::remote::RemoteSource;
use crate::types::RemoteLocation;

/// Smallest chunk window requested from the remote source
pub const MIN_CHUNK_SIZE: u64 = 4 * 1024;

/// Largest chunk window requested from the remote source
pub const MAX_CHUNK_SIZE: u64 = 1024 * 1024;

/// Receives `(bytes_read, total_length)` after every chunk
///
/// Called once per chunk; implementations that drive user-visible updates are
/// expected to throttle themselves.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Report cumulative progress
    async fn on_progress(&self, bytes_read: u64, total: u64);
}

/// Progress sink that ignores every sample
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn on_progress(&self, _bytes_read: u64, _total: u64) {}
}

/// Chunk size for an object of `size` bytes
///
/// Roughly one percent of the object, rounded up to a 4 KiB multiple and
/// clamped to [`MIN_CHUNK_SIZE`]..=[`MAX_CHUNK_SIZE`].
pub fn preferred_chunk_size(size: u64) -> u64 {
    let raw = size / 100;
    let aligned = raw.div_ceil(MIN_CHUNK_SIZE) * MIN_CHUNK_SIZE;
    aligned.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

/// Sequential reader over `[start, end]` of a remote object
///
/// Dropping the reader at any point releases everything it holds, so it is
/// safe to abandon on error paths.
pub struct ChunkedReader {
    source: Arc<dyn RemoteSource>,
    location: RemoteLocation,
    /// Absolute offset of the next byte to fetch
    offset: u64,
    /// Bytes still to deliver
    remaining: u64,
    /// Bytes delivered so far
    read: u64,
    total: u64,
    chunk_size: u64,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl ChunkedReader {
    /// Create a reader producing exactly `end - start + 1` bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] when `start > end` or `end` lies beyond
    /// `total`, and a config error when `chunk_size` is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn RemoteSource>,
        location: RemoteLocation,
        start: u64,
        end: u64,
        total: u64,
        progress: Arc<dyn ProgressSink>,
        chunk_size: u64,
        cancel: CancellationToken,
    ) -> Result<Self> {
        if start > end || end >= total {
            return Err(Error::InvalidRange { start, end, total });
        }
        if chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk size must be greater than 0".into(),
                key: Some("transfer.chunk_size".into()),
            });
        }

        Ok(Self {
            source,
            location,
            offset: start,
            remaining: end - start + 1,
            read: 0,
            total,
            chunk_size,
            progress,
            cancel,
        })
    }

    /// Total bytes this reader produces
    pub fn len(&self) -> u64 {
        self.read + self.remaining
    }

    /// Whether the range is empty (never true for a constructed reader)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes delivered so far
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    /// Fetch the next chunk window, or `None` once the range is exhausted
    ///
    /// # Errors
    ///
    /// - [`Error::Canceled`] if the cancellation token fires before or during the fetch
    /// - [`Error::Transport`] if the source fails or runs out of data early
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let want = self.remaining.min(self.chunk_size);
        let mut chunk = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Canceled),
            res = self.source.fetch_range(&self.location, self.offset, want) => res?,
        };

        if chunk.is_empty() {
            return Err(TransportError::ShortRead {
                expected: self.len(),
                received: self.read,
            }
            .into());
        }
        // The source may hand back a larger window than asked for
        chunk.truncate(want as usize);

        let n = chunk.len() as u64;
        self.offset += n;
        self.remaining -= n;
        self.read += n;

        tracing::trace!(
            location = self.location.as_str(),
            bytes_read = self.read,
            total = self.total,
            "Fetched chunk"
        );
        self.progress.on_progress(self.read, self.total).await;

        Ok(Some(chunk))
    }

    /// Drain the reader into `writer`, returning the number of bytes written
    pub async fn copy_to<W>(&mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0;
        while let Some(chunk) = self.next_chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    /// Consume the reader as a stream of chunks
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<u8>>> + Send {
        futures::stream::try_unfold(self, |mut reader| async move {
            Ok::<_, Error>(reader.next_chunk().await?.map(|chunk| (chunk, reader)))
        })
    }
}

impl std::fmt::Debug for ChunkedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedReader")
            .field("location", &self.location)
            .field("offset", &self.offset)
            .field("remaining", &self.remaining)
            .field("total", &self.total)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}
