//! Remote content source abstraction
//!
//! The core only needs two reads from wherever the chat platform keeps its
//! files: a bounded byte range and a capped whole-object fetch. Connection
//! handling, authentication, and the transport's own retries live behind this
//! trait.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::RemoteLocation;

/// Read access to remote objects
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch up to `length` bytes starting at `offset`
    ///
    /// May return fewer bytes than requested. An empty result means the
    /// object has no data at `offset`.
    async fn fetch_range(
        &self,
        location: &RemoteLocation,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, TransportError>;

    /// Fetch an object of unknown size in one request, reading at most `max_bytes`
    async fn fetch_whole(
        &self,
        location: &RemoteLocation,
        max_bytes: u64,
    ) -> Result<Vec<u8>, TransportError>;
}
