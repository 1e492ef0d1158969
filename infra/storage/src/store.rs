use crate::error::StorageError;
use std::fmt::Debug;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncRead, AsyncSeek};

/// A committed blob as reported by [`PhysicalStore::list_blobs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub id: String,
    pub modified: SystemTime,
}

/// Content store keyed by opaque entry ids.
///
/// Implementations replace blobs wholesale; there are no partial writes. A blob
/// written by [`put`](Self::put) or [`put_large`](Self::put_large) must be readable
/// by [`get`](Self::get) once the call returns.
pub trait PhysicalStore: Send + Sync + 'static {
    type Reader: AsyncRead + AsyncSeek + Unpin + Send + Debug + 'static;

    /// Opens the blob for streaming reads.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] when no blob exists for `id`.
    fn get(&self, id: &str) -> impl Future<Output = Result<Self::Reader, StorageError>> + Send;

    /// Whole-body write for small objects.
    fn put(&self, id: &str, data: &[u8]) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Chunked streaming write for content of unknown length. Returns the number of
    /// bytes copied from `reader`.
    fn put_large<R>(
        &self,
        id: &str,
        reader: R,
    ) -> impl Future<Output = Result<u64, StorageError>> + Send
    where
        R: AsyncRead + Unpin + Send;

    /// # Errors
    /// [`StorageError::NotFound`] when no blob exists for `id`.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn list_blobs(&self) -> impl Future<Output = Result<Vec<BlobInfo>, StorageError>> + Send;

    /// Removes partial uploads untouched for longer than `max_age`. Returns how many
    /// were removed.
    fn purge_partial(
        &self,
        max_age: Duration,
    ) -> impl Future<Output = Result<usize, StorageError>> + Send;
}
