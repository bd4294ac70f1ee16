pub mod error;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
pub use error::StorageError;
use futures::stream::BoxStream;

/// Trait defining object storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Get the object stored under `key`
    async fn get_data(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Store `data` under `key`, replacing any previous object.
    ///
    /// The object only becomes visible once the write has fully succeeded, a
    /// failed put leaves nothing behind at `key`.
    async fn put_data(&self, data: Bytes, key: &str) -> Result<(), StorageError>;

    /// Check whether an object exists at `key`
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Lazily list every key under `prefix`.
    ///
    /// Pagination is handled internally, the caller sees one finite sequence.
    /// Listing a prefix with no objects yields an empty stream.
    fn list_keys(&self, prefix: &str) -> BoxStream<'static, Result<String, StorageError>>;
}
