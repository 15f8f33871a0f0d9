use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;

pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Result of storing a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredBlob {
    pub hash: ContentHash,
    pub size: u64,
}

/// Content-addressed blob storage backing item content.
///
/// Identical content is stored once; callers track references themselves.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes. Writing content that already exists is a no-op.
    async fn put(&self, data: &[u8]) -> Result<StoredBlob, StorageError>;

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(hash).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
