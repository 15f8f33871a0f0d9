use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BlobStore, BoxReader, StoredBlob};

/// Filesystem-backed blob store.
///
/// Layout: `{base_path}/{first 2 hex chars}/{remaining 62 hex chars}`.
/// Writes go to `{base_path}/.tmp` first and are renamed into place, so a
/// reader never observes a partially written blob.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        let (dir, file) = hash.shard();
        self.base_path.join(dir).join(file)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_new(&self, blob_path: &PathBuf, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = self.temp_path();

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);

            if let Some(parent) = blob_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(&temp_path, blob_path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, data: &[u8]) -> Result<StoredBlob, StorageError> {
        let size = data.len() as u64;
        if size > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: size,
                limit: self.max_size,
            });
        }

        let hash = ContentHash::compute(data);
        let blob_path = self.blob_path(&hash);

        if fs::try_exists(&blob_path).await? {
            debug!(%hash, "Blob already stored");
        } else {
            self.write_new(&blob_path, data).await?;
        }

        Ok(StoredBlob { hash, size })
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(hash)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(hash.to_hex())),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(hash)).await?)
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
