use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::warn;

use super::error::StorageError;
use super::hash::ContentHash;
use super::id::BlobId;
use super::traits::{BlobInfo, BlobStore};

/// Filesystem-backed blob store.
///
/// Blobs are stored in a sharded directory layout:
/// `{base_path}/{shard}/{id}` holds the bytes and `{base_path}/{shard}/{id}.json`
/// holds the [`BlobInfo`] sidecar. Both files are written to `.tmp` first and
/// renamed into place.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.base_path.join(id.shard()).join(id.to_string())
    }

    fn sidecar_path(&self, id: &BlobId) -> PathBuf {
        self.base_path
            .join(id.shard())
            .join(format!("{id}.json"))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Write `data` to `target` via a temp file and an atomic rename.
    async fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn read_sidecar(&self, id: &BlobId) -> Result<Option<BlobInfo>, StorageError> {
        match fs::read(self.sidecar_path(id)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<BlobId, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let id = BlobId::generate();
        let info = BlobInfo {
            id,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
            checksum: ContentHash::compute(data),
            created_at: Utc::now(),
        };

        let blob_path = self.blob_path(&id);
        self.write_atomic(&blob_path, data).await?;

        let sidecar = serde_json::to_vec(&info)?;
        if let Err(e) = self.write_atomic(&self.sidecar_path(&id), &sidecar).await {
            let _ = fs::remove_file(&blob_path).await;
            return Err(e);
        }

        Ok(id)
    }

    async fn get(&self, id: &BlobId) -> Result<Vec<u8>, StorageError> {
        let data = match fs::read(self.blob_path(id)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        match self.read_sidecar(id).await? {
            Some(info) => {
                let actual = ContentHash::compute(&data);
                if actual != info.checksum {
                    return Err(StorageError::Corrupted {
                        id: id.to_string(),
                        expected: info.checksum.to_hex(),
                        actual: actual.to_hex(),
                    });
                }
            }
            None => warn!(blob_id = %id, "Blob has no info sidecar, skipping checksum"),
        }

        Ok(data)
    }

    /// Fails with `NotFound` when either the bytes or the sidecar are missing.
    async fn head(&self, id: &BlobId) -> Result<BlobInfo, StorageError> {
        if !fs::try_exists(self.blob_path(id)).await? {
            return Err(StorageError::NotFound(id.to_string()));
        }
        self.read_sidecar(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &BlobId) -> Result<(), StorageError> {
        match fs::remove_file(self.blob_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = fs::remove_file(self.sidecar_path(id)).await
            && e.kind() != ErrorKind::NotFound
        {
            warn!(blob_id = %id, error = %e, "Failed to remove blob info sidecar");
        }

        Ok(())
    }
}
