use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::error::StorageError;
use super::hash::ContentHash;
use super::id::BlobId;
use super::traits::{BlobInfo, BlobStore};

struct StoredBlob {
    info: BlobInfo,
    data: Vec<u8>,
}

/// In-process blob store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<BlobId, StoredBlob>,
    max_size: Option<u64>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            blobs: DashMap::new(),
            max_size: Some(max_size),
        }
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<BlobId, StorageError> {
        if let Some(limit) = self.max_size
            && data.len() as u64 > limit
        {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit,
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
        self.blobs.insert(
            id,
            StoredBlob {
                info,
                data: data.to_vec(),
            },
        );
        Ok(id)
    }

    async fn get(&self, id: &BlobId) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .get(id)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn head(&self, id: &BlobId) -> Result<BlobInfo, StorageError> {
        self.blobs
            .get(id)
            .map(|blob| blob.info.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &BlobId) -> Result<(), StorageError> {
        self.blobs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}
