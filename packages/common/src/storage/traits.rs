use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StorageError;
use super::hash::ContentHash;
use super::id::BlobId;

/// What a store remembers about a blob besides its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub id: BlobId,
    /// Name supplied on `put`. Informational only, never a path.
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub checksum: ContentHash,
    pub created_at: DateTime<Utc>,
}

/// Opaque-id blob storage with whole-buffer semantics.
///
/// `get`, `head` and `delete` fail with [`StorageError::NotFound`] for unknown
/// ids. Deleting is not idempotent: a second delete of the same id fails.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return the freshly minted id.
    async fn put(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<BlobId, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, id: &BlobId) -> Result<Vec<u8>, StorageError>;

    /// What was recorded at `put` time, without reading the bytes.
    async fn head(&self, id: &BlobId) -> Result<BlobInfo, StorageError>;

    /// Delete a blob. Fails with `NotFound` if it does not exist.
    async fn delete(&self, id: &BlobId) -> Result<(), StorageError>;
}
