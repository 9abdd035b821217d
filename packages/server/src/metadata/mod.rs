//! Persisted description of each completed compression job.

mod sea_orm_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::storage::BlobId;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::compression_record;

pub use sea_orm_store::SeaOrmMetadataStore;

/// One successful upload. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionRecord {
    pub id: Uuid,
    pub original_name: String,
    pub compressed_name: String,
    pub blob_id: BlobId,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub mime_type: String,
    pub compressed_mime_type: String,
    pub created_at: DateTime<Utc>,
}

impl CompressionRecord {
    pub fn reduction_percent(&self) -> f64 {
        reduction_percent(self.original_size_bytes, self.compressed_size_bytes)
    }
}

/// Percentage saved going from `original` to `compressed` bytes.
///
/// Negative when compression expanded the input; `0.0` for an empty original.
pub fn reduction_percent(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - compressed as f64) / original as f64 * 100.0
}

/// Everything the caller decides about a record; the store adds `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewCompressionRecord {
    pub original_name: String,
    pub compressed_name: String,
    pub blob_id: BlobId,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub mime_type: String,
    pub compressed_mime_type: String,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{0}")]
    NotFound(String),

    /// The database could not be reached.
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),

    #[error("Metadata store error: {0}")]
    Backend(String),
}

impl From<DbErr> for MetadataError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::Unavailable(err.to_string()),
            DbErr::RecordNotFound(msg) => Self::NotFound(msg),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Queryable store of [`CompressionRecord`]s.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn insert(&self, record: NewCompressionRecord)
    -> Result<CompressionRecord, MetadataError>;

    async fn find_by_id(&self, id: Uuid) -> Result<CompressionRecord, MetadataError>;

    async fn find_by_blob_id(&self, blob_id: &BlobId) -> Result<CompressionRecord, MetadataError>;

    /// All records, newest first. Each call runs a fresh query.
    async fn list_all(&self) -> Result<Vec<CompressionRecord>, MetadataError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), MetadataError>;
}

impl From<compression_record::Model> for CompressionRecord {
    fn from(model: compression_record::Model) -> Self {
        Self {
            id: model.id,
            original_name: model.original_name,
            compressed_name: model.compressed_name,
            blob_id: BlobId::from_uuid(model.blob_id),
            original_size_bytes: u64::try_from(model.original_size).unwrap_or_default(),
            compressed_size_bytes: u64::try_from(model.compressed_size).unwrap_or_default(),
            mime_type: model.mime_type,
            compressed_mime_type: model.compressed_mime_type,
            created_at: model.created_at,
        }
    }
}
