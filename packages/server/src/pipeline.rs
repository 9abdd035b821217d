//! Upload, download, listing and deletion of compressed files.
//!
//! The pipeline owns the ordering between the compressor, the blob store and
//! the metadata store. A record is only ever written after its blob exists,
//! and a blob whose record insert fails is removed again, so every record
//! points at a blob and no blob is left without a record.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use common::compress::{CompressError, CompressorRegistry};
use common::storage::{BlobId, BlobInfo, BlobStore, StorageError};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::metadata::{
    CompressionRecord, MetadataError, MetadataStore, NewCompressionRecord, reduction_percent,
};
use crate::utils::filename::{compressed_name, download_filename};

/// Where an upload was when it finished or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Dispatched,
    Compressed,
    BlobStored,
    MetadataStored,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Dispatched => "dispatched",
            Self::Compressed => "compressed",
            Self::BlobStored => "blob_stored",
            Self::MetadataStored => "metadata_stored",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Uploaded file is empty")]
    EmptyPayload,

    #[error("File is {size} bytes; the limit is {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// The compressor ran and failed; carries its diagnostic.
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("{0}")]
    NotFound(String),

    /// A record exists but its blob does not.
    #[error("Stored file {blob_id} for record {record_id} is missing")]
    StorageInconsistency { record_id: Uuid, blob_id: BlobId },

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),

    /// A store was reachable but refused or mangled the operation.
    #[error("Storage operation failed: {0}")]
    StorageFailure(String),
}

impl From<CompressError> for PipelineError {
    fn from(err: CompressError) -> Self {
        match err {
            CompressError::UnsupportedType(mime) => Self::UnsupportedType(mime),
            failed @ CompressError::Failed { .. } => Self::CompressionFailed(failed.to_string()),
        }
    }
}

impl From<MetadataError> for PipelineError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(msg) => Self::NotFound(msg),
            unavailable @ MetadataError::Unavailable(_) => {
                Self::StoreUnavailable(unavailable.to_string())
            }
            backend @ MetadataError::Backend(_) => Self::StorageFailure(backend.to_string()),
        }
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => Self::NotFound(format!("Blob {id} not found")),
            io @ StorageError::Io(_) => Self::StoreUnavailable(io.to_string()),
            other => Self::StorageFailure(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Uploads above this many bytes are refused.
    pub max_upload_bytes: u64,
    /// Prefix for download URLs, without a trailing slash.
    pub download_base: String,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub record: CompressionRecord,
    pub reduction_percent: f64,
    pub download_url: String,
}

/// A record whose blob is known to exist, before its bytes are read.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub record: CompressionRecord,
    pub info: BlobInfo,
}

impl StoredFile {
    /// Strong validator for the stored bytes. Blobs are immutable, so the id suffices.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.record.blob_id)
    }
}

#[derive(Debug)]
pub struct DownloadedFile {
    pub data: Vec<u8>,
    pub content_type: String,
    pub filename: String,
    pub record: CompressionRecord,
}

/// A record as presented in listings.
#[derive(Debug, Clone)]
pub struct ListedRecord {
    pub record: CompressionRecord,
    pub download_url: String,
}

pub struct CompressionPipeline {
    compressors: CompressorRegistry,
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    settings: PipelineSettings,
}

impl CompressionPipeline {
    pub fn new(
        compressors: CompressorRegistry,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            compressors,
            blobs,
            metadata,
            settings,
        }
    }

    pub fn download_url(&self, blob_id: &BlobId) -> String {
        format!("{}/download/{blob_id}", self.settings.download_base)
    }

    #[instrument(skip(self, buffer), fields(size = buffer.len()))]
    pub async fn upload(
        &self,
        buffer: &[u8],
        original_name: &str,
        mime_type: &str,
    ) -> Result<UploadOutcome, PipelineError> {
        let original_size = buffer.len() as u64;
        if original_size == 0 {
            return Err(failed_at(UploadStage::Received, PipelineError::EmptyPayload));
        }
        if original_size > self.settings.max_upload_bytes {
            return Err(failed_at(
                UploadStage::Received,
                PipelineError::PayloadTooLarge {
                    size: original_size,
                    limit: self.settings.max_upload_bytes,
                },
            ));
        }

        let compressed = self
            .compressors
            .compress(buffer, mime_type)
            .await
            .map_err(|e| failed_at(UploadStage::Dispatched, e.into()))?;
        let compressed_size = compressed.data.len() as u64;
        let reduction = reduction_percent(original_size, compressed_size);
        info!(
            strategy = compressed.strategy,
            original_size,
            compressed_size,
            reduction_percent = reduction,
            "Compressed upload"
        );

        let stored_name = compressed_name(original_name, Utc::now());
        let blob_id = self
            .blobs
            .put(&compressed.data, &stored_name, &compressed.content_type)
            .await
            .map_err(|e| failed_at(UploadStage::Compressed, e.into()))?;

        let new_record = NewCompressionRecord {
            original_name: original_name.to_string(),
            compressed_name: stored_name,
            blob_id,
            original_size_bytes: original_size,
            compressed_size_bytes: compressed_size,
            mime_type: mime_type.to_string(),
            compressed_mime_type: compressed.content_type,
        };

        let record = match self.metadata.insert(new_record).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&blob_id).await {
                    error!(
                        blob_id = %blob_id,
                        error = %cleanup,
                        "Failed to remove blob after metadata insert failed; blob is orphaned"
                    );
                }
                return Err(failed_at(UploadStage::BlobStored, e.into()));
            }
        };

        info!(
            stage = %UploadStage::MetadataStored,
            record_id = %record.id,
            blob_id = %record.blob_id,
            "Upload complete"
        );

        Ok(UploadOutcome {
            download_url: self.download_url(&record.blob_id),
            reduction_percent: reduction,
            record,
        })
    }

    /// Finds the record for `blob_id` and checks its blob without reading it.
    #[instrument(skip(self), fields(blob_id = %blob_id))]
    pub async fn locate(&self, blob_id: &BlobId) -> Result<StoredFile, PipelineError> {
        let record = self.metadata.find_by_blob_id(blob_id).await?;

        match self.blobs.head(blob_id).await {
            Ok(info) => Ok(StoredFile { record, info }),
            Err(e) if e.is_not_found() => Err(inconsistent(&record)),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the bytes of a located file.
    #[instrument(skip(self, stored), fields(blob_id = %stored.record.blob_id))]
    pub async fn fetch(&self, stored: StoredFile) -> Result<DownloadedFile, PipelineError> {
        let StoredFile { record, .. } = stored;

        let data = match self.blobs.get(&record.blob_id).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => return Err(inconsistent(&record)),
            Err(e) => return Err(e.into()),
        };

        Ok(DownloadedFile {
            data,
            content_type: record.compressed_mime_type.clone(),
            filename: download_filename(&record.original_name, &record.compressed_mime_type),
            record,
        })
    }

    pub async fn download(&self, blob_id: &BlobId) -> Result<DownloadedFile, PipelineError> {
        let stored = self.locate(blob_id).await?;
        self.fetch(stored).await
    }

    pub async fn list(&self) -> Result<Vec<ListedRecord>, PipelineError> {
        let records = self.metadata.list_all().await?;
        Ok(records
            .into_iter()
            .map(|record| ListedRecord {
                download_url: self.download_url(&record.blob_id),
                record,
            })
            .collect())
    }

    /// Removes a record and its blob. Returns the deleted record.
    #[instrument(skip(self))]
    pub async fn delete_record(&self, id: Uuid) -> Result<CompressionRecord, PipelineError> {
        let record = self.metadata.find_by_id(id).await?;

        match self.blobs.delete(&record.blob_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(blob_id = %record.blob_id, "Blob already gone; removing dangling record");
            }
            Err(e) => return Err(e.into()),
        }

        self.metadata.delete_by_id(id).await?;
        info!(blob_id = %record.blob_id, "Deleted file");
        Ok(record)
    }
}

fn inconsistent(record: &CompressionRecord) -> PipelineError {
    error!(record_id = %record.id, blob_id = %record.blob_id, "Record references a missing blob");
    PipelineError::StorageInconsistency {
        record_id: record.id,
        blob_id: record.blob_id,
    }
}

fn failed_at(stage: UploadStage, err: PipelineError) -> PipelineError {
    warn!(stage = %stage, error = %err, "Upload failed");
    err
}
