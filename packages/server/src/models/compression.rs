use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::metadata::CompressionRecord;
use crate::pipeline::{ListedRecord, UploadOutcome};

fn kib(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

/// Response DTO for a successful upload.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[schema(example = "File compressed and stored")]
    pub message: String,
    /// Original size in KiB.
    #[schema(example = 512.0)]
    pub original_size: f64,
    /// Compressed size in KiB.
    #[schema(example = 128.5)]
    pub compressed_size: f64,
    #[schema(example = 524288)]
    pub original_size_bytes: u64,
    #[schema(example = 131584)]
    pub compressed_size_bytes: u64,
    /// Percentage saved. Negative when the output grew.
    #[schema(example = 74.90234375)]
    pub reduction_percent: f64,
    #[schema(example = "http://localhost:5000/download/01936f0e-1234-7abc-8000-000000000001")]
    pub download_url: String,
    /// Record ID, used with `DELETE /files/{id}`.
    pub file_id: Uuid,
    /// Blob ID, used with `GET /download/{blob_id}`.
    pub blob_id: Uuid,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        let record = outcome.record;
        Self {
            message: "File compressed and stored".into(),
            original_size: kib(record.original_size_bytes),
            compressed_size: kib(record.compressed_size_bytes),
            original_size_bytes: record.original_size_bytes,
            compressed_size_bytes: record.compressed_size_bytes,
            reduction_percent: outcome.reduction_percent,
            download_url: outcome.download_url,
            file_id: record.id,
            blob_id: record.blob_id.as_uuid(),
        }
    }
}

/// One stored file as shown in listings.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: Uuid,
    #[schema(example = "scan.pdf")]
    pub original_name: String,
    #[schema(example = "1700000000000_compressed_scan.pdf")]
    pub compressed_name: String,
    pub blob_id: Uuid,
    /// Original size in KiB.
    #[schema(example = 512.0)]
    pub original_size: f64,
    /// Compressed size in KiB.
    #[schema(example = 128.5)]
    pub compressed_size: f64,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub reduction_percent: f64,
    #[schema(example = "application/pdf")]
    pub mime_type: String,
    #[schema(example = "application/pdf")]
    pub compressed_mime_type: String,
    pub download_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<ListedRecord> for FileResponse {
    fn from(listed: ListedRecord) -> Self {
        let reduction_percent = listed.record.reduction_percent();
        let CompressionRecord {
            id,
            original_name,
            compressed_name,
            blob_id,
            original_size_bytes,
            compressed_size_bytes,
            mime_type,
            compressed_mime_type,
            created_at,
        } = listed.record;
        Self {
            id,
            original_name,
            compressed_name,
            blob_id: blob_id.as_uuid(),
            original_size: kib(original_size_bytes),
            compressed_size: kib(compressed_size_bytes),
            original_size_bytes,
            compressed_size_bytes,
            reduction_percent,
            mime_type,
            compressed_mime_type,
            download_url: listed.download_url,
            created_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    #[schema(example = "File deleted")]
    pub message: String,
    pub id: Uuid,
}
