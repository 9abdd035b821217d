use axum::Json;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::models::compression::UploadResponse;
use crate::state::AppState;
use crate::utils::filename::sanitize_upload_name;

/// Multipart boundaries and part headers ride on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn upload_body_limit(max_bytes: u64) -> DefaultBodyLimit {
    let max = usize::try_from(max_bytes).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(max.saturating_add(MULTIPART_OVERHEAD))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Files",
    operation_id = "uploadFile",
    summary = "Upload and compress a file",
    description = "Accepts a PDF or an image in the `file` multipart field. PDFs are rewritten with \
        Ghostscript, images are re-encoded as JPEG. The compressed result is stored and a \
        download link is returned. The declared part content type wins; without one the type \
        is guessed from the filename.",
    request_body(content_type = "multipart/form-data", description = "File to compress"),
    responses(
        (status = 200, description = "File compressed and stored", body = UploadResponse),
        (status = 400, description = "Bad upload (VALIDATION_ERROR, EMPTY_PAYLOAD, PAYLOAD_TOO_LARGE, UNSUPPORTED_TYPE)", body = ErrorBody),
        (status = 500, description = "Compression or storage failed (COMPRESSION_FAILED, STORE_UNAVAILABLE, STORAGE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let limit = state.config.upload.max_bytes;
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields.
        }

        let raw_name = field.file_name().unwrap_or_default().to_string();
        let filename =
            sanitize_upload_name(&raw_name).map_err(|e| AppError::Validation(e.message().into()))?;

        let content_type = match field.content_type() {
            Some(ct) if !ct.trim().is_empty() => ct.to_string(),
            _ => mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };

        let data = read_capped(field, limit).await?;
        upload = Some((filename, content_type, data));
    }

    let (filename, content_type, data) =
        upload.ok_or_else(|| AppError::Validation("No file uploaded".into()))?;

    info!(filename = %filename, content_type = %content_type, size = data.len(), "Received upload");

    let outcome = state
        .pipeline
        .upload(&data, &filename, &content_type)
        .await?;

    Ok(Json(UploadResponse::from(outcome)))
}

/// Reads a multipart field, refusing to buffer more than `limit` bytes.
async fn read_capped(mut field: Field<'_>, limit: u64) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        if (buf.len() + chunk.len()) as u64 > limit {
            return Err(AppError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

fn multipart_error(err: MultipartError, limit: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::Validation(format!("Multipart error: {}", err.body_text()))
    }
}
