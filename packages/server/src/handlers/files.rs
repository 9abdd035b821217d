use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::BlobId;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::models::compression::{DeleteResponse, FileResponse};
use crate::state::AppState;
use crate::utils::filename::content_disposition_value;

#[utoipa::path(
    get,
    path = "/download/{blob_id}",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download a compressed file",
    description = "Streams the stored compressed bytes as an attachment. The blob ID doubles as \
        the ETag. An `If-None-Match` list containing it (weak or strong) or `*` yields `304` \
        without reading the blob.",
    params(("blob_id" = String, Path, description = "Blob ID returned by the upload")),
    responses(
        (status = 200, description = "Compressed file", content_type = "application/octet-stream"),
        (status = 304, description = "Not modified"),
        (status = 404, description = "Unknown blob ID (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Record exists but blob is missing (STORAGE_INCONSISTENCY), \
            or a store failed (STORE_UNAVAILABLE, STORAGE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(blob_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let blob_id: BlobId = blob_id
        .parse()
        .map_err(|_| AppError::NotFound("File not found".into()))?;

    let stored = state.pipeline.locate(&blob_id).await?;

    let etag_value = stored.etag();
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && etag_matches(val, &etag_value)
    {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag_value)],
        )
            .into_response());
    }

    let file = state.pipeline.fetch(stored).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &file.content_type)
        .header(header::CONTENT_LENGTH, file.data.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&file.filename),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from(file.data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

/// `If-None-Match` uses weak comparison, so `W/"x"` matches `"x"`.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List stored files",
    description = "Returns every compression record, newest first, each with its download URL.",
    responses(
        (status = 200, description = "All stored files", body = Vec<FileResponse>),
        (status = 500, description = "Metadata store failure (STORE_UNAVAILABLE, STORAGE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileResponse>>, AppError> {
    let files = state.pipeline.list().await?;
    Ok(Json(files.into_iter().map(FileResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "Files",
    operation_id = "deleteFile",
    summary = "Delete a stored file",
    description = "Removes the compressed blob and then its record. A record whose blob is \
        already gone is still removed.",
    params(("id" = String, Path, description = "Record ID (`fileId` from the upload)")),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 404, description = "Unknown record (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Store failure (STORE_UNAVAILABLE, STORAGE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = Uuid::parse_str(id.trim()).map_err(|_| AppError::NotFound("File not found".into()))?;

    let record = state.pipeline.delete_record(id).await?;

    Ok(Json(DeleteResponse {
        message: "File deleted".into(),
        id: record.id,
    }))
}
