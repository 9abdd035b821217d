use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Structured error response returned by all endpoints on failure.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `EMPTY_PAYLOAD`,
    /// `PAYLOAD_TOO_LARGE`, `UNSUPPORTED_TYPE`, `COMPRESSION_FAILED`, `NOT_FOUND`,
    /// `STORAGE_INCONSISTENCY`, `STORE_UNAVAILABLE`, `STORAGE_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "UNSUPPORTED_TYPE")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Unsupported file type: text/plain")]
    pub error: String,
    /// Underlying diagnostic, e.g. compressor stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Ghostscript compression failed: Error: /syntaxerror in obj")]
    pub details: Option<String>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    EmptyPayload,
    PayloadTooLarge { limit: u64 },
    UnsupportedType(String),
    Compression(String),
    NotFound(String),
    StorageInconsistency(String),
    StoreUnavailable(String),
    StorageFailure(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    error: msg,
                    details: None,
                },
            ),
            AppError::EmptyPayload => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "EMPTY_PAYLOAD",
                    error: "Uploaded file is empty".into(),
                    details: None,
                },
            ),
            AppError::PayloadTooLarge { limit } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    error: format!("File exceeds the maximum size of {limit} bytes"),
                    details: None,
                },
            ),
            AppError::UnsupportedType(mime) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "UNSUPPORTED_TYPE",
                    error: format!("Unsupported file type: {mime}"),
                    details: None,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    error: msg,
                    details: None,
                },
            ),
            AppError::Compression(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "COMPRESSION_FAILED",
                    error: "Compression failed".into(),
                    details: Some(detail),
                },
            ),
            AppError::StorageInconsistency(detail) => {
                tracing::error!("Storage inconsistency: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "STORAGE_INCONSISTENCY",
                        error: "Stored file is missing".into(),
                        details: Some(detail),
                    },
                )
            }
            AppError::StoreUnavailable(detail) => {
                tracing::error!("Store unavailable: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "STORE_UNAVAILABLE",
                        error: "Storage unavailable".into(),
                        details: Some(detail),
                    },
                )
            }
            AppError::StorageFailure(detail) => {
                tracing::error!("Storage operation failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "STORAGE_ERROR",
                        error: "Storage operation failed".into(),
                        details: Some(detail),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        error: "An unexpected error occurred".into(),
                        details: None,
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyPayload => AppError::EmptyPayload,
            PipelineError::PayloadTooLarge { limit, .. } => AppError::PayloadTooLarge { limit },
            PipelineError::UnsupportedType(mime) => AppError::UnsupportedType(mime),
            PipelineError::CompressionFailed(detail) => AppError::Compression(detail),
            PipelineError::NotFound(msg) => AppError::NotFound(msg),
            e @ PipelineError::StorageInconsistency { .. } => {
                AppError::StorageInconsistency(e.to_string())
            }
            PipelineError::StoreUnavailable(detail) => AppError::StoreUnavailable(detail),
            PipelineError::StorageFailure(detail) => AppError::StorageFailure(detail),
        }
    }
}
