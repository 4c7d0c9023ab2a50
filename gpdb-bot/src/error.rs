//! Error types for gpdb-bot

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::backup::BackupError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Lookup matched nothing (404)
    #[error("{0}")]
    NotFound(String),

    /// Invoker is not a moderator (403)
    #[error("{0}")]
    Unauthorized(String),

    /// Invalid command arguments (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Backup export/restore error
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// gpdb-common error
    #[error("Common error: {0}")]
    Common(#[from] gpdb_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Unauthorized(msg) => (StatusCode::FORBIDDEN, "UNAUTHORIZED", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Backup(BackupError::Missing(ref path)) => (
                StatusCode::NOT_FOUND,
                "BACKUP_MISSING",
                format!("**Backup** not found: {}", path.display()),
            ),
            ApiError::Backup(BackupError::InvalidName(name)) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                format!("Invalid backup name: {}", name),
            ),
            ApiError::Backup(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "BACKUP_ERROR",
                err.to_string(),
            ),
            ApiError::Common(gpdb_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(gpdb_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
