use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Malformed id: {0}")]
    InvalidId(String),

    #[error("Blob not found: {0}")]
    BlobMissing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Body for 4xx responses
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body for 5xx responses. Never carries the underlying cause.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                return internal_failure();
            }
            AppError::InvalidId(id) => {
                tracing::error!("Malformed id: {}", id);
                return internal_failure();
            }
            AppError::BlobMissing(name) => {
                tracing::error!("Blob not found: {}", name);
                return internal_failure();
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                return internal_failure();
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                return internal_failure();
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                return internal_failure();
            }
        };

        (status, Json(MessageResponse { message })).into_response()
    }
}

fn internal_failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: INTERNAL_SERVER_ERROR,
        }),
    )
        .into_response()
}

pub type Result<T> = std::result::Result<T, AppError>;
