//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use recut_models::ErrorCode;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{message}")]
    Coded {
        code: ErrorCode,
        message: String,
        status: StatusCode,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Registry error: {0}")]
    Registry(#[from] recut_registry::RegistryError),

    #[error("Queue error: {0}")]
    Queue(#[from] recut_queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] recut_storage::StorageError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// A 400 carrying a stable error code, e.g. `empty_source`.
    pub fn coded(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::Coded {
            code,
            message: msg.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Coded { status, .. } => *status,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_)
            | ApiError::Registry(_)
            | ApiError::Queue(_)
            | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<ErrorCode> {
        match self {
            ApiError::Coded { code, .. } => Some(*code),
            ApiError::BadRequest(_) => Some(ErrorCode::InvalidRequest),
            ApiError::Conflict(_) => Some(ErrorCode::Conflict),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Backend detail stays in the logs, not in responses.
        let message = match &self {
            ApiError::Internal(_)
            | ApiError::Registry(_)
            | ApiError::Queue(_)
            | ApiError::Storage(_) => {
                tracing::error!(error = %self, "Internal API error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            message,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
