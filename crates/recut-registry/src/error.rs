//! Registry error types.

use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors from registry operations.
///
/// A lost conditional update is NOT an error: `update_*_if_status` methods
/// report it through their `bool` return value so callers can treat the race
/// as benign.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Whether the operation is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Backend(e) => {
                e.is_connection_refusal() || e.is_io_error() || e.is_timeout()
            }
            _ => false,
        }
    }
}
