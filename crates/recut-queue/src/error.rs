//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("duplicate job rejected: {key}")]
    Duplicate { key: String },

    #[error("enqueue failed: {message}")]
    EnqueueFailed { message: String },
}

impl QueueError {
    pub fn duplicate(key: impl Into<String>) -> Self {
        Self::Duplicate { key: key.into() }
    }

    pub fn enqueue_failed(message: impl Into<String>) -> Self {
        Self::EnqueueFailed {
            message: message.into(),
        }
    }
}
