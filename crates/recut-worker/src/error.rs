//! Worker error types and the mapping into the shared taxonomy.

use thiserror::Error;

use recut_models::{ErrorCode, JobError};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("media error: {0}")]
    Media(#[from] recut_media::MediaError),

    #[error("registry error: {0}")]
    Registry(#[from] recut_registry::RegistryError),

    #[error("queue error: {0}")]
    Queue(#[from] recut_queue::QueueError),

    #[error("storage error: {0}")]
    Storage(#[from] recut_storage::StorageError),

    #[error("planner error: {0}")]
    Planner(#[from] recut_planner::PlannerError),

    #[error("transcriber failed: {0}")]
    TranscriberFailed(String),

    #[error("frame describer failed: {0}")]
    DescriberFailed(String),

    #[error("invalid job input: {0}")]
    InvalidInput(String),

    #[error("job cancelled")]
    Cancelled,

    #[error("{code}: {message}")]
    Tagged { code: ErrorCode, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn tagged(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Tagged {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Map to the shared error-code taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            WorkerError::Media(e) => e.code(),
            WorkerError::Planner(e) => e.code(),
            WorkerError::Registry(_) => ErrorCode::Internal,
            WorkerError::Queue(_) => ErrorCode::Internal,
            WorkerError::Storage(_) => ErrorCode::BlobStoreUnavailable,
            WorkerError::TranscriberFailed(_) => ErrorCode::ExternalModelTimeout,
            WorkerError::DescriberFailed(_) => ErrorCode::ExternalModelTimeout,
            WorkerError::InvalidInput(_) => ErrorCode::InvalidRequest,
            WorkerError::Cancelled => ErrorCode::Cancelled,
            WorkerError::Tagged { code, .. } => *code,
            WorkerError::Io(_) => ErrorCode::Internal,
            WorkerError::Serialization(_) => ErrorCode::Internal,
        }
    }

    /// Serialisable form for `Job.error` / `Render.error`.
    pub fn to_job_error(&self) -> JobError {
        JobError::new(self.code(), self.to_string())
    }

    /// Whether the supervisor may enqueue a successor.
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}
