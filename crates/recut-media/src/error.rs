//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use recut_models::ErrorCode;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("source unreachable: {0}")]
    SourceUnreachable(String),

    #[error("unrecognised format: {0}")]
    UnrecognisedFormat(String),

    #[error("source has no audio track")]
    NoAudioTrack,

    #[error("decode failed: {message}")]
    DecodeFailed { message: String },

    #[error("encode failed: {message}")]
    EncodeFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("output write failed: {0}")]
    OutputWriteFailed(String),

    #[error("corrupt intermediate: {0}")]
    CorruptIntermediate(PathBuf),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn encode_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodeFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Map to the shared error-code taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            MediaError::SourceUnreachable(_) => ErrorCode::SourceUnreachable,
            MediaError::UnrecognisedFormat(_) | MediaError::FfprobeFailed { .. } => {
                ErrorCode::UnrecognisedFormat
            }
            MediaError::NoAudioTrack => ErrorCode::NoAudioTrack,
            MediaError::DecodeFailed { .. } => ErrorCode::DecodeError,
            MediaError::EncodeFailed { .. } => ErrorCode::EncodeError,
            MediaError::OutputWriteFailed(_) => ErrorCode::OutputWriteError,
            MediaError::CorruptIntermediate(_) => ErrorCode::CorruptIntermediate,
            MediaError::Cancelled => ErrorCode::Cancelled,
            MediaError::Timeout(_) => ErrorCode::Cancelled,
            _ => ErrorCode::Internal,
        }
    }
}
