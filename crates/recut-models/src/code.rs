//! Error-code taxonomy shared by jobs, renders and the API surface.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes. These are the only codes surfaced beyond the core,
/// serialised in `Job.error` and `Render.error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors, never retried
    SourceUnreachable,
    UnrecognisedFormat,
    InvalidRequest,
    EmptySource,
    NoAudioTrack,

    // Transient errors, retried per policy
    ExternalModelTimeout,
    ExternalModelRateLimited,
    BlobStoreUnavailable,
    EncodeError,

    // Per-segment decode failures fail the owning render
    DecodeError,

    // Contract errors from plan validation
    InvalidPlan,
    UnrenderablePlan,
    InsufficientSignal,

    // Fatal errors, no retry
    OutputWriteError,
    CorruptIntermediate,

    // Lifecycle
    Cancelled,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SourceUnreachable => "source_unreachable",
            ErrorCode::UnrecognisedFormat => "unrecognised_format",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::EmptySource => "empty_source",
            ErrorCode::NoAudioTrack => "no_audio_track",
            ErrorCode::ExternalModelTimeout => "external_model_timeout",
            ErrorCode::ExternalModelRateLimited => "external_model_rate_limited",
            ErrorCode::BlobStoreUnavailable => "blob_store_unavailable",
            ErrorCode::EncodeError => "encode_error",
            ErrorCode::DecodeError => "decode_error",
            ErrorCode::InvalidPlan => "invalid_plan",
            ErrorCode::UnrenderablePlan => "unrenderable_plan",
            ErrorCode::InsufficientSignal => "insufficient_signal",
            ErrorCode::OutputWriteError => "output_write_error",
            ErrorCode::CorruptIntermediate => "corrupt_intermediate",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Conflict => "conflict",
            ErrorCode::Internal => "internal",
        }
    }

    /// Whether the supervisor may enqueue a successor after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ExternalModelTimeout
                | ErrorCode::ExternalModelRateLimited
                | ErrorCode::BlobStoreUnavailable
                | ErrorCode::EncodeError
                | ErrorCode::Internal
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(ErrorCode::ExternalModelTimeout.is_retryable());
        assert!(ErrorCode::EncodeError.is_retryable());
        assert!(!ErrorCode::SourceUnreachable.is_retryable());
        assert!(!ErrorCode::InvalidPlan.is_retryable());
        assert!(!ErrorCode::OutputWriteError.is_retryable());
        assert!(!ErrorCode::Cancelled.is_retryable());
    }

    #[test]
    fn test_wire_strings() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::UnrenderablePlan).unwrap(),
            "\"unrenderable_plan\""
        );
    }
}
