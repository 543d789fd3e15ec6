//! Planner error types.

use thiserror::Error;

use recut_models::ErrorCode;

pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("external model timed out")]
    ModelTimeout,

    #[error("external model rate limited")]
    ModelRateLimited,

    #[error("model response was not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("model request failed: {0}")]
    RequestFailed(String),

    #[error("plan is unrenderable: {0}")]
    Unrenderable(String),

    #[error("insufficient signal to plan: {0}")]
    InsufficientSignal(String),

    #[error("plan coverage {actual_s:.1}s outside strict band [{min_s:.1}s, {max_s:.1}s]")]
    CoverageRejected {
        actual_s: f64,
        min_s: f64,
        max_s: f64,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PlannerError {
    /// Map to the shared error-code taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            PlannerError::ModelTimeout => ErrorCode::ExternalModelTimeout,
            PlannerError::ModelRateLimited => ErrorCode::ExternalModelRateLimited,
            PlannerError::MalformedResponse(_) => ErrorCode::InvalidPlan,
            PlannerError::RequestFailed(_) => ErrorCode::ExternalModelTimeout,
            PlannerError::Unrenderable(_) => ErrorCode::UnrenderablePlan,
            PlannerError::InsufficientSignal(_) => ErrorCode::InsufficientSignal,
            PlannerError::CoverageRejected { .. } => ErrorCode::InvalidPlan,
            PlannerError::Http(e) if e.is_timeout() => ErrorCode::ExternalModelTimeout,
            PlannerError::Http(_) => ErrorCode::ExternalModelTimeout,
        }
    }
}
