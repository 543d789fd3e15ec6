//! Job definitions for queue processing.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::code::ErrorCode;
use crate::media::MediaId;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of asynchronous work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Probe,
    Transcribe,
    DetectSilence,
    DetectScenes,
    DescribeFrames,
    IndexScenes,
    SelectClips,
    PlanHeuristic,
    PlanStory,
    ApplyPlan,
}

impl JobKind {
    /// All kinds, in pipeline order.
    pub const ALL: &'static [JobKind] = &[
        JobKind::Probe,
        JobKind::Transcribe,
        JobKind::DetectSilence,
        JobKind::DetectScenes,
        JobKind::DescribeFrames,
        JobKind::IndexScenes,
        JobKind::SelectClips,
        JobKind::PlanHeuristic,
        JobKind::PlanStory,
        JobKind::ApplyPlan,
    ];

    /// Enrichment kinds a caller can request via the enrich endpoint.
    pub const ENRICHMENT: &'static [JobKind] = &[
        JobKind::Transcribe,
        JobKind::DetectSilence,
        JobKind::DetectScenes,
        JobKind::DescribeFrames,
        JobKind::IndexScenes,
        JobKind::SelectClips,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Probe => "probe",
            JobKind::Transcribe => "transcribe",
            JobKind::DetectSilence => "detect_silence",
            JobKind::DetectScenes => "detect_scenes",
            JobKind::DescribeFrames => "describe_frames",
            JobKind::IndexScenes => "index_scenes",
            JobKind::SelectClips => "select_clips",
            JobKind::PlanHeuristic => "plan_heuristic",
            JobKind::PlanStory => "plan_story",
            JobKind::ApplyPlan => "apply_plan",
        }
    }

    /// Whether failures of this kind are worth more than one retry.
    /// Model-side plan failures are usually deterministic, so `PlanStory`
    /// gets a single supervised retry.
    pub fn is_transient(&self) -> bool {
        !matches!(self, JobKind::PlanStory | JobKind::PlanHeuristic)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job state in the lattice `Queued -> Running -> {Completed, Failed, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether `next` is a legal successor of `self`. Terminal states have
    /// no successors; `Queued -> Cancelled` is the only non-Running exit
    /// from the queue.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Queued, JobStatus::Running) => true,
            (JobStatus::Queued, JobStatus::Cancelled) => true,
            (JobStatus::Running, JobStatus::Completed) => true,
            (JobStatus::Running, JobStatus::Failed) => true,
            (JobStatus::Running, JobStatus::Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error surfaced on a failed job, serialised as `{code, message, details?}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl JobError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

/// One unit of asynchronous work.
///
/// A `Failed` job is never mutated after reaching a terminal state; the
/// supervisor may enqueue a fresh successor with an incremented `attempt`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub job_id: JobId,

    /// Owning media
    pub media_id: MediaId,

    /// Job kind
    pub kind: JobKind,

    /// Job status
    #[serde(default)]
    pub status: JobStatus,

    /// Attempt number, 1-based
    pub attempt: u32,

    /// Kind-specific input; must be a deterministic function of registry state
    #[serde(default)]
    pub input: serde_json::Value,

    /// Kind-specific result, present when Completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Error, present when Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,

    /// When the job was enqueued
    pub enqueued_at: DateTime<Utc>,

    /// When a worker claimed the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a freshly queued job.
    pub fn enqueue(media_id: MediaId, kind: JobKind, input: serde_json::Value) -> Self {
        Self {
            job_id: JobId::new(),
            media_id,
            kind,
            status: JobStatus::Queued,
            attempt: 1,
            input,
            result: None,
            error: None,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Create the successor of a failed job, carrying the same input.
    pub fn successor(&self) -> Self {
        Self {
            job_id: JobId::new(),
            media_id: self.media_id.clone(),
            kind: self.kind,
            status: JobStatus::Queued,
            attempt: self.attempt + 1,
            input: self.input.clone(),
            result: None,
            error: None,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Claim the job for execution.
    pub fn into_running(mut self) -> Self {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
        self
    }

    /// Mark the job completed with a result.
    pub fn into_completed(mut self, result: serde_json::Value) -> Self {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        self
    }

    /// Mark the job failed.
    pub fn into_failed(mut self, error: JobError) -> Self {
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
        self
    }

    /// Mark the job cancelled.
    pub fn into_cancelled(mut self) -> Self {
        self.status = JobStatus::Cancelled;
        self.finished_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_lattice() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn test_successor_increments_attempt() {
        let job = Job::enqueue(MediaId::new(), JobKind::Transcribe, serde_json::json!({}));
        let failed = job
            .clone()
            .into_running()
            .into_failed(JobError::new(ErrorCode::ExternalModelTimeout, "timed out"));
        let next = failed.successor();
        assert_eq!(next.attempt, 2);
        assert_eq!(next.status, JobStatus::Queued);
        assert_ne!(next.job_id, failed.job_id);
        // The failed record keeps its terminal state and error.
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.is_some());
    }

    #[test]
    fn test_retry_policy_per_kind() {
        assert!(JobKind::Transcribe.is_transient());
        assert!(JobKind::ApplyPlan.is_transient());
        assert!(!JobKind::PlanStory.is_transient());
    }
}
