//! Queue message payload.

use serde::{Deserialize, Serialize};

use recut_models::{JobId, JobKind, MediaId};

/// The compact message carried on the stream. The authoritative `Job` record
/// (input, attempt, status) lives in the registry; the message only names it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub media_id: MediaId,
    pub kind: JobKind,
    /// Attempt number of the registry job this message delivers
    pub attempt: u32,
}

impl QueuedJob {
    pub fn new(job_id: JobId, media_id: MediaId, kind: JobKind, attempt: u32) -> Self {
        Self {
            job_id,
            media_id,
            kind,
            attempt,
        }
    }

    /// Deduplication key: one pending message per logical job attempt.
    ///
    /// Enrichment kinds produce one output per media, so their key is
    /// `(kind, media, attempt)` and duplicate submissions collapse. Plan and
    /// apply jobs are distinct per request and key on the job ID. Retried
    /// attempts always get a fresh key so the supervisor's successor is
    /// never swallowed by the dedup guard.
    pub fn idempotency_key(&self) -> String {
        match self.kind {
            JobKind::PlanHeuristic | JobKind::PlanStory | JobKind::ApplyPlan => {
                format!("{}:{}", self.kind.as_str(), self.job_id.as_str())
            }
            _ => format!(
                "{}:{}:{}",
                self.kind.as_str(),
                self.media_id.as_str(),
                self.attempt
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_varies_by_attempt() {
        let media = MediaId::from_string("m-1");
        let a = QueuedJob::new(JobId::new(), media.clone(), JobKind::Transcribe, 1);
        let b = QueuedJob::new(JobId::new(), media.clone(), JobKind::Transcribe, 2);
        let c = QueuedJob::new(JobId::new(), media, JobKind::DetectSilence, 1);
        assert_ne!(a.idempotency_key(), b.idempotency_key());
        assert_ne!(a.idempotency_key(), c.idempotency_key());
        assert_eq!(a.idempotency_key(), "transcribe:m-1:1");
    }

    #[test]
    fn test_plan_jobs_key_on_job_id() {
        let media = MediaId::from_string("m-1");
        let a = QueuedJob::new(
            JobId::from_string("j-1"),
            media.clone(),
            JobKind::PlanStory,
            1,
        );
        let b = QueuedJob::new(JobId::from_string("j-2"), media, JobKind::PlanStory, 1);
        // Two story-plan requests for the same media never collide.
        assert_ne!(a.idempotency_key(), b.idempotency_key());
        assert_eq!(a.idempotency_key(), "plan_story:j-1");
    }
}
