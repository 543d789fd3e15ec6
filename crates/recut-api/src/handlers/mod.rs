//! Request handlers.

pub mod health;
pub mod media;
pub mod plans;
pub mod renders;

use recut_models::{Job, JobId, JobKind, MediaId};
use recut_queue::{QueueError, QueuedJob};
use recut_registry::Registry;

use crate::error::ApiResult;
use crate::state::AppState;

/// Create a job record and put its message on the queue.
///
/// A duplicate pending submission (same enrichment kind on the same media)
/// collapses: the fresh record is cancelled and `None` is returned.
pub(crate) async fn enqueue_job(
    state: &AppState,
    media_id: MediaId,
    kind: JobKind,
    input: serde_json::Value,
) -> ApiResult<Option<JobId>> {
    let job = Job::enqueue(media_id, kind, input);
    state.registry.create_job(&job).await?;

    let message = QueuedJob::new(job.job_id.clone(), job.media_id.clone(), kind, job.attempt);
    match state.queue.enqueue(&message).await {
        Ok(_) => Ok(Some(job.job_id)),
        Err(QueueError::Duplicate { .. }) => {
            let cancelled = job.clone().into_cancelled();
            state
                .registry
                .update_job_if_status(recut_models::JobStatus::Queued, &cancelled)
                .await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
