//! Retry supervision and job preconditions.

use std::time::Duration;

use rand::Rng;

use recut_models::{Job, JobKind, MediaStatus};
use recut_registry::Registry;

use crate::config::RecutConfig;
use crate::error::WorkerResult;

/// Whether a failed job deserves a successor: the error class must be
/// retryable and the attempt budget for the kind not yet spent.
pub fn should_retry(config: &RecutConfig, job: &Job) -> bool {
    let retryable = job
        .error
        .as_ref()
        .map(|e| e.code.is_retryable())
        .unwrap_or(false);
    retryable && job.attempt < config.max_attempts_for(job.kind)
}

/// Exponential backoff with uniform jitter for a successor of `attempt`
/// (1-based): `base * 2^(attempt-1) + U(0, jitter)`.
pub fn retry_delay(config: &RecutConfig, attempt: u32) -> Duration {
    let exp = config
        .retry_backoff_base_s
        .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(10));
    let jitter = if config.retry_jitter_s > 0 {
        rand::thread_rng().gen_range(0..=config.retry_jitter_s)
    } else {
        0
    };
    Duration::from_secs(exp + jitter)
}

/// Outcome of a precondition check at claim time.
#[derive(Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Preconditions hold; run the handler
    Ready,
    /// Producers have not finished; re-enqueue with a short delay
    Defer,
    /// The job can never run (media failed or deleted)
    Unrunnable(String),
}

/// Check a job's preconditions against registry state.
///
/// Cross-kind ordering is expressed only here: consumers wait for their
/// producers' outputs to exist rather than for specific job records.
pub async fn check_preconditions(registry: &dyn Registry, job: &Job) -> WorkerResult<Readiness> {
    if job.kind == JobKind::Probe {
        return Ok(Readiness::Ready);
    }

    let media = match registry.get_media(&job.media_id).await? {
        Some(m) => m,
        None => return Ok(Readiness::Unrunnable("media not found".into())),
    };

    match media.status {
        MediaStatus::Failed => return Ok(Readiness::Unrunnable("media failed probing".into())),
        MediaStatus::Deleted => return Ok(Readiness::Unrunnable("media deleted".into())),
        MediaStatus::Ready => {}
        MediaStatus::Registered | MediaStatus::Probing => return Ok(Readiness::Defer),
    }

    match job.kind {
        JobKind::SelectClips => {
            let transcript = registry.get_transcript(&job.media_id).await?;
            let silence = registry.get_silence_map(&job.media_id).await?;
            if transcript.is_some() && silence.is_some() {
                Ok(Readiness::Ready)
            } else {
                Ok(Readiness::Defer)
            }
        }
        JobKind::IndexScenes => {
            let cuts = registry.get_scene_cuts(&job.media_id).await?;
            let frames = registry.get_frame_index(&job.media_id).await?;
            if cuts.is_some() && frames.is_some() {
                Ok(Readiness::Ready)
            } else {
                Ok(Readiness::Defer)
            }
        }
        _ => Ok(Readiness::Ready),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_models::{ErrorCode, JobError, Media, MediaId, TechMetadata};
    use recut_registry::MemoryRegistry;
    use std::sync::Arc;

    fn ready_media() -> Media {
        Media::register("file:///tmp/a.mp4").into_ready(TechMetadata {
            duration: 60.0,
            fps: 30.0,
            width: 1920,
            height: 1080,
            has_audio: true,
            video_codec: "h264".into(),
            audio_codec: Some("aac".into()),
            bitrate: 1_000_000,
        })
    }

    #[test]
    fn test_retry_decision_respects_code_and_budget() {
        let config = RecutConfig::default();

        let job = Job::enqueue(MediaId::new(), JobKind::Transcribe, serde_json::json!({}));
        let transient = job
            .clone()
            .into_running()
            .into_failed(JobError::new(ErrorCode::ExternalModelTimeout, "t"));
        assert!(should_retry(&config, &transient));

        let fatal = job
            .clone()
            .into_running()
            .into_failed(JobError::new(ErrorCode::SourceUnreachable, "gone"));
        assert!(!should_retry(&config, &fatal));

        // Attempt budget exhausted.
        let mut exhausted = transient.clone();
        exhausted.attempt = 3;
        assert!(!should_retry(&config, &exhausted));
    }

    #[test]
    fn test_plan_story_single_retry() {
        let config = RecutConfig::default();
        let job = Job::enqueue(MediaId::new(), JobKind::PlanStory, serde_json::json!({}));
        let mut failed = job
            .into_running()
            .into_failed(JobError::new(ErrorCode::ExternalModelTimeout, "t"));
        assert!(should_retry(&config, &failed));
        failed.attempt = 2;
        assert!(!should_retry(&config, &failed));
    }

    #[test]
    fn test_backoff_grows() {
        let mut config = RecutConfig::default();
        config.retry_jitter_s = 0;
        assert_eq!(retry_delay(&config, 1), Duration::from_secs(60));
        assert_eq!(retry_delay(&config, 2), Duration::from_secs(120));
        assert_eq!(retry_delay(&config, 3), Duration::from_secs(240));
    }

    #[tokio::test]
    async fn test_select_clips_defers_until_producers_done() {
        let registry = Arc::new(MemoryRegistry::new());
        let media = ready_media();
        registry.create_media(&media).await.unwrap();

        let job = Job::enqueue(
            media.media_id.clone(),
            JobKind::SelectClips,
            serde_json::json!({}),
        );
        assert_eq!(
            check_preconditions(registry.as_ref(), &job).await.unwrap(),
            Readiness::Defer
        );

        registry
            .put_transcript(&recut_models::Transcript::empty(media.media_id.clone()))
            .await
            .unwrap();
        registry
            .put_silence_map(&recut_models::SilenceMap::empty(media.media_id.clone(), 0.6))
            .await
            .unwrap();
        assert_eq!(
            check_preconditions(registry.as_ref(), &job).await.unwrap(),
            Readiness::Ready
        );
    }

    #[tokio::test]
    async fn test_enrichment_unrunnable_on_failed_media() {
        let registry = Arc::new(MemoryRegistry::new());
        let media = Media::register("http://dead/").into_failed("unreachable");
        registry.create_media(&media).await.unwrap();

        let job = Job::enqueue(media.media_id, JobKind::Transcribe, serde_json::json!({}));
        assert!(matches!(
            check_preconditions(registry.as_ref(), &job).await.unwrap(),
            Readiness::Unrunnable(_)
        ));
    }
}
