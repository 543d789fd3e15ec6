//! Orchestration properties over the in-memory registry.

use std::sync::Arc;

use recut_models::{
    AspectRatio, ErrorCode, Job, JobError, JobKind, JobStatus, Media, MediaId, Plan, PlanId,
    PlanMode, PlanStatus, Render, RenderStatus, TechMetadata, Transcript,
};
use recut_registry::{MemoryRegistry, Registry};
use recut_worker::supervisor::{check_preconditions, should_retry, Readiness};
use recut_worker::RecutConfig;

fn ready_media(duration: f64) -> Media {
    Media::register("file:///srv/source.mp4").into_ready(TechMetadata {
        duration,
        fps: 30.0,
        width: 1920,
        height: 1080,
        has_audio: true,
        video_codec: "h264".into(),
        audio_codec: Some("aac".into()),
        bitrate: 2_000_000,
    })
}

fn validated_plan(media_id: MediaId) -> Plan {
    let now = chrono::Utc::now();
    Plan {
        plan_id: PlanId::new(),
        media_id,
        mode: PlanMode::Story,
        status: PlanStatus::Validated,
        story_arc: None,
        edl: vec![recut_models::EdlSegment::keep(0.0, 30.0)],
        key_moments: Vec::new(),
        transitions: Vec::new(),
        recommendations: Vec::new(),
        warnings: Vec::new(),
        desired_length_pct: Some(0.3),
        model: Some("planner-default".into()),
        token_usage: None,
        created_at: now,
        updated_at: now,
    }
}

// Property 1: observed job statuses form a prefix of the lattice, and
// terminal records never move again.
#[tokio::test]
async fn job_status_sequence_is_monotonic() {
    let registry = MemoryRegistry::new();
    let job = Job::enqueue(MediaId::new(), JobKind::DetectScenes, serde_json::json!({}));
    registry.create_job(&job).await.unwrap();

    let running = job.clone().into_running();
    assert!(registry
        .update_job_if_status(JobStatus::Queued, &running)
        .await
        .unwrap());

    let failed = running
        .clone()
        .into_failed(JobError::new(ErrorCode::EncodeError, "encoder died"));
    assert!(registry
        .update_job_if_status(JobStatus::Running, &failed)
        .await
        .unwrap());

    // Failed is terminal: no path back to Running or Completed.
    let zombie = failed.clone().into_running();
    assert!(!registry
        .update_job_if_status(JobStatus::Queued, &zombie)
        .await
        .unwrap());
    assert!(!registry
        .update_job_if_status(JobStatus::Running, &zombie)
        .await
        .unwrap());

    let stored = registry.get_job(&job.job_id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.attempt, 1);
}

// The supervisor never mutates a failed record; it enqueues a successor
// with an incremented attempt.
#[tokio::test]
async fn retry_spawns_successor_and_preserves_original() {
    let registry = MemoryRegistry::new();
    let config = RecutConfig::default();

    let job = Job::enqueue(MediaId::new(), JobKind::Transcribe, serde_json::json!({}));
    registry.create_job(&job).await.unwrap();
    let failed = job
        .clone()
        .into_running()
        .into_failed(JobError::new(ErrorCode::ExternalModelTimeout, "timeout"));

    assert!(should_retry(&config, &failed));
    let successor = failed.successor();
    registry.create_job(&successor).await.unwrap();

    let original = registry.get_job(&job.job_id).await.unwrap().unwrap();
    assert_eq!(original.attempt, 1);
    let retry = registry.get_job(&successor.job_id).await.unwrap().unwrap();
    assert_eq!(retry.attempt, 2);
    assert_eq!(retry.status, JobStatus::Queued);
    assert_eq!(retry.input, original.input);
}

// Cross-kind ordering via preconditions: SelectClips waits on its
// producers, then becomes claimable without any explicit job ordering.
#[tokio::test]
async fn preconditions_gate_consumers() {
    let registry = Arc::new(MemoryRegistry::new());
    let media = ready_media(120.0);
    registry.create_media(&media).await.unwrap();

    let select = Job::enqueue(
        media.media_id.clone(),
        JobKind::SelectClips,
        serde_json::json!({}),
    );
    assert_eq!(
        check_preconditions(registry.as_ref(), &select)
            .await
            .unwrap(),
        Readiness::Defer
    );

    registry
        .put_transcript(&Transcript::empty(media.media_id.clone()))
        .await
        .unwrap();
    registry
        .put_silence_map(&recut_models::SilenceMap::full_span(
            media.media_id.clone(),
            0.6,
            120.0,
        ))
        .await
        .unwrap();

    assert_eq!(
        check_preconditions(registry.as_ref(), &select)
            .await
            .unwrap(),
        Readiness::Ready
    );
}

// Multi-ratio fan-out bookkeeping: a failed render never blocks a fresh
// attempt for the same (plan, ratio), and completed siblings survive.
#[tokio::test]
async fn failed_render_does_not_block_reissue() {
    let registry = MemoryRegistry::new();
    let media = ready_media(100.0);
    registry.create_media(&media).await.unwrap();
    let plan = validated_plan(media.media_id.clone());
    registry.create_plan(&plan).await.unwrap();

    // First pass: two complete, one fails mid-encode.
    for (ratio, ok) in [
        (AspectRatio::WIDE, true),
        (AspectRatio::VERTICAL, true),
        (AspectRatio::SQUARE, false),
    ] {
        let render = Render::queued(media.media_id.clone(), plan.plan_id.clone(), ratio);
        registry.create_render(&render).await.unwrap();
        let running = render.clone().into_running();
        registry
            .update_render_if_status(RenderStatus::Queued, &running)
            .await
            .unwrap();
        let terminal = if ok {
            running.into_completed(format!("file:///renders/{}.mp4", ratio.as_filename_part()), 30.0)
        } else {
            running.into_failed(JobError::new(ErrorCode::EncodeError, "mid-encode failure"))
        };
        registry
            .update_render_if_status(RenderStatus::Running, &terminal)
            .await
            .unwrap();
    }

    let renders = registry.list_renders_by_plan(&plan.plan_id).await.unwrap();
    assert_eq!(renders.len(), 3);
    assert_eq!(
        renders
            .iter()
            .filter(|r| r.status == RenderStatus::Completed)
            .count(),
        2
    );

    // Re-issue for the failed ratio only: a fresh record, the failed one
    // untouched, completed outputs still downloadable.
    let reissue = Render::queued(
        media.media_id.clone(),
        plan.plan_id.clone(),
        AspectRatio::SQUARE,
    );
    registry.create_render(&reissue).await.unwrap();

    let renders = registry.list_renders_by_plan(&plan.plan_id).await.unwrap();
    assert_eq!(renders.len(), 4);
    assert!(renders
        .iter()
        .filter(|r| r.status == RenderStatus::Completed)
        .all(|r| r.output_uri.is_some()));
    assert_eq!(
        renders
            .iter()
            .filter(|r| r.aspect_ratio == AspectRatio::SQUARE)
            .count(),
        2
    );
}

// Cancellation leaves no render Running.
#[tokio::test]
async fn cancelled_renders_reach_terminal_states() {
    let registry = MemoryRegistry::new();
    let media = ready_media(100.0);
    registry.create_media(&media).await.unwrap();
    let plan = validated_plan(media.media_id.clone());
    registry.create_plan(&plan).await.unwrap();

    let first = Render::queued(media.media_id.clone(), plan.plan_id.clone(), AspectRatio::WIDE);
    let second = Render::queued(
        media.media_id.clone(),
        plan.plan_id.clone(),
        AspectRatio::VERTICAL,
    );
    registry.create_render(&first).await.unwrap();
    registry.create_render(&second).await.unwrap();

    // First finished before the cancel; second observes the flag.
    let done = first.clone().into_running().into_completed("file:///a.mp4".into(), 30.0);
    registry
        .update_render_if_status(RenderStatus::Queued, &first.clone().into_running())
        .await
        .unwrap();
    registry
        .update_render_if_status(RenderStatus::Running, &done)
        .await
        .unwrap();

    registry
        .update_render_if_status(RenderStatus::Queued, &second.clone().into_running())
        .await
        .unwrap();
    registry
        .update_render_if_status(
            RenderStatus::Running,
            &second.clone().into_running().into_cancelled(),
        )
        .await
        .unwrap();

    let renders = registry.list_renders_by_plan(&plan.plan_id).await.unwrap();
    assert!(renders
        .iter()
        .all(|r| matches!(r.status, RenderStatus::Completed | RenderStatus::Cancelled)));
}
