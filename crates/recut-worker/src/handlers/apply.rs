//! ApplyPlan handler: execute a validated plan's EDL against the source,
//! one output per requested aspect ratio.
//!
//! Ratios render concurrently, one task each; within a ratio, segment
//! extraction fans out up to the configured parallelism while concatenation
//! stays serial and in EDL order. One ratio failing never cancels the
//! others; the job completes only when every child render completed.

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

use recut_media::captions::{retime_captions, to_srt};
use recut_media::render::{
    concat_segments, extract_segment, finalize_output, normalize_keeps, EncodeProfile,
};
use recut_models::{
    AspectRatio, EdlSegment, ErrorCode, Job, Media, Plan, PlanId, PlanStatus, Render, RenderStatus,
};
use recut_registry::Registry;
use recut_storage::{layout, BlobStore};

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::require_ready_media;

#[derive(Debug, Deserialize)]
struct ApplyInput {
    plan_id: PlanId,
    aspect_ratios: Vec<AspectRatio>,
    #[serde(default)]
    captions: bool,
    #[serde(default)]
    normalise_audio: bool,
}

pub async fn run(
    ctx: &WorkerContext,
    job: &Job,
    cancel: watch::Receiver<bool>,
) -> WorkerResult<serde_json::Value> {
    let input: ApplyInput = serde_json::from_value(job.input.clone())
        .map_err(|e| WorkerError::invalid_input(e.to_string()))?;

    let media = require_ready_media(ctx, job).await?;
    if !media.has_content() {
        return Err(WorkerError::tagged(
            ErrorCode::EmptySource,
            "cannot render an empty source",
        ));
    }

    let plan = ctx
        .registry
        .get_plan(&input.plan_id)
        .await?
        .ok_or_else(|| WorkerError::invalid_input(format!("plan {} not found", input.plan_id)))?;
    if matches!(plan.status, PlanStatus::Draft | PlanStatus::Rejected) {
        return Err(WorkerError::invalid_input(format!(
            "plan {} is not renderable (status {})",
            plan.plan_id,
            plan.status.as_str()
        )));
    }

    // A validated plan can be re-rendered any number of times.
    let mut rendering = plan.clone();
    rendering.status = PlanStatus::Rendering;
    rendering.updated_at = chrono::Utc::now();
    let _ = ctx
        .registry
        .update_plan_if_status(PlanStatus::Validated, &rendering)
        .await?;

    let fps = media.tech.as_ref().map(|t| t.fps).unwrap_or(30.0);
    let keeps: Vec<EdlSegment> = normalize_keeps(
        &plan.keep_segments().cloned().collect::<Vec<_>>(),
        fps,
    );
    if keeps.is_empty() {
        return Err(WorkerError::tagged(
            ErrorCode::UnrenderablePlan,
            "no keep material after normalisation",
        ));
    }

    // Captions burn on the output timeline, shifted per the EDL mapping.
    let srt = if input.captions {
        match ctx.registry.get_transcript(&job.media_id).await? {
            Some(t) if !t.segments.is_empty() => {
                let captions = retime_captions(&t.segments, &keeps);
                Some(to_srt(&captions))
            }
            _ => {
                warn!(media_id = %job.media_id, "Captions requested but no transcript exists");
                None
            }
        }
    } else {
        None
    };

    // One Render per (plan, ratio). Completed records short-circuit; failed
    // or cancelled ones do not block a fresh attempt.
    let existing = ctx.registry.list_renders_by_plan(&plan.plan_id).await?;
    let mut ratios: Vec<AspectRatio> = Vec::new();
    for ratio in &input.aspect_ratios {
        if !ratios.contains(ratio) {
            ratios.push(*ratio);
        }
    }

    let mut work: Vec<Render> = Vec::new();
    let mut completed_before: Vec<Render> = Vec::new();
    for ratio in &ratios {
        if let Some(done) = existing
            .iter()
            .find(|r| r.aspect_ratio == *ratio && r.status == RenderStatus::Completed)
        {
            completed_before.push(done.clone());
            continue;
        }
        let render = Render::queued(media.media_id.clone(), plan.plan_id.clone(), *ratio);
        ctx.registry.create_render(&render).await?;
        work.push(render);
    }

    let segment_semaphore = Arc::new(Semaphore::new(ctx.config.render_segment_parallelism.max(1)));

    let tasks = work.into_iter().map(|render| {
        render_one_ratio(
            ctx,
            job,
            &media,
            &plan,
            render,
            keeps.clone(),
            srt.clone(),
            input.normalise_audio,
            segment_semaphore.clone(),
            cancel.clone(),
        )
    });
    let outcomes: Vec<(AspectRatio, Result<Render, WorkerError>)> =
        futures::future::join_all(tasks).await;

    // Scratch objects are scoped to this job and die with it.
    if let Err(e) = ctx.blobs.delete_prefix(&layout::tmp_prefix(&job.job_id)).await {
        warn!(job_id = %job.job_id, error = %e, "Failed to clean tmp prefix");
    }

    let mut completed = completed_before;
    let mut failures: Vec<(AspectRatio, WorkerError)> = Vec::new();
    let mut cancelled = false;
    for (ratio, outcome) in outcomes {
        match outcome {
            Ok(render) => completed.push(render),
            Err(WorkerError::Cancelled) => cancelled = true,
            Err(e) => failures.push((ratio, e)),
        }
    }

    if cancelled {
        return Err(WorkerError::Cancelled);
    }

    if failures.is_empty() {
        let mut rendered = rendering.clone();
        rendered.status = PlanStatus::Rendered;
        rendered.updated_at = chrono::Utc::now();
        let _ = ctx
            .registry
            .update_plan_if_status(PlanStatus::Rendering, &rendered)
            .await?;

        info!(plan_id = %plan.plan_id, renders = completed.len(), "All renders completed");
        Ok(json!({
            "renders": completed
                .iter()
                .map(|r| json!({
                    "render_id": r.render_id,
                    "aspect_ratio": r.aspect_ratio.to_string(),
                    "output_uri": r.output_uri,
                }))
                .collect::<Vec<_>>(),
        }))
    } else {
        let detail: Vec<String> = failures
            .iter()
            .map(|(ratio, e)| format!("{}: {}", ratio, e))
            .collect();
        Err(WorkerError::tagged(
            failures[0].1.code(),
            format!(
                "{} of {} renders failed: {}",
                failures.len(),
                ratios.len(),
                detail.join("; ")
            ),
        ))
    }
}

/// Render one aspect ratio end to end, driving its own `Render` record.
#[allow(clippy::too_many_arguments)]
async fn render_one_ratio(
    ctx: &WorkerContext,
    job: &Job,
    media: &Media,
    plan: &Plan,
    render: Render,
    keeps: Vec<EdlSegment>,
    srt: Option<String>,
    normalise_audio: bool,
    segment_semaphore: Arc<Semaphore>,
    cancel: watch::Receiver<bool>,
) -> (AspectRatio, Result<Render, WorkerError>) {
    let ratio = render.aspect_ratio;
    let running = render.clone().into_running();
    match ctx
        .registry
        .update_render_if_status(RenderStatus::Queued, &running)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return (
                ratio,
                Err(WorkerError::tagged(
                    ErrorCode::Conflict,
                    "render claimed elsewhere",
                )),
            )
        }
        Err(e) => return (ratio, Err(e.into())),
    }

    let result = render_ratio_inner(
        ctx,
        job,
        media,
        plan,
        ratio,
        &keeps,
        srt.as_deref(),
        normalise_audio,
        segment_semaphore,
        cancel,
    )
    .await;

    match result {
        Ok((output_uri, duration)) => {
            let done = running.into_completed(output_uri, duration);
            match ctx
                .registry
                .update_render_if_status(RenderStatus::Running, &done)
                .await
            {
                Ok(_) => (ratio, Ok(done)),
                Err(e) => (ratio, Err(e.into())),
            }
        }
        Err(WorkerError::Cancelled) | Err(WorkerError::Media(recut_media::MediaError::Cancelled)) => {
            let cancelled = running.into_cancelled();
            let _ = ctx
                .registry
                .update_render_if_status(RenderStatus::Running, &cancelled)
                .await;
            (ratio, Err(WorkerError::Cancelled))
        }
        Err(e) => {
            let failed = running.into_failed(e.to_job_error());
            let _ = ctx
                .registry
                .update_render_if_status(RenderStatus::Running, &failed)
                .await;
            (ratio, Err(e))
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn render_ratio_inner(
    ctx: &WorkerContext,
    job: &Job,
    media: &Media,
    plan: &Plan,
    ratio: AspectRatio,
    keeps: &[EdlSegment],
    srt: Option<&str>,
    normalise_audio: bool,
    segment_semaphore: Arc<Semaphore>,
    cancel: watch::Receiver<bool>,
) -> WorkerResult<(String, f64)> {
    let target = ratio.target_frame(ctx.config.render_reference_width);
    let profile = EncodeProfile::default();
    let has_audio = media.tech.as_ref().map(|t| t.has_audio).unwrap_or(false);
    let keep_total: f64 = keeps.iter().map(EdlSegment::duration).sum();

    let scratch = tempfile::tempdir()?;
    let scratch_dir = scratch.path().to_path_buf();

    // Parallel extraction, ordered collection. The semaphore bounds fan-out
    // across all ratios of this job; the cancel flag is polled before each
    // segment and observed inside ffmpeg runs.
    let parts: Vec<PathBuf> = stream::iter(keeps.iter().enumerate().map(|(i, seg)| {
        let source = media.source_uri.clone();
        let seg = seg.clone();
        let profile = profile.clone();
        let scratch_dir = scratch_dir.clone();
        let semaphore = segment_semaphore.clone();
        let cancel = cancel.clone();
        let deadline = ctx
            .config
            .soft_deadline(recut_models::JobKind::ApplyPlan, media.duration(), Some(keep_total));
        async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::Cancelled)?;
            if *cancel.borrow() {
                return Err(WorkerError::Cancelled);
            }
            let dest = scratch_dir.join(format!("{}-{:04}.mkv", ratio.as_filename_part(), i));

            // Encode errors get one local retry before failing the render.
            let mut attempt = 0;
            loop {
                let result = extract_segment(
                    &source,
                    &seg,
                    target,
                    &profile,
                    has_audio,
                    &dest,
                    Some(cancel.clone()),
                    Some(deadline),
                )
                .await;
                match result {
                    Ok(()) => return Ok(dest),
                    Err(e @ recut_media::MediaError::EncodeFailed { .. }) if attempt == 0 => {
                        attempt += 1;
                        warn!(segment = i, error = %e, "Segment encode failed, retrying once");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }))
    .buffered(ctx.config.render_segment_parallelism.max(1))
    .try_collect()
    .await?;

    if *cancel.borrow() {
        return Err(WorkerError::Cancelled);
    }

    let concatenated = scratch_dir.join(format!("{}-joined.mkv", ratio.as_filename_part()));
    concat_segments(&parts, &concatenated).await?;

    let srt_path = match srt {
        Some(content) => {
            let path = scratch_dir.join("captions.srt");
            tokio::fs::write(&path, content).await?;
            Some(path)
        }
        None => None,
    };

    let final_path = scratch_dir.join(format!("{}.mp4", ratio.as_filename_part()));
    finalize_output(
        &concatenated,
        &final_path,
        srt_path.as_deref(),
        normalise_audio.then_some(ctx.config.render_loudness_target_lufs),
        &profile,
        has_audio,
    )
    .await?;

    // The output duration should equal the summed Keep durations; probe it
    // for the record, falling back to the EDL arithmetic.
    let duration = match recut_media::probe_source(&final_path.to_string_lossy()).await {
        Ok(info) => {
            if (info.duration - keep_total).abs() > 0.05 {
                warn!(
                    expected = keep_total,
                    actual = info.duration,
                    "Output duration drifted from EDL total"
                );
            }
            info.duration
        }
        Err(_) => keep_total,
    };

    let key = layout::render_key(&plan.plan_id, &ratio);
    let output_uri = ctx
        .blobs
        .put_file(&key, &final_path, "video/mp4")
        .await
        .map_err(|e| WorkerError::tagged(ErrorCode::OutputWriteError, e.to_string()))?;

    info!(
        job_id = %job.job_id,
        plan_id = %plan.plan_id,
        ratio = %ratio,
        duration,
        "Render finished"
    );

    Ok((output_uri, duration))
}
