//! Plan generation handlers (heuristic and story).

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use recut_models::{Job, Plan, PlanId, PlanMode, PlanStatus, TokenUsage};
use recut_planner::{
    validate_plan, Compressor, CompressorConfig, RawPlan, StoryModel, StoryRequest, ValidatedPlan,
    ValidatorConfig,
};
use recut_registry::Registry;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::require_ready_media;

/// Input for a heuristic plan: either a stored candidate by index or a
/// free-form window.
#[derive(Debug, Deserialize)]
struct HeuristicInput {
    #[serde(default)]
    candidate_index: Option<usize>,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
}

pub async fn run_heuristic(ctx: &WorkerContext, job: &Job) -> WorkerResult<serde_json::Value> {
    let media = require_ready_media(ctx, job).await?;
    let duration = media.duration().unwrap_or(0.0);
    if duration <= 0.0 {
        return Err(WorkerError::tagged(
            recut_models::ErrorCode::EmptySource,
            "cannot plan against an empty source",
        ));
    }

    let input: HeuristicInput = serde_json::from_value(job.input.clone())
        .map_err(|e| WorkerError::invalid_input(e.to_string()))?;

    let (start, end) = match input {
        HeuristicInput {
            candidate_index: Some(idx),
            ..
        } => {
            let candidates = ctx
                .registry
                .get_candidates(&job.media_id)
                .await?
                .unwrap_or_default();
            let cand = candidates.get(idx).ok_or_else(|| {
                WorkerError::invalid_input(format!("candidate index {} out of range", idx))
            })?;
            (cand.start, cand.end)
        }
        HeuristicInput {
            start: Some(start),
            end: Some(end),
            ..
        } => (start, end),
        _ => {
            return Err(WorkerError::invalid_input(
                "heuristic plan needs a candidate_index or a start/end window",
            ))
        }
    };

    if !(start < end) {
        return Err(WorkerError::invalid_input("window start must precede end"));
    }

    // The window itself defines the coverage target, so validation is a
    // shape check rather than a coverage judgement.
    let raw = RawPlan {
        story_arc: None,
        key_moments: Vec::new(),
        edl: vec![recut_planner::RawSegment {
            start: json!(start),
            end: json!(end),
            kind: Some("keep".into()),
            transition_kind: None,
            transition_duration: None,
            reason: Some("heuristic clip window".into()),
        }],
        transitions: Vec::new(),
        recommendations: Vec::new(),
    };
    let validated = validate_plan(
        &raw,
        &ValidatorConfig {
            duration,
            desired_length_pct: ((end - start) / duration).clamp(0.0, 1.0),
            tolerance_pct: ctx.config.plan_coverage_tolerance_pct / 100.0,
            strict_coverage: false,
        },
    )?;

    let plan = store_plan(ctx, job, &media.media_id, PlanMode::Heuristic, validated, None, None)
        .await?;

    Ok(json!({"plan_id": plan.plan_id, "total_keep": plan.total_keep()}))
}

pub async fn run_story(ctx: &WorkerContext, job: &Job) -> WorkerResult<serde_json::Value> {
    let media = require_ready_media(ctx, job).await?;
    let duration = media.duration().unwrap_or(0.0);
    if duration <= 0.0 {
        return Err(WorkerError::tagged(
            recut_models::ErrorCode::EmptySource,
            "cannot plan against an empty source",
        ));
    }

    let request: StoryRequest = serde_json::from_value(job.input.clone())
        .map_err(|e| WorkerError::invalid_input(e.to_string()))?;

    let transcript = ctx.registry.get_transcript(&job.media_id).await?;
    let scene_index = ctx.registry.get_scene_index(&job.media_id).await?;
    let frame_index = ctx.registry.get_frame_index(&job.media_id).await?;
    let candidates = ctx
        .registry
        .get_candidates(&job.media_id)
        .await?
        .unwrap_or_default();

    let segments = transcript.map(|t| t.segments).unwrap_or_default();
    let scenes = scene_index.map(|s| s.scenes).unwrap_or_default();
    let frames = frame_index.map(|f| f.frames).unwrap_or_default();

    // A plan needs at least one signal source to ground its timestamps.
    if segments.is_empty() && scenes.is_empty() && frames.is_empty() {
        return Err(WorkerError::Planner(
            recut_planner::PlannerError::InsufficientSignal(
                "no transcript, scenes or frames to plan from".into(),
            ),
        ));
    }

    let key_moment_hints: Vec<f64> = candidates
        .iter()
        .filter_map(|c| c.hook_timestamp)
        .collect();

    let compressor = Compressor::new(CompressorConfig {
        max_frames: ctx.config.compress_frame_cap,
        max_scenes: ctx.config.compress_scene_cap,
        max_segments: ctx.config.compress_segment_cap,
        ..CompressorConfig::default()
    });
    let context = compressor.compress(&frames, &scenes, &segments, duration, &key_moment_hints);
    let envelope = recut_planner::prompt::build_envelope(&context, &request, duration);

    // The external model is shared; bound per-process concurrency to it.
    let response = {
        let _permit = ctx
            .model_semaphore
            .acquire()
            .await
            .map_err(|_| WorkerError::Cancelled)?;
        ctx.story_model.generate_plan(&envelope).await?
    };

    let validated = validate_plan(
        &response.plan,
        &ValidatorConfig {
            duration,
            desired_length_pct: request.desired_length_pct,
            tolerance_pct: request.tolerance_pct,
            strict_coverage: request.strict_coverage,
        },
    )?;

    let plan = store_plan(
        ctx,
        job,
        &media.media_id,
        PlanMode::Story,
        validated,
        Some(response.model.clone()),
        Some(response.token_usage),
    )
    .await?;

    Ok(json!({
        "plan_id": plan.plan_id,
        "total_keep": plan.total_keep(),
        "warnings": plan.warnings.len(),
        "token_usage": {
            "prompt_tokens": response.token_usage.prompt_tokens,
            "completion_tokens": response.token_usage.completion_tokens,
        },
    }))
}

async fn store_plan(
    ctx: &WorkerContext,
    job: &Job,
    media_id: &recut_models::MediaId,
    mode: PlanMode,
    validated: ValidatedPlan,
    model: Option<String>,
    token_usage: Option<TokenUsage>,
) -> WorkerResult<Plan> {
    let desired_length_pct = job
        .input
        .get("desired_length_pct")
        .and_then(|v| v.as_f64());

    let now = Utc::now();
    let plan = Plan {
        plan_id: PlanId::new(),
        media_id: media_id.clone(),
        mode,
        status: PlanStatus::Validated,
        story_arc: validated.story_arc,
        edl: validated.edl,
        key_moments: validated.key_moments,
        transitions: validated.transitions,
        recommendations: validated.recommendations,
        warnings: validated.warnings,
        desired_length_pct,
        model,
        token_usage,
        created_at: now,
        updated_at: now,
    };

    ctx.registry.create_plan(&plan).await?;
    info!(
        plan_id = %plan.plan_id,
        media_id = %media_id,
        keep_s = plan.total_keep(),
        warnings = plan.warnings.len(),
        "Plan stored"
    );
    Ok(plan)
}

/// Sanity: the heuristic path yields a single Keep spanning the window.
#[cfg(test)]
mod tests {
    use super::*;
    use recut_models::{EdlSegment, SegmentKind, StoryArc};

    #[test]
    fn test_heuristic_window_shapes_edl() {
        let raw = RawPlan {
            story_arc: Some(recut_planner::llm::RawStoryArc {
                hook_t: 1.0,
                climax_t: 2.0,
                resolution_t: 3.0,
            }),
            key_moments: Vec::new(),
            edl: vec![recut_planner::RawSegment {
                start: json!(10.0),
                end: json!(40.0),
                kind: Some("keep".into()),
                transition_kind: None,
                transition_duration: None,
                reason: None,
            }],
            transitions: Vec::new(),
            recommendations: Vec::new(),
        };
        let validated = validate_plan(
            &raw,
            &ValidatorConfig {
                duration: 100.0,
                desired_length_pct: 0.3,
                tolerance_pct: 0.1,
                strict_coverage: false,
            },
        )
        .unwrap();
        assert_eq!(validated.edl.len(), 1);
        assert_eq!(validated.edl[0].kind, SegmentKind::Keep);
        assert!((validated.total_keep() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_shape() {
        let arc = StoryArc {
            hook_t: 0.5,
            climax_t: 20.0,
            resolution_t: 29.0,
        };
        assert!(arc.is_ordered());
    }

    #[test]
    fn test_edl_segment_helper() {
        let seg = EdlSegment::keep(0.0, 5.0);
        assert_eq!(seg.kind, SegmentKind::Keep);
        assert!((seg.duration() - 5.0).abs() < 1e-9);
    }
}
