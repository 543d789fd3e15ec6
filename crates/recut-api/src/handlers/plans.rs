//! Plan generation endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use recut_models::{ErrorCode, JobId, JobKind, MediaId, Plan, PlanId};
use recut_registry::Registry;

use crate::error::{ApiError, ApiResult};
use crate::handlers::enqueue_job;
use crate::handlers::media::load_media;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HeuristicPlanRequest {
    #[serde(default)]
    pub candidate_index: Option<usize>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

/// POST /media/:id/plans/heuristic
pub async fn create_heuristic_plan(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
    Json(body): Json<HeuristicPlanRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = MediaId::from_string(media_id);
    let media = load_media(&state, &id).await?;
    if !media.has_content() {
        return Err(ApiError::coded(
            ErrorCode::EmptySource,
            "media has no content to plan against",
        ));
    }

    let window_given = body.start.is_some() && body.end.is_some();
    if body.candidate_index.is_none() && !window_given {
        return Err(ApiError::bad_request(
            "provide candidate_index or a start/end window",
        ));
    }
    if let (Some(start), Some(end)) = (body.start, body.end) {
        if !(start < end) {
            return Err(ApiError::bad_request("start must precede end"));
        }
    }

    let input = json!({
        "candidate_index": body.candidate_index,
        "start": body.start,
        "end": body.end,
    });
    let plan_job_id = enqueue_job(&state, id, JobKind::PlanHeuristic, input)
        .await?
        .ok_or_else(|| ApiError::internal("plan enqueue collapsed unexpectedly"))?;

    Ok(Json(json!({"plan_job_id": plan_job_id})))
}

#[derive(Debug, Deserialize)]
pub struct StoryPlanRequest {
    pub story_prompt: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub key_message: Option<String>,
    #[serde(default)]
    pub style_preferences: Vec<String>,
    pub desired_length_pct: f64,
    #[serde(default)]
    pub tolerance_pct: Option<f64>,
    #[serde(default)]
    pub strict_coverage: bool,
}

/// POST /media/:id/plans/story — runs compression, prompting, the external
/// model and validation asynchronously.
pub async fn create_story_plan(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
    Json(body): Json<StoryPlanRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = MediaId::from_string(media_id);
    let media = load_media(&state, &id).await?;
    if !media.has_content() {
        return Err(ApiError::coded(
            ErrorCode::EmptySource,
            "media has no content to plan against",
        ));
    }

    if body.story_prompt.trim().is_empty() {
        return Err(ApiError::bad_request("story_prompt must not be empty"));
    }
    if !(body.desired_length_pct > 0.0 && body.desired_length_pct <= 1.0) {
        return Err(ApiError::bad_request(
            "desired_length_pct must be in (0, 1]",
        ));
    }

    let tolerance_pct = body
        .tolerance_pct
        .unwrap_or(state.pipeline_config.plan_coverage_tolerance_pct / 100.0);

    let input = json!({
        "story_prompt": body.story_prompt,
        "summary": body.summary,
        "target_audience": body.target_audience,
        "tone": body.tone,
        "key_message": body.key_message,
        "style_preferences": body.style_preferences,
        "desired_length_pct": body.desired_length_pct,
        "tolerance_pct": tolerance_pct,
        "strict_coverage": body.strict_coverage,
    });
    let plan_job_id = enqueue_job(&state, id, JobKind::PlanStory, input)
        .await?
        .ok_or_else(|| ApiError::internal("plan enqueue collapsed unexpectedly"))?;

    Ok(Json(json!({"plan_job_id": plan_job_id})))
}

/// GET /plans/:plan_id — validated plan with warnings and advisory payloads.
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> ApiResult<Json<Plan>> {
    let plan = state
        .registry
        .get_plan(&PlanId::from_string(plan_id))
        .await?
        .ok_or_else(|| ApiError::not_found("plan not found"))?;
    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
pub struct RenderPlanRequest {
    pub aspect_ratios: Vec<String>,
    #[serde(default)]
    pub captions: bool,
    #[serde(default)]
    pub normalise_audio: bool,
}

/// POST /plans/:plan_id/render — enqueue per-ratio renders via one
/// ApplyPlan job.
pub async fn render_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    Json(body): Json<RenderPlanRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let plan_id = PlanId::from_string(plan_id);
    let plan = state
        .registry
        .get_plan(&plan_id)
        .await?
        .ok_or_else(|| ApiError::not_found("plan not found"))?;

    if matches!(
        plan.status,
        recut_models::PlanStatus::Draft | recut_models::PlanStatus::Rejected
    ) {
        return Err(ApiError::bad_request(format!(
            "plan is not renderable (status {})",
            plan.status.as_str()
        )));
    }

    if body.aspect_ratios.is_empty() {
        return Err(ApiError::bad_request("aspect_ratios must not be empty"));
    }
    let mut ratios: Vec<recut_models::AspectRatio> = Vec::new();
    for raw in &body.aspect_ratios {
        let ratio: recut_models::AspectRatio = raw
            .parse()
            .map_err(|e| ApiError::bad_request(format!("{}", e)))?;
        if !ratios.contains(&ratio) {
            ratios.push(ratio);
        }
    }

    let input = json!({
        "plan_id": plan_id,
        "aspect_ratios": ratios,
        "captions": body.captions,
        "normalise_audio": body.normalise_audio,
    });
    let apply_job_id: JobId = enqueue_job(&state, plan.media_id.clone(), JobKind::ApplyPlan, input)
        .await?
        .ok_or_else(|| ApiError::internal("apply enqueue collapsed unexpectedly"))?;

    Ok(Json(json!({"apply_job_id": apply_job_id})))
}
