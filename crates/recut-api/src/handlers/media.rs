//! Media registration and enrichment endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use recut_models::{Job, JobId, JobKind, Media, MediaId};
use recut_registry::Registry;

use crate::error::{ApiError, ApiResult};
use crate::handlers::enqueue_job;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterMediaRequest {
    pub source_uri: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterMediaResponse {
    pub media_id: MediaId,
    pub status: String,
    pub probe_job_id: JobId,
}

/// POST /media — register a source and enqueue its probe.
pub async fn register_media(
    State(state): State<AppState>,
    Json(body): Json<RegisterMediaRequest>,
) -> ApiResult<Json<RegisterMediaResponse>> {
    let source_uri = body.source_uri.trim().to_string();
    if source_uri.is_empty() {
        return Err(ApiError::bad_request("source_uri must not be empty"));
    }

    let mut media = Media::register(source_uri);
    if let Some(title) = body.title {
        media = media.with_title(title);
    }
    if let Some(description) = body.description {
        media = media.with_description(description);
    }

    state.registry.create_media(&media).await?;

    let probe_job_id = enqueue_job(&state, media.media_id.clone(), JobKind::Probe, json!({}))
        .await?
        .ok_or_else(|| ApiError::internal("probe enqueue collapsed unexpectedly"))?;

    info!(media_id = %media.media_id, "Registered media");
    Ok(Json(RegisterMediaResponse {
        media_id: media.media_id,
        status: media.status.as_str().to_string(),
        probe_job_id,
    }))
}

/// GET /media/:id — media with embedded enrichment availability.
pub async fn get_media(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = MediaId::from_string(media_id);
    let media = load_media(&state, &id).await?;

    let transcript = state.registry.get_transcript(&id).await?.is_some();
    let silence = state.registry.get_silence_map(&id).await?.is_some();
    let cuts = state.registry.get_scene_cuts(&id).await?.is_some();
    let scenes = state.registry.get_scene_index(&id).await?.is_some();
    let frames = state.registry.get_frame_index(&id).await?.is_some();
    let candidates = state.registry.get_candidates(&id).await?.is_some();

    Ok(Json(json!({
        "media": media,
        "enrichment": {
            "transcript": transcript,
            "silence_map": silence,
            "scene_cuts": cuts,
            "scenes": scenes,
            "frames": frames,
            "candidates": candidates,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct EnrichRequest {
    pub kinds: Vec<JobKind>,
}

/// POST /media/:id/enrich — enqueue requested enrichment kinds whose output
/// does not already exist.
pub async fn enrich_media(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
    Json(body): Json<EnrichRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = MediaId::from_string(media_id);
    let media = load_media(&state, &id).await?;
    if media.status == recut_models::MediaStatus::Failed {
        return Err(ApiError::bad_request("media failed probing"));
    }

    let mut enqueued: Vec<serde_json::Value> = Vec::new();
    for kind in body.kinds {
        if !JobKind::ENRICHMENT.contains(&kind) {
            return Err(ApiError::bad_request(format!(
                "{} is not an enrichment kind",
                kind
            )));
        }
        if enrichment_done(&state, &id, kind).await? {
            continue;
        }
        if let Some(job_id) = enqueue_job(&state, id.clone(), kind, json!({})).await? {
            enqueued.push(json!({"kind": kind, "job_id": job_id}));
        }
    }

    Ok(Json(json!({"enqueued": enqueued})))
}

/// GET /media/:id/transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
) -> ApiResult<Json<recut_models::Transcript>> {
    let id = MediaId::from_string(media_id);
    load_media(&state, &id).await?;
    let transcript = state
        .registry
        .get_transcript(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("transcript not available"))?;
    Ok(Json(transcript))
}

/// GET /media/:id/scenes
pub async fn get_scenes(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
) -> ApiResult<Json<recut_models::SceneIndex>> {
    let id = MediaId::from_string(media_id);
    load_media(&state, &id).await?;
    let scenes = state
        .registry
        .get_scene_index(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("scenes not available"))?;
    Ok(Json(scenes))
}

/// GET /media/:id/candidates — possibly empty.
pub async fn get_candidates(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
) -> ApiResult<Json<Vec<recut_models::ClipCandidate>>> {
    let id = MediaId::from_string(media_id);
    load_media(&state, &id).await?;
    let candidates = state.registry.get_candidates(&id).await?.unwrap_or_default();
    Ok(Json(candidates))
}

/// GET /jobs/:id — job status for polling.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state
        .registry
        .get_job(&JobId::from_string(job_id))
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;
    Ok(Json(job))
}

/// POST /jobs/:id/cancel — cancel a queued job. Running jobs wind down via
/// their soft deadline; terminal jobs are immutable.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let job = state
        .registry
        .get_job(&JobId::from_string(job_id))
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    match job.status {
        recut_models::JobStatus::Queued => {
            let cancelled = job.clone().into_cancelled();
            let applied = state
                .registry
                .update_job_if_status(recut_models::JobStatus::Queued, &cancelled)
                .await?;
            if applied {
                Ok(Json(json!({"status": cancelled.status.as_str()})))
            } else {
                Err(ApiError::Conflict("job was claimed concurrently".into()))
            }
        }
        recut_models::JobStatus::Running => Err(ApiError::Conflict(
            "job is running; it can only be cancelled at its deadline".into(),
        )),
        other => Err(ApiError::bad_request(format!(
            "job already terminal ({})",
            other.as_str()
        ))),
    }
}

/// DELETE /media/:id — logical delete.
pub async fn delete_media(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = MediaId::from_string(media_id);
    load_media(&state, &id).await?;
    let deleted = state.registry.soft_delete_media(&id).await?;
    Ok(Json(json!({"deleted": deleted})))
}

pub(crate) async fn load_media(state: &AppState, id: &MediaId) -> ApiResult<Media> {
    let media = state
        .registry
        .get_media(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("media {} not found", id)))?;
    if media.status == recut_models::MediaStatus::Deleted {
        return Err(ApiError::not_found(format!("media {} deleted", id)));
    }
    Ok(media)
}

async fn enrichment_done(state: &AppState, id: &MediaId, kind: JobKind) -> ApiResult<bool> {
    Ok(match kind {
        JobKind::Transcribe => state.registry.get_transcript(id).await?.is_some(),
        JobKind::DetectSilence => state.registry.get_silence_map(id).await?.is_some(),
        JobKind::DetectScenes => state.registry.get_scene_cuts(id).await?.is_some(),
        JobKind::DescribeFrames => state.registry.get_frame_index(id).await?.is_some(),
        JobKind::IndexScenes => state.registry.get_scene_index(id).await?.is_some(),
        JobKind::SelectClips => state.registry.get_candidates(id).await?.is_some(),
        _ => false,
    })
}
