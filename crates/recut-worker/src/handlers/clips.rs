//! Clip candidate selection handler.

use serde_json::json;
use tracing::info;

use recut_models::Job;
use recut_planner::{generate_candidates, SelectorConfig};
use recut_registry::Registry;

use crate::context::WorkerContext;
use crate::error::WorkerResult;
use crate::handlers::require_ready_media;

pub async fn run(ctx: &WorkerContext, job: &Job) -> WorkerResult<serde_json::Value> {
    if let Some(existing) = ctx.registry.get_candidates(&job.media_id).await? {
        return Ok(json!({"already_selected": true, "candidates": existing.len()}));
    }

    let media = require_ready_media(ctx, job).await?;
    let duration = media.duration().unwrap_or(0.0);

    let transcript = ctx.registry.get_transcript(&job.media_id).await?;
    let silence = ctx.registry.get_silence_map(&job.media_id).await?;
    let cuts = ctx.registry.get_scene_cuts(&job.media_id).await?;

    let config = SelectorConfig {
        min_clip_s: ctx.config.clip_min_s,
        max_clip_s: ctx.config.clip_max_s,
        max_candidates: ctx.config.clip_n,
        ..SelectorConfig::default()
    };

    let candidates = generate_candidates(
        &media.media_id,
        transcript.as_ref(),
        silence.as_ref(),
        cuts.as_ref(),
        duration,
        &config,
    );

    ctx.registry
        .put_candidates(&media.media_id, &candidates)
        .await?;
    info!(
        media_id = %media.media_id,
        candidates = candidates.len(),
        "Clip candidates stored"
    );

    Ok(json!({"candidates": candidates.len()}))
}
