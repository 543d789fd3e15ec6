//! Scene-cut detection handler.

use serde_json::json;
use tracing::info;

use recut_media::scenes::detect_scene_cuts;
use recut_models::{Job, SceneCuts};
use recut_registry::Registry;

use crate::context::WorkerContext;
use crate::error::WorkerResult;
use crate::handlers::require_ready_media;

pub async fn run(ctx: &WorkerContext, job: &Job) -> WorkerResult<serde_json::Value> {
    if let Some(existing) = ctx.registry.get_scene_cuts(&job.media_id).await? {
        return Ok(json!({"already_detected": true, "cuts": existing.cuts.len()}));
    }

    let media = require_ready_media(ctx, job).await?;
    let duration = media.duration().unwrap_or(0.0);

    let cuts = if duration <= 0.0 {
        SceneCuts::empty(media.media_id.clone())
    } else {
        let cuts =
            detect_scene_cuts(&media.source_uri, ctx.config.scene_threshold, duration).await?;
        SceneCuts {
            media_id: media.media_id.clone(),
            cuts,
        }
    };

    ctx.registry.put_scene_cuts(&cuts).await?;
    info!(media_id = %media.media_id, cuts = cuts.cuts.len(), "Scene cuts stored");

    Ok(json!({"cuts": cuts.cuts.len()}))
}
