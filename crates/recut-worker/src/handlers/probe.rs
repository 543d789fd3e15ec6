//! Probe handler: fill in technical metadata for a registered media.

use serde_json::json;
use tracing::info;

use recut_media::probe_source;
use recut_models::{Job, MediaStatus, TechMetadata};
use recut_registry::Registry;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};

pub async fn run(ctx: &WorkerContext, job: &Job) -> WorkerResult<serde_json::Value> {
    let media = ctx
        .registry
        .get_media(&job.media_id)
        .await?
        .ok_or_else(|| WorkerError::invalid_input(format!("media {} not found", job.media_id)))?;

    // Idempotency: a ready media is already probed.
    if media.is_ready() {
        return Ok(json!({"already_probed": true}));
    }

    // Claim the probe transition; losing the race means another attempt is
    // (or was) at work.
    let probing = {
        let mut m = media.clone();
        m.status = MediaStatus::Probing;
        m.updated_at = chrono::Utc::now();
        m
    };
    if !ctx
        .registry
        .update_media_if_status(MediaStatus::Registered, &probing)
        .await?
    {
        let current = ctx.registry.get_media(&job.media_id).await?;
        if current.as_ref().map(|m| m.is_ready()).unwrap_or(false) {
            return Ok(json!({"already_probed": true}));
        }
        if current.as_ref().map(|m| m.status) != Some(MediaStatus::Probing) {
            return Err(WorkerError::invalid_input(format!(
                "media {} in unexpected state for probing",
                job.media_id
            )));
        }
    }

    match probe_source(&media.source_uri).await {
        Ok(info) => {
            let tech = TechMetadata {
                duration: info.duration,
                fps: info.fps,
                width: info.width,
                height: info.height,
                has_audio: info.has_audio,
                video_codec: info.video_codec,
                audio_codec: info.audio_codec,
                bitrate: info.bitrate,
            };
            let ready = probing.clone().into_ready(tech.clone());
            ctx.registry
                .update_media_if_status(MediaStatus::Probing, &ready)
                .await?;
            info!(media_id = %job.media_id, duration = tech.duration, "Media probed");
            Ok(serde_json::to_value(&tech)?)
        }
        Err(e) => {
            let failed = probing.clone().into_failed(e.to_string());
            ctx.registry
                .update_media_if_status(MediaStatus::Probing, &failed)
                .await?;
            Err(e.into())
        }
    }
}
