//! Silence-detection handler.

use serde_json::json;
use tracing::info;

use recut_media::audio::{load_pcm_samples, ANALYSIS_SAMPLE_RATE};
use recut_media::silence::{scan_silence, SilenceConfig};
use recut_models::{Job, SilenceMap};
use recut_registry::Registry;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::{ensure_analysis_audio, require_ready_media};

pub async fn run(ctx: &WorkerContext, job: &Job) -> WorkerResult<serde_json::Value> {
    if let Some(existing) = ctx.registry.get_silence_map(&job.media_id).await? {
        return Ok(json!({"already_detected": true, "intervals": existing.intervals.len()}));
    }

    let media = require_ready_media(ctx, job).await?;
    let duration = media.duration().unwrap_or(0.0);
    let min_silence = ctx.config.min_silence_s;

    // No audio track: the whole timeline counts as silent.
    let map = match ensure_analysis_audio(ctx, &media).await? {
        None => SilenceMap::full_span(media.media_id.clone(), min_silence, duration),
        Some(audio_path) => {
            let samples = load_pcm_samples(&audio_path).await?;
            let config = SilenceConfig {
                min_silence_s: min_silence,
                ..SilenceConfig::default()
            };
            let intervals = scan_silence(&samples, ANALYSIS_SAMPLE_RATE, &config);
            SilenceMap {
                media_id: media.media_id.clone(),
                min_silence_s: min_silence,
                intervals,
            }
        }
    };

    if !map.is_valid() {
        return Err(WorkerError::tagged(
            recut_models::ErrorCode::Internal,
            "silence scan produced an invalid map",
        ));
    }

    ctx.registry.put_silence_map(&map).await?;
    info!(
        media_id = %media.media_id,
        intervals = map.intervals.len(),
        "Silence map stored"
    );

    Ok(json!({"intervals": map.intervals.len()}))
}
