//! Transcribe handler.

use serde_json::json;
use tracing::info;

use recut_models::{Job, Transcript};
use recut_registry::Registry;

use crate::capabilities::Transcriber;
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::{ensure_analysis_audio, require_ready_media};

pub async fn run(ctx: &WorkerContext, job: &Job) -> WorkerResult<serde_json::Value> {
    // Idempotency: one transcript per media.
    if let Some(existing) = ctx.registry.get_transcript(&job.media_id).await? {
        return Ok(json!({"already_transcribed": true, "segments": existing.segments.len()}));
    }

    let media = require_ready_media(ctx, job).await?;
    let duration = media.duration().unwrap_or(0.0);

    // Silent or empty sources complete with an empty transcript, never fail.
    let audio_path = match ensure_analysis_audio(ctx, &media).await? {
        Some(path) => path,
        None => {
            let transcript = Transcript::empty(media.media_id.clone());
            ctx.registry.put_transcript(&transcript).await?;
            return Ok(json!({"segments": 0, "silent": true}));
        }
    };

    let payload = ctx.transcriber.transcribe(&audio_path).await?;

    let transcript = Transcript {
        media_id: media.media_id.clone(),
        language: payload.language,
        segments: payload.segments,
    };

    // Enforce the transcript invariants before anything is persisted; a bad
    // service response must not leave a partial transcript visible.
    transcript
        .validate(duration)
        .map_err(|e| WorkerError::TranscriberFailed(format!("invariant violation: {}", e)))?;

    ctx.registry.put_transcript(&transcript).await?;
    info!(
        media_id = %media.media_id,
        segments = transcript.segments.len(),
        "Transcript stored"
    );

    Ok(json!({
        "segments": transcript.segments.len(),
        "words": transcript.word_count(),
        "language": transcript.language,
    }))
}
