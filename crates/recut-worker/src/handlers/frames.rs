//! Frame description handler.
//!
//! Samples frames at the configured interval, asks the vision service for a
//! short description of each, and stores the sampled JPEGs alongside. Runs
//! in batches with a cancellation poll between them.

use serde_json::json;
use tokio::sync::watch;
use tracing::{info, warn};

use recut_media::frames::{extract_frame, sample_timestamps};
use recut_models::{FrameDescription, FrameIndex, Job};
use recut_registry::Registry;
use recut_storage::{layout, BlobStore};

use crate::capabilities::FrameDescriber;
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::require_ready_media;

const BATCH_SIZE: usize = 8;

pub async fn run(
    ctx: &WorkerContext,
    job: &Job,
    cancel: watch::Receiver<bool>,
) -> WorkerResult<serde_json::Value> {
    if let Some(existing) = ctx.registry.get_frame_index(&job.media_id).await? {
        return Ok(json!({"already_described": true, "frames": existing.frames.len()}));
    }

    let describer = match &ctx.describer {
        Some(d) => d.clone(),
        None => {
            // Optional enrichment: no vision service configured means an
            // empty index, not a failure.
            warn!(media_id = %job.media_id, "No vision service configured, storing empty frame index");
            let index = FrameIndex {
                media_id: job.media_id.clone(),
                interval_s: ctx.config.frame_sample_s,
                frames: Vec::new(),
            };
            ctx.registry.put_frame_index(&index).await?;
            return Ok(json!({"frames": 0, "skipped": true}));
        }
    };

    let media = require_ready_media(ctx, job).await?;
    let duration = media.duration().unwrap_or(0.0);
    let timestamps = sample_timestamps(duration, ctx.config.frame_sample_s);

    let scratch = tempfile::tempdir()?;
    let mut frames = Vec::with_capacity(timestamps.len());

    for batch in timestamps.chunks(BATCH_SIZE) {
        if *cancel.borrow() {
            return Err(WorkerError::Cancelled);
        }

        for &t in batch {
            let image_path = scratch.path().join(format!("{:.3}.jpg", t));
            extract_frame(&media.source_uri, t, &image_path).await?;

            let _permit = ctx
                .model_semaphore
                .acquire()
                .await
                .map_err(|_| WorkerError::Cancelled)?;
            let description = describer.describe(&image_path).await?;

            ctx.blobs
                .put_file(
                    &layout::frame_key(&media.media_id, t),
                    &image_path,
                    "image/jpeg",
                )
                .await?;

            frames.push(FrameDescription {
                t,
                description,
                confidence: None,
            });
        }
    }

    let index = FrameIndex {
        media_id: media.media_id.clone(),
        interval_s: ctx.config.frame_sample_s,
        frames,
    };
    ctx.registry.put_frame_index(&index).await?;
    info!(media_id = %media.media_id, frames = index.frames.len(), "Frame index stored");

    Ok(json!({"frames": index.frames.len()}))
}
