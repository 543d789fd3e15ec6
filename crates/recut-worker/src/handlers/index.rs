//! Scene indexer: merge cuts and described frames into labelled scenes.

use serde_json::json;
use tracing::info;

use recut_models::{FrameIndex, Job, Scene, SceneCuts, SceneIndex};
use recut_registry::Registry;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::require_ready_media;

pub async fn run(ctx: &WorkerContext, job: &Job) -> WorkerResult<serde_json::Value> {
    if let Some(existing) = ctx.registry.get_scene_index(&job.media_id).await? {
        return Ok(json!({"already_indexed": true, "scenes": existing.scenes.len()}));
    }

    let media = require_ready_media(ctx, job).await?;
    let duration = media.duration().unwrap_or(0.0);

    let cuts = ctx
        .registry
        .get_scene_cuts(&job.media_id)
        .await?
        .ok_or_else(|| WorkerError::invalid_input("scene cuts missing"))?;
    let frames = ctx
        .registry
        .get_frame_index(&job.media_id)
        .await?
        .ok_or_else(|| WorkerError::invalid_input("frame index missing"))?;

    let index = build_scene_index(&cuts, &frames, duration);
    ctx.registry.put_scene_index(&index).await?;
    info!(media_id = %media.media_id, scenes = index.scenes.len(), "Scene index stored");

    Ok(json!({"scenes": index.scenes.len()}))
}

/// Pure merge of cuts and frame descriptions into covering scenes.
///
/// Boundaries are `0, cut_1, ..., cut_n, duration`; each scene is tagged
/// with the concatenated descriptions of the frames falling inside it.
pub fn build_scene_index(cuts: &SceneCuts, frames: &FrameIndex, duration: f64) -> SceneIndex {
    let mut scenes = Vec::new();
    if duration > 0.0 {
        let mut boundaries = vec![0.0];
        boundaries.extend(cuts.cuts.iter().copied().filter(|&c| c > 0.0 && c < duration));
        boundaries.push(duration);

        for pair in boundaries.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let descriptions: Vec<&str> = frames
                .frames
                .iter()
                .filter(|f| f.t >= start && f.t < end)
                .map(|f| f.description.as_str())
                .filter(|d| !d.is_empty())
                .collect();
            scenes.push(Scene {
                start,
                end,
                description: if descriptions.is_empty() {
                    None
                } else {
                    Some(descriptions.join(" / "))
                },
            });
        }
    }

    SceneIndex {
        media_id: cuts.media_id.clone(),
        scenes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_models::{FrameDescription, MediaId};

    fn frame(t: f64, description: &str) -> FrameDescription {
        FrameDescription {
            t,
            description: description.into(),
            confidence: None,
        }
    }

    #[test]
    fn test_no_cuts_is_one_scene() {
        let media = MediaId::new();
        let cuts = SceneCuts::empty(media.clone());
        let frames = FrameIndex {
            media_id: media,
            interval_s: 1.0,
            frames: vec![frame(1.0, "a desk"), frame(2.0, "a window")],
        };
        let index = build_scene_index(&cuts, &frames, 10.0);
        assert_eq!(index.scenes.len(), 1);
        assert!(index.covers_timeline(10.0));
        assert_eq!(index.scenes[0].description.as_deref(), Some("a desk / a window"));
    }

    #[test]
    fn test_cuts_partition_the_timeline() {
        let media = MediaId::new();
        let cuts = SceneCuts {
            media_id: media.clone(),
            cuts: vec![3.0, 7.0],
        };
        let frames = FrameIndex {
            media_id: media,
            interval_s: 1.0,
            frames: vec![frame(1.0, "intro"), frame(5.0, "middle"), frame(8.0, "outro")],
        };
        let index = build_scene_index(&cuts, &frames, 10.0);
        assert_eq!(index.scenes.len(), 3);
        assert!(index.covers_timeline(10.0));
        assert_eq!(index.scenes[0].description.as_deref(), Some("intro"));
        assert_eq!(index.scenes[1].description.as_deref(), Some("middle"));
        assert_eq!(index.scenes[2].description.as_deref(), Some("outro"));
    }

    #[test]
    fn test_frame_on_boundary_belongs_to_the_later_scene() {
        let media = MediaId::new();
        let cuts = SceneCuts {
            media_id: media.clone(),
            cuts: vec![5.0],
        };
        let frames = FrameIndex {
            media_id: media,
            interval_s: 1.0,
            frames: vec![frame(5.0, "on the cut")],
        };
        let index = build_scene_index(&cuts, &frames, 10.0);
        assert_eq!(index.scenes[0].description, None);
        assert_eq!(index.scenes[1].description.as_deref(), Some("on the cut"));
    }

    #[test]
    fn test_empty_source_has_no_scenes() {
        let media = MediaId::new();
        let cuts = SceneCuts::empty(media.clone());
        let frames = FrameIndex {
            media_id: media,
            interval_s: 1.0,
            frames: Vec::new(),
        };
        let index = build_scene_index(&cuts, &frames, 0.0);
        assert!(index.scenes.is_empty());
        assert!(index.covers_timeline(0.0));
    }

    #[test]
    fn test_out_of_range_cuts_ignored() {
        let media = MediaId::new();
        let cuts = SceneCuts {
            media_id: media.clone(),
            cuts: vec![5.0, 15.0], // 15 is past the end
        };
        let frames = FrameIndex {
            media_id: media,
            interval_s: 1.0,
            frames: Vec::new(),
        };
        let index = build_scene_index(&cuts, &frames, 10.0);
        assert_eq!(index.scenes.len(), 2);
        assert!(index.covers_timeline(10.0));
    }
}
