//! Enrichment compression for the planner prompt.
//!
//! Projects potentially thousands of frames, hundreds of scenes and hundreds
//! of transcript segments down to a bounded prompt budget, and emits a short
//! context summary so the model knows what was elided.

use serde::{Deserialize, Serialize};

use recut_models::{FrameDescription, Scene, TranscriptSegment};

/// Compression ceilings.
#[derive(Debug, Clone)]
pub struct CompressorConfig {
    pub max_frames: usize,
    pub max_scenes: usize,
    pub max_segments: usize,
    /// Frames within this window of a key-moment hint are always kept
    pub key_moment_window_s: f64,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            max_frames: 50,
            max_scenes: 20,
            max_segments: 100,
            key_moment_window_s: 0.25,
        }
    }
}

/// What was elided, included verbatim in the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub duration: f64,
    pub total_frames: usize,
    pub total_scenes: usize,
    pub total_segments: usize,
    pub sampled_frames: usize,
    pub sampled_scenes: usize,
    pub sampled_segments: usize,
}

/// Compressed enrichment handed to the prompt builder.
#[derive(Debug, Clone)]
pub struct CompressedContext {
    pub frames: Vec<FrameDescription>,
    pub scenes: Vec<Scene>,
    pub transcript: Vec<TranscriptSegment>,
    pub summary: ContextSummary,
}

/// The compressor. Pure and deterministic for identical inputs.
pub struct Compressor {
    config: CompressorConfig,
}

impl Compressor {
    pub fn new(config: CompressorConfig) -> Self {
        Self { config }
    }

    /// Compress all enrichment sources at once.
    pub fn compress(
        &self,
        frames: &[FrameDescription],
        scenes: &[Scene],
        segments: &[TranscriptSegment],
        duration: f64,
        key_moment_hints: &[f64],
    ) -> CompressedContext {
        let compressed_frames = self.compress_frames(frames, key_moment_hints);
        let compressed_scenes = self.compress_scenes(scenes);
        let compressed_transcript = self.compress_transcript(segments);

        CompressedContext {
            summary: ContextSummary {
                duration,
                total_frames: frames.len(),
                total_scenes: scenes.len(),
                total_segments: segments.len(),
                sampled_frames: compressed_frames.len(),
                sampled_scenes: compressed_scenes.len(),
                sampled_segments: compressed_transcript.len(),
            },
            frames: compressed_frames,
            scenes: compressed_scenes,
            transcript: compressed_transcript,
        }
    }

    /// Uniform subsample across the timeline, pinning frames near key-moment
    /// hints. Ties at the budget boundary keep the longer description.
    fn compress_frames(
        &self,
        frames: &[FrameDescription],
        key_moment_hints: &[f64],
    ) -> Vec<FrameDescription> {
        if frames.len() <= self.config.max_frames {
            return frames.to_vec();
        }

        let mut sorted: Vec<&FrameDescription> = frames.iter().collect();
        sorted.sort_by(|a, b| a.t.total_cmp(&b.t));

        let mut picked_idx: Vec<usize> = Vec::new();

        // Key-moment pins first.
        for (i, f) in sorted.iter().enumerate() {
            if key_moment_hints
                .iter()
                .any(|&hint| (f.t - hint).abs() <= self.config.key_moment_window_s)
            {
                picked_idx.push(i);
            }
        }

        // Uniform coverage of what remains of the budget, always including
        // first and last.
        let budget = self.config.max_frames.saturating_sub(picked_idx.len()).max(2);
        let step = (sorted.len() - 1) as f64 / (budget - 1) as f64;
        for k in 0..budget {
            picked_idx.push((k as f64 * step).round() as usize);
        }

        picked_idx.sort_unstable();
        picked_idx.dedup();

        // Over budget after pinning: drop the shortest descriptions first.
        while picked_idx.len() > self.config.max_frames {
            let drop_pos = picked_idx
                .iter()
                .enumerate()
                .min_by_key(|&(_, &i)| sorted[i].description.len())
                .map(|(pos, _)| pos)
                .unwrap_or(0);
            picked_idx.remove(drop_pos);
        }

        picked_idx.into_iter().map(|i| sorted[i].clone()).collect()
    }

    /// Evenly spaced scenes, keeping the first and last.
    fn compress_scenes(&self, scenes: &[Scene]) -> Vec<Scene> {
        if scenes.len() <= self.config.max_scenes {
            return scenes.to_vec();
        }
        let budget = self.config.max_scenes.max(2);
        let step = (scenes.len() - 1) as f64 / (budget - 1) as f64;
        let mut idx: Vec<usize> = (0..budget).map(|k| (k as f64 * step).round() as usize).collect();
        idx.dedup();
        idx.into_iter().map(|i| scenes[i].clone()).collect()
    }

    /// Highest word-density segments, always including the first and last
    /// to preserve framing.
    fn compress_transcript(&self, segments: &[TranscriptSegment]) -> Vec<TranscriptSegment> {
        if segments.len() <= self.config.max_segments {
            return segments.to_vec();
        }

        let last = segments.len() - 1;
        let mut ranked: Vec<usize> = (1..last).collect();
        ranked.sort_by(|&a, &b| {
            segments[b]
                .speech_density()
                .total_cmp(&segments[a].speech_density())
        });

        let mut picked: Vec<usize> = vec![0, last];
        picked.extend(ranked.into_iter().take(self.config.max_segments - 2));
        picked.sort_unstable();
        picked.dedup();

        picked.into_iter().map(|i| segments[i].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: f64, desc: &str) -> FrameDescription {
        FrameDescription {
            t,
            description: desc.into(),
            confidence: None,
        }
    }

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.into(),
            confidence: None,
            words: Vec::new(),
        }
    }

    fn scene(start: f64, end: f64) -> Scene {
        Scene {
            start,
            end,
            description: None,
        }
    }

    #[test]
    fn test_under_budget_passes_through() {
        let c = Compressor::new(CompressorConfig::default());
        let frames: Vec<_> = (0..10).map(|i| frame(i as f64, "x")).collect();
        let out = c.compress(&frames, &[], &[], 10.0, &[]);
        assert_eq!(out.frames.len(), 10);
        assert_eq!(out.summary.sampled_frames, 10);
        assert_eq!(out.summary.total_frames, 10);
    }

    #[test]
    fn test_frames_capped_and_cover_ends() {
        let c = Compressor::new(CompressorConfig::default());
        let frames: Vec<_> = (0..500).map(|i| frame(i as f64, "desc")).collect();
        let out = c.compress(&frames, &[], &[], 500.0, &[]);
        assert!(out.frames.len() <= 50);
        assert_eq!(out.frames.first().map(|f| f.t), Some(0.0));
        assert_eq!(out.frames.last().map(|f| f.t), Some(499.0));
    }

    #[test]
    fn test_key_moment_frames_pinned() {
        let c = Compressor::new(CompressorConfig::default());
        let frames: Vec<_> = (0..500)
            .map(|i| frame(i as f64, if i == 123 { "the climax moment" } else { "x" }))
            .collect();
        let out = c.compress(&frames, &[], &[], 500.0, &[123.1]);
        assert!(out.frames.iter().any(|f| (f.t - 123.0).abs() < 1e-9));
    }

    #[test]
    fn test_scene_cap_keeps_first_and_last() {
        let c = Compressor::new(CompressorConfig::default());
        let scenes: Vec<_> = (0..100).map(|i| scene(i as f64, i as f64 + 1.0)).collect();
        let out = c.compress(&[], &scenes, &[], 100.0, &[]);
        assert!(out.scenes.len() <= 20);
        assert_eq!(out.scenes.first().map(|s| s.start), Some(0.0));
        assert_eq!(out.scenes.last().map(|s| s.end), Some(100.0));
    }

    #[test]
    fn test_transcript_prefers_density_but_keeps_framing() {
        let c = Compressor::new(CompressorConfig::default());
        let mut segments: Vec<_> = (0..300)
            .map(|i| seg(i as f64, i as f64 + 1.0, "a b"))
            .collect();
        // One very dense segment in the middle.
        segments[150] = seg(150.0, 151.0, "a b c d e f g h i j k l m n o p");
        let out = c.compress(&[], &[], &segments, 300.0, &[]);
        assert!(out.transcript.len() <= 100);
        assert_eq!(out.transcript.first().map(|s| s.start), Some(0.0));
        assert_eq!(out.transcript.last().map(|s| s.end), Some(300.0));
        assert!(out.transcript.iter().any(|s| s.start == 150.0));
    }

    #[test]
    fn test_determinism() {
        let c = Compressor::new(CompressorConfig::default());
        let frames: Vec<_> = (0..500).map(|i| frame(i as f64, "d")).collect();
        let a = c.compress(&frames, &[], &[], 500.0, &[42.0]);
        let b = c.compress(&frames, &[], &[], 500.0, &[42.0]);
        assert_eq!(a.frames, b.frames);
    }
}
