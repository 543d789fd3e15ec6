//! Enrichment outputs: silence map, scene cuts, frame descriptions, scenes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::media::MediaId;

/// A half-open `[start, end)` interval on the source timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Length of the overlap with another interval, zero when disjoint.
    pub fn overlap(&self, other: &Interval) -> f64 {
        (self.end.min(other.end) - self.start.max(other.start)).max(0.0)
    }
}

/// Silence intervals of one media, pairwise disjoint and sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SilenceMap {
    pub media_id: MediaId,
    /// Minimum silence length this map was computed with, in seconds
    pub min_silence_s: f64,
    #[serde(default)]
    pub intervals: Vec<Interval>,
}

impl SilenceMap {
    /// An empty map (no audio analysed or no silence found).
    pub fn empty(media_id: MediaId, min_silence_s: f64) -> Self {
        Self {
            media_id,
            min_silence_s,
            intervals: Vec::new(),
        }
    }

    /// A single interval spanning the whole timeline, used when the source
    /// has no audio track.
    pub fn full_span(media_id: MediaId, min_silence_s: f64, duration: f64) -> Self {
        let intervals = if duration > 0.0 {
            vec![Interval::new(0.0, duration)]
        } else {
            Vec::new()
        };
        Self {
            media_id,
            min_silence_s,
            intervals,
        }
    }

    /// Check disjointness, ordering and the minimum-length invariant.
    pub fn is_valid(&self) -> bool {
        let mut prev_end = f64::NEG_INFINITY;
        for iv in &self.intervals {
            if iv.start < prev_end || iv.duration() + 1e-9 < self.min_silence_s {
                return false;
            }
            prev_end = iv.end;
        }
        true
    }

    /// Total silence overlapping `[start, end)`.
    pub fn silence_within(&self, start: f64, end: f64) -> f64 {
        let window = Interval::new(start, end);
        self.intervals.iter().map(|iv| iv.overlap(&window)).sum()
    }
}

/// Scene-cut timestamps, strictly increasing, strictly inside `(0, duration)`.
/// An empty list means one scene covering the whole timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneCuts {
    pub media_id: MediaId,
    #[serde(default)]
    pub cuts: Vec<f64>,
}

impl SceneCuts {
    pub fn empty(media_id: MediaId) -> Self {
        Self {
            media_id,
            cuts: Vec::new(),
        }
    }

    pub fn is_valid(&self, duration: f64) -> bool {
        let mut prev = 0.0_f64;
        for &c in &self.cuts {
            if c <= prev || c >= duration {
                return false;
            }
            prev = c;
        }
        true
    }

    /// Whether any cut lies within `window` seconds of `t`.
    pub fn has_cut_near(&self, t: f64, window: f64) -> bool {
        self.cuts.iter().any(|&c| (c - t).abs() <= window)
    }
}

/// Natural-language description of one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameDescription {
    /// Timestamp of the sampled frame, unique per media
    pub t: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// All described frames of one media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameIndex {
    pub media_id: MediaId,
    /// Sampling interval the frames were taken at, in seconds
    pub interval_s: f64,
    #[serde(default)]
    pub frames: Vec<FrameDescription>,
}

/// One labelled scene, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Scene {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Derived scene intervals covering the timeline with no gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneIndex {
    pub media_id: MediaId,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

impl SceneIndex {
    /// Check that scenes are adjacent and cover `[0, duration)`.
    pub fn covers_timeline(&self, duration: f64) -> bool {
        if duration <= 0.0 {
            return self.scenes.is_empty();
        }
        let mut expected = 0.0_f64;
        for s in &self.scenes {
            if (s.start - expected).abs() > 1e-6 || s.end <= s.start {
                return false;
            }
            expected = s.end;
        }
        (expected - duration).abs() < 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_map_invariants() {
        let media = MediaId::new();
        let good = SilenceMap {
            media_id: media.clone(),
            min_silence_s: 0.6,
            intervals: vec![Interval::new(1.0, 2.0), Interval::new(2.0, 3.5)],
        };
        assert!(good.is_valid());

        let overlapping = SilenceMap {
            media_id: media.clone(),
            min_silence_s: 0.6,
            intervals: vec![Interval::new(1.0, 2.5), Interval::new(2.0, 3.5)],
        };
        assert!(!overlapping.is_valid());

        let too_short = SilenceMap {
            media_id: media,
            min_silence_s: 0.6,
            intervals: vec![Interval::new(1.0, 1.2)],
        };
        assert!(!too_short.is_valid());
    }

    #[test]
    fn test_silence_within() {
        let map = SilenceMap {
            media_id: MediaId::new(),
            min_silence_s: 0.6,
            intervals: vec![Interval::new(5.0, 8.0), Interval::new(20.0, 21.0)],
        };
        assert!((map.silence_within(6.0, 22.0) - 3.0).abs() < 1e-9);
        assert_eq!(map.silence_within(0.0, 4.0), 0.0);
    }

    #[test]
    fn test_full_span_for_empty_source() {
        let map = SilenceMap::full_span(MediaId::new(), 0.6, 0.0);
        assert!(map.intervals.is_empty());
        let map = SilenceMap::full_span(MediaId::new(), 0.6, 30.0);
        assert_eq!(map.intervals, vec![Interval::new(0.0, 30.0)]);
    }

    #[test]
    fn test_scene_cuts_bounds() {
        let media = MediaId::new();
        let cuts = SceneCuts {
            media_id: media.clone(),
            cuts: vec![3.0, 7.5, 12.0],
        };
        assert!(cuts.is_valid(20.0));
        assert!(!cuts.is_valid(12.0)); // cut at duration is out of range

        let unsorted = SceneCuts {
            media_id: media,
            cuts: vec![7.5, 3.0],
        };
        assert!(!unsorted.is_valid(20.0));
    }

    #[test]
    fn test_scene_index_coverage() {
        let idx = SceneIndex {
            media_id: MediaId::new(),
            scenes: vec![
                Scene {
                    start: 0.0,
                    end: 3.0,
                    description: None,
                },
                Scene {
                    start: 3.0,
                    end: 10.0,
                    description: Some("wide shot".into()),
                },
            ],
        };
        assert!(idx.covers_timeline(10.0));
        assert!(!idx.covers_timeline(12.0));
    }
}
