//! Clip candidates produced by the heuristic selector.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::media::MediaId;

/// Scoring features recorded alongside a candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipFeatures {
    /// Which strategy surfaced the candidate
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_ratio: Option<f64>,
    /// Whether both boundaries align with scene cuts
    #[serde(default)]
    pub scene_aligned: bool,
}

/// A scored candidate window for a short clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipCandidate {
    pub media_id: MediaId,
    pub start: f64,
    pub end: f64,
    /// Retention score in `[0, 100]`
    pub score: f64,
    #[serde(default)]
    pub features: ClipFeatures,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_timestamp: Option<f64>,
}

impl ClipCandidate {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Bounds and duration invariant: inside the source, within the
    /// configured clip length band.
    pub fn is_valid(&self, duration: f64, min_len: f64, max_len: f64) -> bool {
        self.start >= 0.0
            && self.end <= duration
            && self.duration() >= min_len
            && self.duration() <= max_len
            && (0.0..=100.0).contains(&self.score)
    }

    /// Fraction of overlap with another candidate, relative to the shorter.
    pub fn overlap_ratio(&self, other: &ClipCandidate) -> f64 {
        let overlap = (self.end.min(other.end) - self.start.max(other.start)).max(0.0);
        let shorter = self.duration().min(other.duration());
        if shorter > 0.0 {
            overlap / shorter
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(start: f64, end: f64) -> ClipCandidate {
        ClipCandidate {
            media_id: MediaId::new(),
            start,
            end,
            score: 50.0,
            features: ClipFeatures::default(),
            hook_text: None,
            hook_timestamp: None,
        }
    }

    #[test]
    fn test_bounds_invariant() {
        assert!(cand(10.0, 40.0).is_valid(100.0, 15.0, 60.0));
        assert!(!cand(10.0, 20.0).is_valid(100.0, 15.0, 60.0)); // too short
        assert!(!cand(50.0, 120.0).is_valid(100.0, 15.0, 60.0)); // past end
    }

    #[test]
    fn test_overlap_ratio() {
        let a = cand(0.0, 20.0);
        let b = cand(10.0, 30.0);
        assert!((a.overlap_ratio(&b) - 0.5).abs() < 1e-9);
        let c = cand(40.0, 60.0);
        assert_eq!(a.overlap_ratio(&c), 0.0);
    }
}
