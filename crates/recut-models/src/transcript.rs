//! Transcript model and invariants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaId;

/// A single recognised word with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// One transcript segment. Adjacent segments may touch but not overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,
}

impl TranscriptSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Words per second inside the segment. Falls back to whitespace word
    /// count when word timings are absent.
    pub fn speech_density(&self) -> f64 {
        let count = if self.words.is_empty() {
            self.text.split_whitespace().count()
        } else {
            self.words.len()
        };
        if self.duration() > 0.0 {
            count as f64 / self.duration()
        } else {
            0.0
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TranscriptError {
    #[error("segment {index} has start {start} >= end {end}")]
    EmptySegment { index: usize, start: f64, end: f64 },

    #[error("segment {index} overlaps its predecessor ({prev_end} > {start})")]
    Overlap {
        index: usize,
        prev_end: f64,
        start: f64,
    },

    #[error("segment {index} ends at {end}, past the source duration {duration}")]
    PastEnd {
        index: usize,
        end: f64,
        duration: f64,
    },

    #[error("word '{word}' in segment {index} has start {start} >= end {end}")]
    BadWord {
        index: usize,
        word: String,
        start: f64,
        end: f64,
    },
}

/// Full transcript of one media. Empty `segments` is a valid transcript
/// (silent or speech-free audio), never a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    pub media_id: MediaId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// An empty transcript for a silent source.
    pub fn empty(media_id: MediaId) -> Self {
        Self {
            media_id,
            language: None,
            segments: Vec::new(),
        }
    }

    /// Check the transcript invariants against a source duration:
    /// segments sorted, non-overlapping, inside `[0, duration]`, with
    /// well-formed word timings.
    pub fn validate(&self, duration: f64) -> Result<(), TranscriptError> {
        let mut prev_end = 0.0_f64;
        for (index, seg) in self.segments.iter().enumerate() {
            if seg.start >= seg.end {
                return Err(TranscriptError::EmptySegment {
                    index,
                    start: seg.start,
                    end: seg.end,
                });
            }
            if seg.start < prev_end {
                return Err(TranscriptError::Overlap {
                    index,
                    prev_end,
                    start: seg.start,
                });
            }
            if seg.end > duration {
                return Err(TranscriptError::PastEnd {
                    index,
                    end: seg.end,
                    duration,
                });
            }
            for w in &seg.words {
                if w.start >= w.end || w.end > duration {
                    return Err(TranscriptError::BadWord {
                        index,
                        word: w.word.clone(),
                        start: w.start,
                        end: w.end,
                    });
                }
            }
            prev_end = seg.end;
        }
        Ok(())
    }

    /// Total number of words across all segments.
    pub fn word_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| {
                if s.words.is_empty() {
                    s.text.split_whitespace().count()
                } else {
                    s.words.len()
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.into(),
            confidence: None,
            words: Vec::new(),
        }
    }

    #[test]
    fn test_empty_transcript_is_valid() {
        let t = Transcript::empty(MediaId::new());
        assert!(t.validate(0.0).is_ok());
        assert_eq!(t.word_count(), 0);
    }

    #[test]
    fn test_touching_segments_are_valid() {
        let t = Transcript {
            media_id: MediaId::new(),
            language: Some("en".into()),
            segments: vec![seg(0.0, 2.0, "hello"), seg(2.0, 4.0, "world")],
        };
        assert!(t.validate(4.0).is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let t = Transcript {
            media_id: MediaId::new(),
            language: None,
            segments: vec![seg(0.0, 2.5, "a"), seg(2.0, 4.0, "b")],
        };
        assert!(matches!(
            t.validate(10.0),
            Err(TranscriptError::Overlap { index: 1, .. })
        ));
    }

    #[test]
    fn test_past_duration_rejected() {
        let t = Transcript {
            media_id: MediaId::new(),
            language: None,
            segments: vec![seg(0.0, 12.0, "a")],
        };
        assert!(matches!(
            t.validate(10.0),
            Err(TranscriptError::PastEnd { .. })
        ));
    }

    #[test]
    fn test_speech_density() {
        let s = seg(0.0, 2.0, "one two three four");
        assert!((s.speech_density() - 2.0).abs() < f64::EPSILON);
    }
}
