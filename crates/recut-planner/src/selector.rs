//! Heuristic clip selection.
//!
//! Candidates come from several strategies over the transcript, silence map
//! and scene cuts, get a retention score in `[0, 100]`, and are picked
//! greedily by score under a pairwise non-overlap constraint.

use recut_models::{ClipCandidate, ClipFeatures, MediaId, SceneCuts, SilenceMap, Transcript};

/// Hook words matched case-insensitively against segment text.
const HOOK_KEYWORDS: &[&str] = &[
    "amazing",
    "incredible",
    "watch",
    "check",
    "here",
    "now",
    "you",
    "this",
    "that",
    "important",
    "key",
    "secret",
    "learn",
    "discover",
    "reveal",
    "surprising",
];

/// Selector configuration.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Minimum clip length in seconds
    pub min_clip_s: f64,
    /// Maximum clip length in seconds
    pub max_clip_s: f64,
    /// Maximum number of candidates returned
    pub max_candidates: usize,
    /// Boundary-to-cut alignment window in seconds
    pub scene_align_window_s: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_clip_s: 15.0,
            max_clip_s: 60.0,
            max_candidates: 5,
            scene_align_window_s: 0.25,
        }
    }
}

/// Generate up to `max_candidates` non-overlapping scored candidates.
/// Returns an empty list when there is no transcript signal to score.
pub fn generate_candidates(
    media_id: &MediaId,
    transcript: Option<&Transcript>,
    silence: Option<&SilenceMap>,
    cuts: Option<&SceneCuts>,
    duration: f64,
    config: &SelectorConfig,
) -> Vec<ClipCandidate> {
    let transcript = match transcript {
        Some(t) if !t.segments.is_empty() => t,
        _ => return Vec::new(),
    };

    let mut raw = Vec::new();
    raw.extend(high_density_candidates(media_id, transcript, config));
    raw.extend(keyword_candidates(media_id, transcript, config));
    if let Some(cuts) = cuts {
        raw.extend(scene_candidates(media_id, cuts, duration, config));
    }

    // Fallback: plain transcript windows when the strategies found little.
    if raw.len() < 3 {
        for seg in &transcript.segments {
            let len = seg.duration();
            if len >= config.min_clip_s && len <= config.max_clip_s {
                raw.push(ClipCandidate {
                    media_id: media_id.clone(),
                    start: seg.start,
                    end: seg.end,
                    score: 0.0,
                    features: ClipFeatures {
                        strategy: "transcript_segment".into(),
                        word_count: Some(seg.text.split_whitespace().count()),
                        ..ClipFeatures::default()
                    },
                    hook_text: Some(truncate(&seg.text, 100)),
                    hook_timestamp: Some(seg.start),
                });
            }
        }
    }

    for cand in &mut raw {
        cand.score = retention_score(cand, silence, cuts, duration, config);
    }

    // Greedy selection by score under pairwise non-overlap; ties go to the
    // earlier start.
    raw.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.start.total_cmp(&b.start))
    });

    let mut selected: Vec<ClipCandidate> = Vec::new();
    for cand in raw {
        if selected.len() >= config.max_candidates {
            break;
        }
        if !cand.is_valid(duration, config.min_clip_s, config.max_clip_s) {
            continue;
        }
        if selected.iter().all(|s| s.overlap_ratio(&cand) == 0.0) {
            selected.push(cand);
        }
    }

    selected.sort_by(|a, b| a.start.total_cmp(&b.start));
    selected
}

fn high_density_candidates(
    media_id: &MediaId,
    transcript: &Transcript,
    config: &SelectorConfig,
) -> Vec<ClipCandidate> {
    let mut out = Vec::new();
    for seg in &transcript.segments {
        let len = seg.duration();
        if len < config.min_clip_s || len > config.max_clip_s {
            continue;
        }
        let density = seg.speech_density();
        if density > 2.0 {
            out.push(ClipCandidate {
                media_id: media_id.clone(),
                start: seg.start,
                end: seg.end,
                score: 0.0,
                features: ClipFeatures {
                    strategy: "high_density".into(),
                    speech_density: Some(density),
                    word_count: Some(seg.text.split_whitespace().count()),
                    ..ClipFeatures::default()
                },
                hook_text: None,
                hook_timestamp: None,
            });
        }
    }
    out
}

fn keyword_candidates(
    media_id: &MediaId,
    transcript: &Transcript,
    config: &SelectorConfig,
) -> Vec<ClipCandidate> {
    let mut out = Vec::new();
    for seg in &transcript.segments {
        let text_lower = seg.text.to_lowercase();
        let keyword_count = HOOK_KEYWORDS
            .iter()
            .filter(|kw| text_lower.contains(*kw))
            .count();
        if keyword_count == 0 {
            continue;
        }
        let len = seg.duration();
        if len < config.min_clip_s || len > config.max_clip_s {
            continue;
        }
        out.push(ClipCandidate {
            media_id: media_id.clone(),
            start: seg.start,
            end: seg.end,
            score: 0.0,
            features: ClipFeatures {
                strategy: "keywords".into(),
                keyword_count: Some(keyword_count),
                ..ClipFeatures::default()
            },
            hook_text: Some(truncate(&seg.text, 100)),
            hook_timestamp: Some(seg.start),
        });
    }
    out
}

fn scene_candidates(
    media_id: &MediaId,
    cuts: &SceneCuts,
    duration: f64,
    config: &SelectorConfig,
) -> Vec<ClipCandidate> {
    let mut boundaries = vec![0.0];
    boundaries.extend_from_slice(&cuts.cuts);
    boundaries.push(duration);

    let mut out = Vec::new();
    for pair in boundaries.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let len = end - start;
        if len >= config.min_clip_s && len <= config.max_clip_s {
            out.push(ClipCandidate {
                media_id: media_id.clone(),
                start,
                end,
                score: 0.0,
                features: ClipFeatures {
                    strategy: "scene_change".into(),
                    scene_aligned: true,
                    ..ClipFeatures::default()
                },
                hook_text: None,
                hook_timestamp: None,
            });
        }
    }
    out
}

/// Retention score: base 50, speech density up to +20, keywords up to +15,
/// silence ratio down to -30, duration shape +-10, early position +5, scene
/// alignment +5. Clamped to `[0, 100]`.
fn retention_score(
    cand: &ClipCandidate,
    silence: Option<&SilenceMap>,
    cuts: Option<&SceneCuts>,
    duration: f64,
    config: &SelectorConfig,
) -> f64 {
    let mut score = 50.0_f64;
    let len = cand.duration();

    if let Some(density) = cand.features.speech_density {
        score += (density * 10.0).min(20.0);
    }

    if let Some(keywords) = cand.features.keyword_count {
        score += (keywords as f64 * 5.0).min(15.0);
    }

    if let Some(silence) = silence {
        let ratio = if len > 0.0 {
            silence.silence_within(cand.start, cand.end) / len
        } else {
            0.0
        };
        score -= ratio * 30.0;
    }

    if (20.0..=40.0).contains(&len) {
        score += 10.0;
    } else if len < config.min_clip_s || len > config.max_clip_s {
        score -= 10.0;
    }

    if duration > 0.0 && cand.start < duration * 0.1 {
        score += 5.0;
    }

    if let Some(cuts) = cuts {
        let aligned = cuts.has_cut_near(cand.start, config.scene_align_window_s)
            && cuts.has_cut_near(cand.end, config.scene_align_window_s);
        if aligned || cand.features.scene_aligned {
            score += 5.0;
        }
    }

    score.clamp(0.0, 100.0)
}

fn truncate(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= max {
        trimmed.to_string()
    } else {
        let mut end = max;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        trimmed[..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_models::{Interval, TranscriptSegment};

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.into(),
            confidence: None,
            words: Vec::new(),
        }
    }

    fn transcript(media: &MediaId, segments: Vec<TranscriptSegment>) -> Transcript {
        Transcript {
            media_id: media.clone(),
            language: Some("en".into()),
            segments,
        }
    }

    #[test]
    fn test_no_transcript_returns_empty() {
        let media = MediaId::new();
        let out = generate_candidates(&media, None, None, None, 100.0, &SelectorConfig::default());
        assert!(out.is_empty());

        let empty = transcript(&media, Vec::new());
        let out = generate_candidates(
            &media,
            Some(&empty),
            None,
            None,
            100.0,
            &SelectorConfig::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_candidates_are_non_overlapping_and_sorted() {
        let media = MediaId::new();
        let text = "this is an amazing secret you should watch right now okay";
        let t = transcript(
            &media,
            vec![
                seg(0.0, 30.0, text),
                seg(10.0, 45.0, text),
                seg(50.0, 80.0, text),
            ],
        );
        let out = generate_candidates(&media, Some(&t), None, None, 100.0, &SelectorConfig::default());
        assert!(!out.is_empty());
        for pair in out.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-9);
        }
    }

    #[test]
    fn test_silence_penalises_score() {
        let media = MediaId::new();
        let text = "steady speech for the whole window with plenty of words spoken";
        let t = transcript(&media, vec![seg(0.0, 30.0, text)]);

        let quiet = SilenceMap {
            media_id: media.clone(),
            min_silence_s: 0.6,
            intervals: vec![Interval::new(0.0, 15.0)],
        };

        let with_silence = generate_candidates(
            &media,
            Some(&t),
            Some(&quiet),
            None,
            100.0,
            &SelectorConfig::default(),
        );
        let without = generate_candidates(&media, Some(&t), None, None, 100.0, &SelectorConfig::default());
        assert!(with_silence[0].score < without[0].score);
    }

    #[test]
    fn test_scores_bounded() {
        let media = MediaId::new();
        let text = "amazing incredible watch check here now you this that important key secret learn discover reveal surprising";
        let t = transcript(&media, vec![seg(1.0, 26.0, text)]);
        let out = generate_candidates(&media, Some(&t), None, None, 100.0, &SelectorConfig::default());
        assert!(!out.is_empty());
        for c in &out {
            assert!((0.0..=100.0).contains(&c.score));
        }
    }

    #[test]
    fn test_respects_max_candidates() {
        let media = MediaId::new();
        let text = "you should watch this amazing thing now";
        let segments: Vec<TranscriptSegment> = (0..10)
            .map(|i| seg(i as f64 * 20.0, i as f64 * 20.0 + 18.0, text))
            .collect();
        let t = transcript(&media, segments);
        let config = SelectorConfig::default();
        let out = generate_candidates(&media, Some(&t), None, None, 220.0, &config);
        assert!(out.len() <= config.max_candidates);
    }

    #[test]
    fn test_scene_window_candidates_used_without_speech_matches() {
        let media = MediaId::new();
        // Transcript exists but its one segment is too long to be a clip.
        let t = transcript(&media, vec![seg(0.0, 90.0, "long monologue")]);
        let cuts = SceneCuts {
            media_id: media.clone(),
            cuts: vec![30.0, 55.0],
        };
        let out = generate_candidates(
            &media,
            Some(&t),
            None,
            Some(&cuts),
            90.0,
            &SelectorConfig::default(),
        );
        assert!(out.iter().any(|c| c.features.strategy == "scene_change"));
    }
}
