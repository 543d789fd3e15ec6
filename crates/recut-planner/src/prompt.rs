//! Deterministic planner prompt assembly.
//!
//! The envelope is fixed: a system section with the hard output
//! requirements, a context section with the compressed enrichment, and a
//! story-requirements section with the caller's brief. Identical inputs
//! produce byte-identical prompts.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use recut_models::format_seconds;

use crate::compressor::CompressedContext;

/// The caller's story brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRequest {
    /// Free-form story prompt (required)
    pub story_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style_preferences: Vec<String>,
    /// Desired output length as a fraction of the source duration
    pub desired_length_pct: f64,
    /// Tolerance band around the target, as a fraction of the target
    #[serde(default = "default_tolerance")]
    pub tolerance_pct: f64,
    /// Reject instead of warn when coverage misses the band
    #[serde(default)]
    pub strict_coverage: bool,
}

fn default_tolerance() -> f64 {
    0.10
}

/// The assembled prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptEnvelope {
    pub system: String,
    pub user: String,
}

impl StoryRequest {
    /// Target Keep duration in seconds for a given source duration.
    pub fn target_seconds(&self, duration: f64) -> f64 {
        self.desired_length_pct * duration
    }

    /// Tolerance band half-width in seconds.
    pub fn tolerance_seconds(&self, duration: f64) -> f64 {
        self.target_seconds(duration) * self.tolerance_pct
    }
}

/// Build the planner envelope.
pub fn build_envelope(
    context: &CompressedContext,
    request: &StoryRequest,
    duration: f64,
) -> PromptEnvelope {
    let target = request.target_seconds(duration);
    let tolerance = request.tolerance_seconds(duration);

    let system = format!(
        "You are an expert video editor planning a story-driven re-edit.\n\
         \n\
         HARD REQUIREMENTS:\n\
         1. Output exactly one JSON object, no prose before or after it.\n\
         2. The object has keys: story_arc, key_moments, edl, transitions, recommendations.\n\
         3. story_arc = {{\"hook_t\": <s>, \"climax_t\": <s>, \"resolution_t\": <s>}}, strictly increasing.\n\
         4. edl = list of {{\"start\": <s>, \"end\": <s>, \"kind\": \"keep\"|\"skip\"|\"transition\", \"reason\": <str>}}.\n\
         5. Every timestamp lies within [0, {duration:.3}] seconds of the source timeline.\n\
         6. The summed duration of \"keep\" segments must be {target:.1}s, within a tolerance of {tolerance:.1}s.\n\
         7. Only use timestamps grounded in the provided context; never invent moments.\n",
        duration = duration,
        target = target,
        tolerance = tolerance,
    );

    let mut user = String::new();
    let _ = writeln!(user, "VIDEO CONTEXT:");
    let _ = writeln!(user, "Duration: {:.2} seconds", duration);
    let _ = writeln!(
        user,
        "Provided: {} of {} frames, {} of {} scenes, {} of {} transcript segments (uniformly and importance sampled).",
        context.summary.sampled_frames,
        context.summary.total_frames,
        context.summary.sampled_scenes,
        context.summary.total_scenes,
        context.summary.sampled_segments,
        context.summary.total_segments,
    );

    if let Some(summary) = &request.summary {
        let _ = writeln!(user, "\nSUMMARY:\n{}", summary);
    }

    let _ = writeln!(user, "\nSTORY REQUIREMENTS:");
    let _ = writeln!(user, "Story prompt: {}", request.story_prompt);
    if let Some(audience) = &request.target_audience {
        let _ = writeln!(user, "Target audience: {}", audience);
    }
    if let Some(tone) = &request.tone {
        let _ = writeln!(user, "Tone: {}", tone);
    }
    if let Some(message) = &request.key_message {
        let _ = writeln!(user, "Key message: {}", message);
    }
    if !request.style_preferences.is_empty() {
        let _ = writeln!(user, "Style preferences: {}", request.style_preferences.join(", "));
    }
    let _ = writeln!(
        user,
        "Desired length: {:.0}% of source ({:.1}s, tolerance {:.1}s)",
        request.desired_length_pct * 100.0,
        target,
        tolerance,
    );

    if !context.frames.is_empty() {
        let _ = writeln!(user, "\nVISUAL CONTENT (frame descriptions):");
        for f in &context.frames {
            let _ = writeln!(user, "[{}] {}", format_seconds(f.t), f.description);
        }
    }

    if !context.scenes.is_empty() {
        let _ = writeln!(user, "\nSCENES:");
        for s in &context.scenes {
            let _ = writeln!(
                user,
                "{} - {}: {}",
                format_seconds(s.start),
                format_seconds(s.end),
                s.description.as_deref().unwrap_or("(no description)"),
            );
        }
    }

    if !context.transcript.is_empty() {
        let _ = writeln!(user, "\nSPEECH (transcript):");
        for seg in &context.transcript {
            let _ = writeln!(
                user,
                "{} - {}: {}",
                format_seconds(seg.start),
                format_seconds(seg.end),
                seg.text.trim(),
            );
        }
    }

    let _ = writeln!(
        user,
        "\nTASK:\nPlan the re-edit as the required JSON object. Anchor the hook early, place the climax at the narrative peak, and close with a resolution."
    );

    PromptEnvelope { system, user }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::{Compressor, CompressorConfig};
    use recut_models::TranscriptSegment;

    fn request() -> StoryRequest {
        StoryRequest {
            story_prompt: "make it exciting".into(),
            summary: None,
            target_audience: Some("creators".into()),
            tone: None,
            key_message: None,
            style_preferences: vec!["fast cuts".into()],
            desired_length_pct: 0.3,
            tolerance_pct: 0.10,
            strict_coverage: false,
        }
    }

    fn context() -> CompressedContext {
        let c = Compressor::new(CompressorConfig::default());
        let segments = vec![TranscriptSegment {
            start: 0.0,
            end: 5.0,
            text: "welcome to the show".into(),
            confidence: None,
            words: Vec::new(),
        }];
        c.compress(&[], &[], &segments, 100.0, &[])
    }

    #[test]
    fn test_envelope_is_deterministic() {
        let ctx = context();
        let req = request();
        let a = build_envelope(&ctx, &req, 100.0);
        let b = build_envelope(&ctx, &req, 100.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_envelope_carries_target_window() {
        let env = build_envelope(&context(), &request(), 100.0);
        // 30% of 100 s, 10% tolerance.
        assert!(env.system.contains("30.0s"));
        assert!(env.system.contains("3.0s"));
        assert!(env.user.contains("Desired length: 30% of source"));
    }

    #[test]
    fn test_envelope_includes_sampling_counts() {
        let env = build_envelope(&context(), &request(), 100.0);
        assert!(env.user.contains("1 of 1 transcript segments"));
        assert!(env.user.contains("welcome to the show"));
    }

    #[test]
    fn test_target_maths() {
        let req = request();
        assert!((req.target_seconds(200.0) - 60.0).abs() < 1e-9);
        assert!((req.tolerance_seconds(200.0) - 6.0).abs() < 1e-9);
    }
}
