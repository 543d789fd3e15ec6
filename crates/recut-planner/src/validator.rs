//! EDL validation.
//!
//! Every plan — heuristic or model-produced — passes through here before it
//! becomes a stored `Plan` the renderer will touch. Rules run in order:
//! schema, bounds, ordering, rounding, coverage, story-arc consistency,
//! non-empty. Warnings never block rendering; rejection does.

use recut_models::{
    parse_timecode, round_ms, ArcRole, EdlSegment, Importance, KeyMoment, PlanWarning,
    Recommendation, SegmentKind, StoryArc, TransitionHint, TransitionKind, WarningKind,
};

use crate::error::{PlannerError, PlannerResult};
use crate::llm::{RawPlan, RawSegment};

/// Segments shorter than this after clipping are dropped.
const MIN_SEGMENT_S: f64 = 0.1;

/// Validator configuration.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Source duration in seconds
    pub duration: f64,
    /// Desired Keep coverage as a fraction of the source duration
    pub desired_length_pct: f64,
    /// Tolerance band around the target, as a fraction of the target
    pub tolerance_pct: f64,
    /// Reject instead of warn when coverage misses the band
    pub strict_coverage: bool,
}

/// A sanitised plan with invariants enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlan {
    pub story_arc: Option<StoryArc>,
    pub edl: Vec<EdlSegment>,
    pub key_moments: Vec<KeyMoment>,
    pub transitions: Vec<TransitionHint>,
    pub recommendations: Vec<Recommendation>,
    pub warnings: Vec<PlanWarning>,
    /// Achieved Keep coverage as a fraction of the source duration
    pub coverage_pct: f64,
}

impl ValidatedPlan {
    /// Total Keep duration in seconds.
    pub fn total_keep(&self) -> f64 {
        self.edl
            .iter()
            .filter(|s| s.kind == SegmentKind::Keep)
            .map(EdlSegment::duration)
            .sum()
    }

    /// Re-project into the raw contract shape (used to re-validate).
    pub fn to_raw(&self) -> RawPlan {
        RawPlan {
            story_arc: self.story_arc.map(|arc| crate::llm::RawStoryArc {
                hook_t: arc.hook_t,
                climax_t: arc.climax_t,
                resolution_t: arc.resolution_t,
            }),
            key_moments: self
                .key_moments
                .iter()
                .map(|m| crate::llm::RawKeyMoment {
                    start: m.start,
                    end: m.end,
                    importance: Some(importance_str(m.importance).to_string()),
                    role: Some(role_str(m.role).to_string()),
                    reason: m.reason.clone(),
                })
                .collect(),
            edl: self
                .edl
                .iter()
                .map(|s| RawSegment {
                    start: serde_json::json!(s.start),
                    end: serde_json::json!(s.end),
                    kind: Some(kind_str(s.kind).to_string()),
                    transition_kind: s.transition_kind.map(|k| transition_str(k).to_string()),
                    transition_duration: s.transition_duration,
                    reason: s.reason.clone(),
                })
                .collect(),
            transitions: self
                .transitions
                .iter()
                .map(|t| crate::llm::RawTransition {
                    from: t.from,
                    to: t.to,
                    kind: Some(t.kind.clone()),
                    reason: t.reason.clone(),
                })
                .collect(),
            recommendations: self
                .recommendations
                .iter()
                .map(|r| crate::llm::RawRecommendation {
                    message: r.message.clone(),
                    timestamp: r.timestamp,
                    priority: Some(importance_str(r.priority).to_string()),
                })
                .collect(),
        }
    }
}

/// Validate and sanitise a raw plan.
///
/// Returns `Err(Unrenderable)` when no Keep material survives, or
/// `Err(CoverageRejected)` when `strict_coverage` is set and the band is
/// missed. Every other defect becomes a warning on the returned plan.
pub fn validate_plan(raw: &RawPlan, config: &ValidatorConfig) -> PlannerResult<ValidatedPlan> {
    let duration = config.duration;
    let mut warnings = Vec::new();

    // Rules 1+2: schema and bounds. Unparsable or degenerate segments drop;
    // out-of-bounds segments clip.
    let mut segments: Vec<EdlSegment> = Vec::new();
    for (i, raw_seg) in raw.edl.iter().enumerate() {
        let (Some(start), Some(end)) = (parse_time(&raw_seg.start), parse_time(&raw_seg.end))
        else {
            warnings.push(PlanWarning::new(
                WarningKind::SegmentDropped,
                format!("segment {} has unparsable timestamps", i),
            ));
            continue;
        };

        let kind = match raw_seg.kind.as_deref() {
            Some("skip") => SegmentKind::Skip,
            Some("transition") => SegmentKind::Transition,
            _ => SegmentKind::Keep,
        };

        let clipped_start = start.clamp(0.0, duration);
        let clipped_end = end.clamp(0.0, duration);
        if clipped_start != start || clipped_end != end {
            warnings.push(PlanWarning::new(
                WarningKind::SegmentClipped,
                format!(
                    "segment {} clipped from [{:.3}, {:.3}] to [{:.3}, {:.3}]",
                    i, start, end, clipped_start, clipped_end
                ),
            ));
        }

        if clipped_end - clipped_start < MIN_SEGMENT_S {
            warnings.push(PlanWarning::new(
                WarningKind::SegmentDropped,
                format!("segment {} shorter than {:.1}s after clipping", i, MIN_SEGMENT_S),
            ));
            continue;
        }

        segments.push(EdlSegment {
            start: clipped_start,
            end: clipped_end,
            kind,
            transition_kind: raw_seg.transition_kind.as_deref().and_then(parse_transition),
            transition_duration: raw_seg.transition_duration,
            reason: raw_seg.reason.clone(),
        });
    }

    // Rule 3: sort, then merge overlapping Keeps (union, reasons joined).
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    let mut merged: Vec<EdlSegment> = Vec::new();
    let mut merge_count = 0usize;
    for seg in segments {
        if seg.kind == SegmentKind::Keep {
            if let Some(last) = merged
                .iter_mut()
                .rev()
                .find(|s| s.kind == SegmentKind::Keep)
            {
                if seg.start < last.end {
                    merge_count += 1;
                    last.end = last.end.max(seg.end);
                    last.reason = join_reasons(last.reason.take(), seg.reason);
                    continue;
                }
            }
        }
        merged.push(seg);
    }
    if merge_count > 0 {
        warnings.push(PlanWarning::new(
            WarningKind::SegmentsMerged,
            format!("merged {} overlapping keep segment(s)", merge_count),
        ));
    }

    // Rule 4: millisecond rounding.
    for seg in &mut merged {
        seg.start = round_ms(seg.start);
        seg.end = round_ms(seg.end);
    }

    // Rule 5: coverage, warn-only unless strict.
    let total_keep: f64 = merged
        .iter()
        .filter(|s| s.kind == SegmentKind::Keep)
        .map(EdlSegment::duration)
        .sum();
    let target = config.desired_length_pct * duration;
    let tolerance = target * config.tolerance_pct;
    if duration > 0.0 && (total_keep < target - tolerance || total_keep > target + tolerance) {
        if config.strict_coverage {
            return Err(PlannerError::CoverageRejected {
                actual_s: total_keep,
                min_s: target - tolerance,
                max_s: target + tolerance,
            });
        }
        warnings.push(PlanWarning::new(
            WarningKind::CoverageOutOfBand,
            format!(
                "keep coverage {:.1}s outside target band [{:.1}s, {:.1}s]",
                total_keep,
                target - tolerance,
                target + tolerance
            ),
        ));
    }

    // Rule 6: story-arc consistency, warn-only.
    let story_arc = raw.story_arc.as_ref().map(|arc| StoryArc {
        hook_t: round_ms(arc.hook_t),
        climax_t: round_ms(arc.climax_t),
        resolution_t: round_ms(arc.resolution_t),
    });
    if let Some(arc) = &story_arc {
        let in_keep = |t: f64| {
            merged
                .iter()
                .any(|s| s.kind == SegmentKind::Keep && t >= s.start && t <= s.end)
        };
        let anchors_covered = in_keep(arc.hook_t) && in_keep(arc.climax_t) && in_keep(arc.resolution_t);
        if !arc.is_ordered() || !anchors_covered {
            warnings.push(PlanWarning::new(
                WarningKind::StoryArcInconsistent,
                "story arc anchors are unordered or fall outside keep segments",
            ));
        }
    }

    // Rule 7: non-empty.
    if total_keep <= 0.0 {
        return Err(PlannerError::Unrenderable(
            "plan has no keep material".into(),
        ));
    }

    let key_moments = raw
        .key_moments
        .iter()
        .filter(|m| m.start < m.end)
        .map(|m| KeyMoment {
            start: round_ms(m.start.clamp(0.0, duration)),
            end: round_ms(m.end.clamp(0.0, duration)),
            importance: parse_importance(m.importance.as_deref()),
            role: parse_role(m.role.as_deref()),
            reason: m.reason.clone(),
        })
        .collect();

    let transitions = raw
        .transitions
        .iter()
        .map(|t| TransitionHint {
            from: round_ms(t.from),
            to: round_ms(t.to),
            kind: t.kind.clone().unwrap_or_else(|| "cut".to_string()),
            reason: t.reason.clone(),
        })
        .collect();

    let recommendations = raw
        .recommendations
        .iter()
        .map(|r| Recommendation {
            message: r.message.clone(),
            timestamp: r.timestamp,
            priority: parse_importance(r.priority.as_deref()),
        })
        .collect();

    Ok(ValidatedPlan {
        story_arc,
        edl: merged,
        key_moments,
        transitions,
        recommendations,
        warnings,
        coverage_pct: if duration > 0.0 {
            total_keep / duration
        } else {
            0.0
        },
    })
}

fn parse_time(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_timecode(s).ok(),
        _ => None,
    }
}

fn parse_transition(s: &str) -> Option<TransitionKind> {
    match s {
        "fade" => Some(TransitionKind::Fade),
        "cut" => Some(TransitionKind::Cut),
        "xfade" => Some(TransitionKind::Xfade),
        _ => None,
    }
}

fn parse_importance(s: Option<&str>) -> Importance {
    match s {
        Some("high") => Importance::High,
        Some("low") => Importance::Low,
        _ => Importance::Medium,
    }
}

fn parse_role(s: Option<&str>) -> ArcRole {
    match s {
        Some("hook") => ArcRole::Hook,
        Some("climax") => ArcRole::Climax,
        Some("resolution") => ArcRole::Resolution,
        _ => ArcRole::Build,
    }
}

fn join_reasons(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(format!("{}; {}", a, b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn kind_str(kind: SegmentKind) -> &'static str {
    match kind {
        SegmentKind::Keep => "keep",
        SegmentKind::Skip => "skip",
        SegmentKind::Transition => "transition",
    }
}

fn transition_str(kind: TransitionKind) -> &'static str {
    match kind {
        TransitionKind::Fade => "fade",
        TransitionKind::Cut => "cut",
        TransitionKind::Xfade => "xfade",
    }
}

fn importance_str(i: Importance) -> &'static str {
    match i {
        Importance::High => "high",
        Importance::Medium => "medium",
        Importance::Low => "low",
    }
}

fn role_str(r: ArcRole) -> &'static str {
    match r {
        ArcRole::Hook => "hook",
        ArcRole::Build => "build",
        ArcRole::Climax => "climax",
        ArcRole::Resolution => "resolution",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_keep(start: f64, end: f64) -> RawSegment {
        RawSegment {
            start: serde_json::json!(start),
            end: serde_json::json!(end),
            kind: Some("keep".into()),
            transition_kind: None,
            transition_duration: None,
            reason: None,
        }
    }

    fn config(duration: f64, pct: f64) -> ValidatorConfig {
        ValidatorConfig {
            duration,
            desired_length_pct: pct,
            tolerance_pct: 0.10,
            strict_coverage: false,
        }
    }

    fn plan_with(edl: Vec<RawSegment>) -> RawPlan {
        RawPlan {
            story_arc: None,
            key_moments: Vec::new(),
            edl,
            transitions: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_in_band_coverage_does_not_warn() {
        // 100 s source, keeps summing to 30 s, target 30% +- 10%.
        let raw = plan_with(vec![
            raw_keep(2.0, 12.0),
            raw_keep(20.0, 30.0),
            raw_keep(40.0, 50.0),
        ]);
        let validated = validate_plan(&raw, &config(100.0, 0.3)).unwrap();
        assert!((validated.total_keep() - 30.0).abs() < 1e-9);
        assert!(validated
            .warnings
            .iter()
            .all(|w| w.kind != WarningKind::CoverageOutOfBand));
    }

    #[test]
    fn test_overlapping_keeps_merge_with_warning() {
        let raw = plan_with(vec![
            raw_keep(0.0, 10.0),
            raw_keep(5.0, 12.0),
            raw_keep(20.0, 25.0),
        ]);
        let validated = validate_plan(&raw, &config(100.0, 0.17)).unwrap();
        let keeps: Vec<_> = validated
            .edl
            .iter()
            .filter(|s| s.kind == SegmentKind::Keep)
            .collect();
        assert_eq!(keeps.len(), 2);
        assert!((keeps[0].start, keeps[0].end) == (0.0, 12.0));
        assert!((keeps[1].start, keeps[1].end) == (20.0, 25.0));
        assert!(validated
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::SegmentsMerged));
    }

    #[test]
    fn test_past_end_segment_is_clipped_not_rejected() {
        let raw = plan_with(vec![raw_keep(90.0, 102.0)]);
        let validated = validate_plan(&raw, &config(100.0, 0.1)).unwrap();
        let keep = &validated.edl[0];
        assert_eq!(keep.end, 100.0);
        assert!(validated
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::SegmentClipped));
    }

    #[test]
    fn test_clipping_below_min_drops_segment() {
        let raw = plan_with(vec![raw_keep(99.95, 103.0), raw_keep(0.0, 20.0)]);
        let validated = validate_plan(&raw, &config(100.0, 0.2)).unwrap();
        assert_eq!(validated.edl.len(), 1);
        assert!(validated
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::SegmentDropped));
    }

    #[test]
    fn test_empty_edl_is_unrenderable() {
        let raw = plan_with(Vec::new());
        let err = validate_plan(&raw, &config(100.0, 0.3)).unwrap_err();
        assert!(matches!(err, PlannerError::Unrenderable(_)));
    }

    #[test]
    fn test_skip_only_edl_is_unrenderable() {
        let mut seg = raw_keep(0.0, 50.0);
        seg.kind = Some("skip".into());
        let raw = plan_with(vec![seg]);
        let err = validate_plan(&raw, &config(100.0, 0.3)).unwrap_err();
        assert!(matches!(err, PlannerError::Unrenderable(_)));
    }

    #[test]
    fn test_coverage_out_of_band_warns_but_accepts() {
        let raw = plan_with(vec![raw_keep(0.0, 10.0)]);
        let validated = validate_plan(&raw, &config(100.0, 0.5)).unwrap();
        assert!(validated
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::CoverageOutOfBand));
    }

    #[test]
    fn test_strict_coverage_rejects() {
        let raw = plan_with(vec![raw_keep(0.0, 10.0)]);
        let mut cfg = config(100.0, 0.5);
        cfg.strict_coverage = true;
        let err = validate_plan(&raw, &cfg).unwrap_err();
        assert!(matches!(err, PlannerError::CoverageRejected { .. }));
    }

    #[test]
    fn test_story_arc_outside_keeps_warns() {
        let mut raw = plan_with(vec![raw_keep(0.0, 30.0)]);
        raw.story_arc = Some(crate::llm::RawStoryArc {
            hook_t: 1.0,
            climax_t: 50.0, // in a skipped region
            resolution_t: 29.0,
        });
        let validated = validate_plan(&raw, &config(100.0, 0.3)).unwrap();
        assert!(validated
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::StoryArcInconsistent));
    }

    #[test]
    fn test_timecode_strings_accepted() {
        let raw = plan_with(vec![RawSegment {
            start: serde_json::json!("00:00:05"),
            end: serde_json::json!("00:00:35"),
            kind: Some("keep".into()),
            transition_kind: None,
            transition_duration: None,
            reason: None,
        }]);
        let validated = validate_plan(&raw, &config(100.0, 0.3)).unwrap();
        assert_eq!(validated.edl[0].start, 5.0);
        assert_eq!(validated.edl[0].end, 35.0);
    }

    #[test]
    fn test_validation_is_a_fixed_point() {
        let raw = plan_with(vec![
            raw_keep(0.0, 10.0),
            raw_keep(5.0, 12.3456),
            raw_keep(20.0, 30.0),
            raw_keep(95.0, 104.0),
        ]);
        let cfg = config(100.0, 0.3);
        let once = validate_plan(&raw, &cfg).unwrap();
        let twice = validate_plan(&once.to_raw(), &cfg).unwrap();
        assert_eq!(once.edl, twice.edl);
        assert_eq!(once.story_arc, twice.story_arc);
        assert!((once.coverage_pct - twice.coverage_pct).abs() < 1e-9);
        // The second pass finds nothing left to merge or clip.
        assert!(twice
            .warnings
            .iter()
            .all(|w| w.kind == WarningKind::CoverageOutOfBand));
    }

    #[test]
    fn test_millisecond_rounding() {
        let raw = plan_with(vec![raw_keep(0.123456, 30.987654)]);
        let validated = validate_plan(&raw, &config(100.0, 0.3)).unwrap();
        assert_eq!(validated.edl[0].start, 0.123);
        assert_eq!(validated.edl[0].end, 30.988);
    }
}
