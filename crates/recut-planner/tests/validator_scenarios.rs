//! End-to-end validator scenarios over literal plans.

use serde_json::json;

use recut_models::{SegmentKind, WarningKind};
use recut_planner::{validate_plan, PlannerError, RawPlan, RawSegment, ValidatorConfig};

fn keep(start: f64, end: f64) -> RawSegment {
    RawSegment {
        start: json!(start),
        end: json!(end),
        kind: Some("keep".into()),
        transition_kind: None,
        transition_duration: None,
        reason: None,
    }
}

fn plan(edl: Vec<RawSegment>) -> RawPlan {
    RawPlan {
        story_arc: None,
        key_moments: Vec::new(),
        edl,
        transitions: Vec::new(),
        recommendations: Vec::new(),
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

// Coverage round-trip: 100 s source, three 10 s keeps, 30% target.
#[test]
fn coverage_round_trip_is_clean() {
    let raw = plan(vec![keep(2.0, 12.0), keep(20.0, 30.0), keep(40.0, 50.0)]);
    let validated = validate_plan(&raw, &config(100.0, 0.3)).unwrap();

    assert!((validated.total_keep() - 30.0).abs() < 1e-9);
    assert!((validated.coverage_pct - 0.3).abs() < 1e-9);
    assert!(validated
        .warnings
        .iter()
        .all(|w| w.kind != WarningKind::CoverageOutOfBand));
}

// Overlap merge: [(0,10), (5,12), (20,25)] becomes [(0,12), (20,25)].
#[test]
fn overlapping_keeps_merge_and_render_proceeds() {
    let raw = plan(vec![keep(0.0, 10.0), keep(5.0, 12.0), keep(20.0, 25.0)]);
    let validated = validate_plan(&raw, &config(100.0, 0.17)).unwrap();

    let keeps: Vec<(f64, f64)> = validated
        .edl
        .iter()
        .filter(|s| s.kind == SegmentKind::Keep)
        .map(|s| (s.start, s.end))
        .collect();
    assert_eq!(keeps, vec![(0.0, 12.0), (20.0, 25.0)]);
    assert_eq!(
        validated
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::SegmentsMerged)
            .count(),
        1
    );
    assert!(validated.total_keep() > 0.0);
}

// A keep running past the source is clipped; when the clipping pulls
// coverage under the band the validator warns but still accepts.
#[test]
fn clipping_past_duration_warns_but_accepts() {
    let raw = plan(vec![keep(80.0, 102.0)]);
    let validated = validate_plan(&raw, &config(100.0, 0.3)).unwrap();

    assert_eq!(validated.edl[0].end, 100.0);
    assert!(validated
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::SegmentClipped));
    assert!(validated
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::CoverageOutOfBand));
}

// An empty EDL can never render; the caller gets the rejection verbatim.
#[test]
fn empty_edl_is_rejected_not_warned() {
    let raw = plan(Vec::new());
    match validate_plan(&raw, &config(100.0, 0.3)) {
        Err(PlannerError::Unrenderable(_)) => {}
        other => panic!("expected Unrenderable, got {:?}", other.map(|v| v.edl)),
    }
}

// Sanitisation is a fixed point: validating a validated plan changes
// nothing.
#[test]
fn validate_is_idempotent() {
    let raw = plan(vec![
        keep(40.0, 50.0),
        keep(0.0, 10.0),
        keep(9.5, 12.0),
        keep(97.0, 105.0),
    ]);
    let cfg = config(100.0, 0.25);

    let once = validate_plan(&raw, &cfg).unwrap();
    let twice = validate_plan(&once.to_raw(), &cfg).unwrap();

    assert_eq!(once.edl, twice.edl);
    assert_eq!(once.story_arc, twice.story_arc);
    assert!((once.total_keep() - twice.total_keep()).abs() < 1e-9);
}

// Transition segments survive validation as advisory entries; only keeps
// count toward coverage.
#[test]
fn transitions_do_not_contribute_coverage() {
    let mut transition = keep(12.0, 13.0);
    transition.kind = Some("transition".into());
    transition.transition_kind = Some("fade".into());

    let raw = plan(vec![keep(0.0, 12.0), transition, keep(20.0, 38.0)]);
    let validated = validate_plan(&raw, &config(100.0, 0.3)).unwrap();

    assert!((validated.total_keep() - 30.0).abs() < 1e-9);
    assert!(validated
        .edl
        .iter()
        .any(|s| s.kind == SegmentKind::Transition));
}
