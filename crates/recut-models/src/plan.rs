//! Plans: story arc, edit decision list, advisory payloads, warnings.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::media::MediaId;

/// Unique identifier for a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a plan was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Heuristic,
    Story,
}

/// Plan lifecycle: `Draft -> Validated -> {Rendering -> Rendered, Rejected}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Draft,
    Validated,
    Rendering,
    Rendered,
    Rejected,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Validated => "validated",
            PlanStatus::Rendering => "rendering",
            PlanStatus::Rendered => "rendered",
            PlanStatus::Rejected => "rejected",
        }
    }
}

/// EDL segment kind. Only `Keep` contributes frames to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Keep,
    Skip,
    Transition,
}

/// Transition effect hint. Hints are advisory; the renderer currently drops
/// transition segments, producing jump cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Fade,
    Cut,
    Xfade,
}

/// One EDL entry on the source timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EdlSegment {
    pub start: f64,
    pub end: f64,
    pub kind: SegmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_kind: Option<TransitionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EdlSegment {
    pub fn keep(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            kind: SegmentKind::Keep,
            transition_kind: None,
            transition_duration: None,
            reason: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Narrative anchor points on the source timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoryArc {
    pub hook_t: f64,
    pub climax_t: f64,
    pub resolution_t: f64,
}

impl StoryArc {
    pub fn is_ordered(&self) -> bool {
        self.hook_t < self.climax_t && self.climax_t < self.resolution_t
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArcRole {
    Hook,
    Build,
    Climax,
    Resolution,
}

/// Advisory key moment identified by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeyMoment {
    pub start: f64,
    pub end: f64,
    pub importance: Importance,
    pub role: ArcRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Advisory transition between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransitionHint {
    pub from: f64,
    pub to: f64,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Advisory recommendation for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    pub priority: Importance,
}

/// Validation warning kinds. Warnings never block rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    CoverageOutOfBand,
    StoryArcInconsistent,
    SegmentsMerged,
    SegmentClipped,
    SegmentDropped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl PlanWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Model token usage recorded on story plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A validated, renderable plan. Raw model output never reaches this type
/// without passing the validator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    pub plan_id: PlanId,
    pub media_id: MediaId,
    pub mode: PlanMode,
    #[serde(default)]
    pub status: PlanStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_arc: Option<StoryArc>,
    pub edl: Vec<EdlSegment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_moments: Vec<KeyMoment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<TransitionHint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PlanWarning>,

    /// Requested output length as a fraction of source duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_length_pct: Option<f64>,

    /// Model identifier, for story plans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Keep segments in EDL order.
    pub fn keep_segments(&self) -> impl Iterator<Item = &EdlSegment> {
        self.edl.iter().filter(|s| s.kind == SegmentKind::Keep)
    }

    /// Total duration of the Keep segments.
    pub fn total_keep(&self) -> f64 {
        self.keep_segments().map(EdlSegment::duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_arc_ordering() {
        let arc = StoryArc {
            hook_t: 1.0,
            climax_t: 20.0,
            resolution_t: 28.0,
        };
        assert!(arc.is_ordered());

        let inverted = StoryArc {
            hook_t: 20.0,
            climax_t: 1.0,
            resolution_t: 28.0,
        };
        assert!(!inverted.is_ordered());
    }

    #[test]
    fn test_total_keep_ignores_skips() {
        let plan = Plan {
            plan_id: PlanId::new(),
            media_id: MediaId::new(),
            mode: PlanMode::Heuristic,
            status: PlanStatus::Validated,
            story_arc: None,
            edl: vec![
                EdlSegment::keep(2.0, 12.0),
                EdlSegment {
                    kind: SegmentKind::Skip,
                    ..EdlSegment::keep(12.0, 20.0)
                },
                EdlSegment::keep(20.0, 30.0),
            ],
            key_moments: Vec::new(),
            transitions: Vec::new(),
            recommendations: Vec::new(),
            warnings: Vec::new(),
            desired_length_pct: None,
            model: None,
            token_usage: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!((plan.total_keep() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_kind_wire_format() {
        assert_eq!(
            serde_json::to_string(&SegmentKind::Keep).unwrap(),
            "\"keep\""
        );
        let seg: EdlSegment =
            serde_json::from_str(r#"{"start": 1.0, "end": 2.0, "kind": "transition"}"#).unwrap();
        assert_eq!(seg.kind, SegmentKind::Transition);
    }
}
