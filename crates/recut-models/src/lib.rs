//! Shared data models for the recut backend.
//!
//! This crate provides Serde-serializable types for:
//! - Media items and probed technical metadata
//! - Jobs, job kinds and the job state lattice
//! - Enrichment outputs (transcript, silence map, scene cuts, frames, scenes)
//! - Clip candidates and their scoring features
//! - Plans (story arc + edit decision list) and validation warnings
//! - Renders and aspect ratios
//! - The error-code taxonomy shared across crates

pub mod candidate;
pub mod code;
pub mod enrichment;
pub mod job;
pub mod media;
pub mod plan;
pub mod render;
pub mod timecode;
pub mod transcript;

// Re-export common types
pub use candidate::{ClipCandidate, ClipFeatures};
pub use code::ErrorCode;
pub use enrichment::{
    FrameDescription, FrameIndex, Interval, Scene, SceneCuts, SceneIndex, SilenceMap,
};
pub use job::{Job, JobError, JobId, JobKind, JobStatus};
pub use media::{Media, MediaId, MediaStatus, TechMetadata};
pub use plan::{
    ArcRole, EdlSegment, Importance, KeyMoment, Plan, PlanId, PlanMode, PlanStatus, PlanWarning,
    Recommendation, SegmentKind, StoryArc, TokenUsage, TransitionHint, TransitionKind, WarningKind,
};
pub use render::{AspectRatio, Render, RenderId, RenderStatus};
pub use timecode::{format_seconds, parse_timecode, round_ms};
pub use transcript::{Transcript, TranscriptSegment, Word};
