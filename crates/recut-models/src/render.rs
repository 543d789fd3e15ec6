//! Render records and aspect ratios.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::job::JobError;
use crate::media::MediaId;
use crate::plan::PlanId;

/// Unique identifier for a render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RenderId(pub String);

impl RenderId {
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

impl Default for RenderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AspectRatioError {
    #[error("invalid aspect ratio: {0} (expected W:H)")]
    Invalid(String),
}

/// Target aspect ratio, expressed as `W:H` (e.g. "16:9", "9:16", "1:1").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub w: u32,
    pub h: u32,
}

impl AspectRatio {
    pub const WIDE: AspectRatio = AspectRatio { w: 16, h: 9 };
    pub const VERTICAL: AspectRatio = AspectRatio { w: 9, h: 16 };
    pub const SQUARE: AspectRatio = AspectRatio { w: 1, h: 1 };

    /// Compute the output frame from a reference width. The wider dimension
    /// is pinned to the reference width; both dimensions are rounded to even
    /// values for codec compatibility.
    pub fn target_frame(&self, reference_width: u32) -> (u32, u32) {
        let even = |v: u32| if v % 2 == 0 { v } else { v + 1 };
        if self.w >= self.h {
            let width = even(reference_width);
            let height = even((reference_width as u64 * self.h as u64 / self.w as u64) as u32);
            (width, height)
        } else {
            let height = even(reference_width);
            let width = even((reference_width as u64 * self.w as u64 / self.h as u64) as u32);
            (width, height)
        }
    }

    /// The filename-safe form, e.g. "16x9".
    pub fn as_filename_part(&self) -> String {
        format!("{}x{}", self.w, self.h)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.w, self.h)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| AspectRatioError::Invalid(s.to_string()))?;
        let w: u32 = w
            .trim()
            .parse()
            .map_err(|_| AspectRatioError::Invalid(s.to_string()))?;
        let h: u32 = h
            .trim()
            .parse()
            .map_err(|_| AspectRatioError::Invalid(s.to_string()))?;
        if w == 0 || h == 0 {
            return Err(AspectRatioError::Invalid(s.to_string()));
        }
        Ok(Self { w, h })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = AspectRatioError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(r: AspectRatio) -> Self {
        r.to_string()
    }
}

/// Render lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    #[default]
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Queued => "queued",
            RenderStatus::Running => "running",
            RenderStatus::Completed => "completed",
            RenderStatus::Failed => "failed",
            RenderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RenderStatus::Completed | RenderStatus::Failed | RenderStatus::Cancelled
        )
    }
}

/// One output per `(plan_id, aspect_ratio)`. The output URI is readable only
/// once status is `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Render {
    pub render_id: RenderId,
    pub media_id: MediaId,
    pub plan_id: PlanId,
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub status: RenderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Render {
    pub fn queued(media_id: MediaId, plan_id: PlanId, aspect_ratio: AspectRatio) -> Self {
        Self {
            render_id: RenderId::new(),
            media_id,
            plan_id,
            aspect_ratio,
            status: RenderStatus::Queued,
            output_uri: None,
            error: None,
            duration_seconds: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn into_running(mut self) -> Self {
        self.status = RenderStatus::Running;
        self.started_at = Some(Utc::now());
        self
    }

    pub fn into_completed(mut self, output_uri: String, duration_seconds: f64) -> Self {
        self.status = RenderStatus::Completed;
        self.output_uri = Some(output_uri);
        self.duration_seconds = Some(duration_seconds);
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn into_failed(mut self, error: JobError) -> Self {
        self.status = RenderStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn into_cancelled(mut self) -> Self {
        self.status = RenderStatus::Cancelled;
        self.finished_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::WIDE);
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::VERTICAL);
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("0:9".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_target_frame_even_dimensions() {
        let (w, h) = AspectRatio::WIDE.target_frame(1080);
        assert_eq!((w, h), (1080, 608)); // 607.5 rounds down then bumps even
        let (w, h) = AspectRatio::VERTICAL.target_frame(1080);
        assert_eq!((w, h), (608, 1080));
        let (w, h) = AspectRatio::SQUARE.target_frame(1080);
        assert_eq!((w, h), (1080, 1080));
        assert_eq!(w % 2, 0);
        assert_eq!(h % 2, 0);
    }

    #[test]
    fn test_render_lifecycle() {
        let render = Render::queued(MediaId::new(), PlanId::new(), AspectRatio::VERTICAL);
        assert_eq!(render.status, RenderStatus::Queued);
        let done = render
            .into_running()
            .into_completed("file:///renders/p/9x16.mp4".into(), 30.0);
        assert_eq!(done.status, RenderStatus::Completed);
        assert!(done.output_uri.is_some());
        assert!(done.status.is_terminal());
    }

    #[test]
    fn test_aspect_ratio_serde_round_trip() {
        let json = serde_json::to_string(&AspectRatio::VERTICAL).unwrap();
        assert_eq!(json, "\"9:16\"");
        let parsed: AspectRatio = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, AspectRatio::VERTICAL);
    }
}
