//! Media item definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a media item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl MediaId {
    /// Generate a new random media ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    /// Registered but not yet probed
    #[default]
    Registered,
    /// Probe job is inspecting the source
    Probing,
    /// Technical metadata populated, enrichment may attach
    Ready,
    /// Probe failed; source is unusable
    Failed,
    /// Logically deleted
    Deleted,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Registered => "registered",
            MediaStatus::Probing => "probing",
            MediaStatus::Ready => "ready",
            MediaStatus::Failed => "failed",
            MediaStatus::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MediaStatus::Failed | MediaStatus::Deleted)
    }
}

impl fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Technical metadata filled in by the probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TechMetadata {
    /// Duration in seconds
    pub duration: f64,
    /// Frame rate (fps)
    pub fps: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Whether the source has an audio stream
    pub has_audio: bool,
    /// Video codec name
    pub video_codec: String,
    /// Audio codec name, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Bitrate in bits/second
    pub bitrate: u64,
}

/// One source video tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Media {
    /// Unique media ID
    pub media_id: MediaId,

    /// Blob-store URI or external URL of the source
    pub source_uri: String,

    /// User-supplied title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// User-supplied description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Lifecycle status
    #[serde(default)]
    pub status: MediaStatus,

    /// Probed technical metadata; present once status is Ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech: Option<TechMetadata>,

    /// Sanitised error message when status is Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Media {
    /// Register a new media item.
    pub fn register(source_uri: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            media_id: MediaId::new(),
            source_uri: source_uri.into(),
            title: None,
            description: None,
            status: MediaStatus::Registered,
            tech: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the media ready with probed metadata.
    pub fn into_ready(mut self, tech: TechMetadata) -> Self {
        self.status = MediaStatus::Ready;
        self.tech = Some(tech);
        self.updated_at = Utc::now();
        self
    }

    /// Mark the media failed.
    pub fn into_failed(mut self, error: impl Into<String>) -> Self {
        self.status = MediaStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
        self
    }

    /// Source duration in seconds, if probed.
    pub fn duration(&self) -> Option<f64> {
        self.tech.as_ref().map(|t| t.duration)
    }

    /// Whether the media is Ready with probed metadata attached. Empty
    /// sources probe to Ready with duration 0; enrichment on them
    /// short-circuits to empty outputs while planning rejects them.
    pub fn is_ready(&self) -> bool {
        self.status == MediaStatus::Ready && self.tech.is_some()
    }

    /// Whether the media has material to plan or render against.
    pub fn has_content(&self) -> bool {
        self.is_ready() && self.duration().unwrap_or(0.0) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_defaults() {
        let media = Media::register("https://example.com/clip.mp4").with_title("clip");
        assert_eq!(media.status, MediaStatus::Registered);
        assert!(media.tech.is_none());
        assert!(!media.is_ready());
    }

    #[test]
    fn test_ready_invariant() {
        let media = Media::register("file:///tmp/a.mp4").into_ready(TechMetadata {
            duration: 120.5,
            fps: 29.97,
            width: 1920,
            height: 1080,
            has_audio: true,
            video_codec: "h264".into(),
            audio_codec: Some("aac".into()),
            bitrate: 4_000_000,
        });
        assert!(media.is_ready());
        assert!(media.has_content());

        // Zero-duration media is Ready but has nothing to plan against.
        let empty = Media::register("file:///tmp/b.mp4").into_ready(TechMetadata {
            duration: 0.0,
            fps: 30.0,
            width: 640,
            height: 480,
            has_audio: false,
            video_codec: "h264".into(),
            audio_codec: None,
            bitrate: 0,
        });
        assert!(empty.is_ready());
        assert!(!empty.has_content());
    }
}
