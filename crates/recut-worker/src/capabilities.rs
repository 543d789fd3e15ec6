//! Capability interfaces for the external speech and vision services.
//!
//! The orchestrator treats network errors from either service as retryable;
//! both clients do a small bounded retry of their own before surfacing one.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use recut_models::TranscriptSegment;

use crate::error::{WorkerError, WorkerResult};

/// Output of a transcription run, before it is attached to a media.
#[derive(Debug, Clone, Default)]
pub struct TranscriptPayload {
    pub language: Option<String>,
    pub segments: Vec<TranscriptSegment>,
}

/// Speech-to-text capability.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a mono 16 kHz WAV. Silent audio yields an empty payload.
    async fn transcribe(&self, audio_path: &Path) -> WorkerResult<TranscriptPayload>;
}

/// Vision description capability.
#[async_trait]
pub trait FrameDescriber: Send + Sync {
    /// Produce a short natural-language description of one frame.
    async fn describe(&self, image_path: &Path) -> WorkerResult<String>;
}

/// HTTP client configuration shared by both capability clients.
#[derive(Debug, Clone)]
pub struct CapabilityClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl CapabilityClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(300),
            max_retries: 2,
        }
    }
}

/// Transcription over an HTTP speech service.
pub struct HttpTranscriber {
    http: Client,
    config: CapabilityClientConfig,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<TranscriptSegment>,
}

impl HttpTranscriber {
    pub fn new(config: CapabilityClientConfig) -> WorkerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkerError::TranscriberFailed(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Create from `RECUT_TRANSCRIBER_ENDPOINT`.
    pub fn from_env() -> WorkerResult<Self> {
        let base_url = std::env::var("RECUT_TRANSCRIBER_ENDPOINT")
            .map_err(|_| WorkerError::TranscriberFailed("RECUT_TRANSCRIBER_ENDPOINT not set".into()))?;
        Self::new(CapabilityClientConfig::new(base_url))
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> WorkerResult<TranscriptPayload> {
        let url = format!("{}/transcribe", self.config.base_url.trim_end_matches('/'));
        let bytes = tokio::fs::read(audio_path).await?;
        debug!(url = %url, bytes = bytes.len(), "Requesting transcription");

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            let result = self
                .http
                .post(&url)
                .header("content-type", "audio/wav")
                .body(bytes.clone())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let parsed: TranscribeResponse = response
                        .json()
                        .await
                        .map_err(|e| WorkerError::TranscriberFailed(e.to_string()))?;
                    return Ok(TranscriptPayload {
                        language: parsed.language,
                        segments: parsed.segments,
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(WorkerError::TranscriberFailed(format!(
                        "{}: {}",
                        status, body
                    )));
                }
                Err(e) if attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Transcription request failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(WorkerError::TranscriberFailed(e.to_string())),
            }
        }

        Err(WorkerError::TranscriberFailed(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "retries exhausted".into()),
        ))
    }
}

/// Frame description over an HTTP vision service.
pub struct HttpFrameDescriber {
    http: Client,
    config: CapabilityClientConfig,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    description: String,
}

impl HttpFrameDescriber {
    pub fn new(config: CapabilityClientConfig) -> WorkerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkerError::DescriberFailed(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Create from `RECUT_VISION_ENDPOINT`; absence means frame description
    /// is simply not configured (it is optional enrichment).
    pub fn from_env() -> Option<WorkerResult<Self>> {
        let base_url = std::env::var("RECUT_VISION_ENDPOINT").ok()?;
        Some(Self::new(CapabilityClientConfig::new(base_url)))
    }
}

#[async_trait]
impl FrameDescriber for HttpFrameDescriber {
    async fn describe(&self, image_path: &Path) -> WorkerResult<String> {
        let url = format!("{}/describe", self.config.base_url.trim_end_matches('/'));
        let bytes = tokio::fs::read(image_path).await?;

        let response = self
            .http
            .post(&url)
            .header("content-type", "image/jpeg")
            .body(bytes)
            .send()
            .await
            .map_err(|e| WorkerError::DescriberFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(WorkerError::DescriberFailed(format!(
                "vision service returned {}",
                status
            )));
        }

        let parsed: DescribeResponse = response
            .json()
            .await
            .map_err(|e| WorkerError::DescriberFailed(e.to_string()))?;
        Ok(parsed.description)
    }
}
