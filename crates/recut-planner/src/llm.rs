//! External story model client.
//!
//! The model receives the deterministic envelope and must return exactly the
//! planner JSON contract. Parse failures surface as structured errors; the
//! client itself never retries a bad plan (the supervisor owns that policy).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use recut_models::TokenUsage;

use crate::error::{PlannerError, PlannerResult};
use crate::prompt::PromptEnvelope;

/// Raw EDL segment exactly as the model emits it. Unknown fields are
/// dropped on deserialisation; timestamps may also arrive as timecode
/// strings and are normalised by the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: serde_json::Value,
    pub end: serde_json::Value,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub transition_kind: Option<String>,
    #[serde(default)]
    pub transition_duration: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStoryArc {
    pub hook_t: f64,
    pub climax_t: f64,
    pub resolution_t: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawKeyMoment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub importance: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransition {
    pub from: f64,
    pub to: f64,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecommendation {
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// The full raw plan per the planner JSON contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlan {
    #[serde(default)]
    pub story_arc: Option<RawStoryArc>,
    #[serde(default)]
    pub key_moments: Vec<RawKeyMoment>,
    #[serde(default)]
    pub edl: Vec<RawSegment>,
    #[serde(default)]
    pub transitions: Vec<RawTransition>,
    #[serde(default)]
    pub recommendations: Vec<RawRecommendation>,
}

/// A parsed model response plus accounting.
#[derive(Debug, Clone)]
pub struct ModelPlanResponse {
    pub plan: RawPlan,
    pub model: String,
    pub token_usage: TokenUsage,
}

/// Capability interface for the external planning model.
#[async_trait]
pub trait StoryModel: Send + Sync {
    async fn generate_plan(&self, envelope: &PromptEnvelope) -> PlannerResult<ModelPlanResponse>;
}

/// HTTP story model client. Speaks a `generateContent`-style API: system +
/// user text in, JSON-mime response out, usage metadata on the side.
pub struct HttpStoryModel {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    #[serde(rename = "systemInstruction")]
    system_instruction: ContentRef<'a>,
    contents: Vec<ContentRef<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct ContentRef<'a> {
    parts: Vec<PartRef<'a>>,
}

#[derive(Debug, Serialize)]
struct PartRef<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata", default)]
    usage: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}

impl HttpStoryModel {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        timeout: Duration,
    ) -> PlannerResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            client,
        })
    }

    /// Create from `RECUT_MODEL_ENDPOINT` / `RECUT_MODEL_API_KEY` /
    /// `RECUT_MODEL_NAME`.
    pub fn from_env(temperature: f64) -> PlannerResult<Self> {
        let endpoint = std::env::var("RECUT_MODEL_ENDPOINT")
            .map_err(|_| PlannerError::RequestFailed("RECUT_MODEL_ENDPOINT not set".into()))?;
        let api_key = std::env::var("RECUT_MODEL_API_KEY")
            .map_err(|_| PlannerError::RequestFailed("RECUT_MODEL_API_KEY not set".into()))?;
        let model =
            std::env::var("RECUT_MODEL_NAME").unwrap_or_else(|_| "planner-default".to_string());
        Self::new(endpoint, api_key, model, temperature, Duration::from_secs(120))
    }
}

#[async_trait]
impl StoryModel for HttpStoryModel {
    async fn generate_plan(&self, envelope: &PromptEnvelope) -> PlannerResult<ModelPlanResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );

        let request = GenerateRequest {
            system_instruction: ContentRef {
                parts: vec![PartRef {
                    text: &envelope.system,
                }],
            },
            contents: vec![ContentRef {
                parts: vec![PartRef {
                    text: &envelope.user,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: self.temperature,
            },
        };

        debug!(url = %url, model = %self.model, "Requesting story plan");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlannerError::ModelTimeout
                } else {
                    PlannerError::Http(e)
                }
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(PlannerError::ModelRateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                warn!(%status, "Story model returned an error");
                return Err(PlannerError::RequestFailed(format!("{}: {}", status, body)));
            }
            _ => {}
        }

        let parsed: GenerateResponse = response.json().await?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| PlannerError::MalformedResponse("no candidates returned".into()))?;

        let plan = parse_plan_text(text)?;

        let token_usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(ModelPlanResponse {
            plan,
            model: self.model.clone(),
            token_usage,
        })
    }
}

/// Parse the model's text as a `RawPlan`, tolerating a fenced code block
/// around the JSON but nothing else.
pub fn parse_plan_text(text: &str) -> PlannerResult<RawPlan> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| PlannerError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contract_shape() {
        let text = r#"{
            "story_arc": {"hook_t": 1.0, "climax_t": 20.0, "resolution_t": 28.0},
            "key_moments": [{"start": 1.0, "end": 3.0, "importance": "high", "role": "hook", "reason": "opening"}],
            "edl": [{"start": 0.0, "end": 10.0, "kind": "keep", "reason": "hook"}],
            "transitions": [],
            "recommendations": [{"message": "add captions", "priority": "medium"}]
        }"#;
        let plan = parse_plan_text(text).unwrap();
        assert_eq!(plan.edl.len(), 1);
        assert!(plan.story_arc.is_some());
        assert_eq!(plan.recommendations.len(), 1);
    }

    #[test]
    fn test_parse_tolerates_fenced_block() {
        let text = "```json\n{\"edl\": []}\n```";
        let plan = parse_plan_text(text).unwrap();
        assert!(plan.edl.is_empty());
    }

    #[test]
    fn test_parse_rejects_prose() {
        let text = "Here is your plan: {\"edl\": []}";
        assert!(matches!(
            parse_plan_text(text),
            Err(PlannerError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let text = r#"{"edl": [{"start": 0, "end": 5, "kind": "keep", "vibe": "good"}], "extra": 1}"#;
        let plan = parse_plan_text(text).unwrap();
        assert_eq!(plan.edl.len(), 1);
    }
}
