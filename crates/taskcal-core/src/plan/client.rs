//! Plan generation client.
//!
//! [`PlanGenerator`] is the seam between the workflow and the external
//! text-generation service. [`GeminiClient`] implements it against the
//! Google Generative Language `generateContent` REST endpoint.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::generate::{PlanRequest, build_plan_prompt};

/// Classified failure of a plan generation call.
#[derive(Debug, Error)]
pub enum PlanClientError {
    #[error("no API key configured for the plan generator")]
    MissingApiKey,

    #[error("plan generator timed out")]
    Timeout,

    #[error("plan generator request failed: {0}")]
    Transport(String),

    #[error("plan generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("plan generator response was not in the expected shape: {0}")]
    MalformedEnvelope(String),

    #[error("plan generator returned no text")]
    EmptyResponse,
}

impl PlanClientError {
    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Produces raw plan text for a [`PlanRequest`].
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<String, PlanClientError>;
}

// Compile-time assertion: PlanGenerator must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanGenerator) {}
};

/// Connection settings for [`GeminiClient`]. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// Service root, without the `/v1beta/...` path.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Upper bound for one request, connect to last byte.
    pub timeout: Duration,
}

impl GeminiConfig {
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// [`PlanGenerator`] backed by Gemini `generateContent`.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl PlanGenerator for GeminiClient {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<String, PlanClientError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(PlanClientError::MissingApiKey)?;

        let prompt = build_plan_prompt(request);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        let url = self.config.generate_content_url();

        info!(
            model = %self.config.model,
            target_tasks = request.target_task_count(),
            "calling plan generator"
        );
        debug!(prompt_len = prompt.len(), "plan prompt built");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("plan generator HTTP request failed: {e}");
                PlanClientError::from_reqwest(&e)
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            error!("failed to read plan generator response body: {e}");
            PlanClientError::from_reqwest(&e)
        })?;

        if !status.is_success() {
            error!(status = %status, "plan generator API error: {text}");
            return Err(PlanClientError::Status {
                status: status.as_u16(),
                body: truncate(&text, 512),
            });
        }

        let envelope: Value = serde_json::from_str(&text).map_err(|e| {
            error!("failed to parse plan generator response JSON: {e}");
            PlanClientError::MalformedEnvelope(format!("JSON parse error: {e}"))
        })?;

        let text = extract_candidate_text(&envelope)?;
        info!(response_len = text.len(), "plan generator responded");
        Ok(text)
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a `generateContent`
/// response.
pub fn extract_candidate_text(envelope: &Value) -> Result<String, PlanClientError> {
    let candidate = envelope
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = envelope
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str);
            if let Some(reason) = reason {
                warn!(reason, "plan generator blocked the prompt");
            }
            PlanClientError::MalformedEnvelope("response has no candidates".to_string())
        })?;

    let text = candidate
        .pointer("/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            PlanClientError::MalformedEnvelope(
                "first candidate has no text part".to_string(),
            )
        })?;

    if text.trim().is_empty() {
        return Err(PlanClientError::EmptyResponse);
    }
    Ok(text.to_string())
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
