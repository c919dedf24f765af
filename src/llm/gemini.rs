/// Gemini `generateContent` client
use super::{CompletionProvider, CompletionRequest};
use crate::config::LlmConfig;
use crate::error::{FoodcheckError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model_name: String,
    endpoint: String,
    quota_cooldown: Duration,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model_name: String) -> Self {
        Self {
            api_key,
            model_name,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            quota_cooldown: Duration::from_secs(30),
            client: Client::new(),
        }
    }

    /// Build a client from configuration, reading the API key from the configured variable
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                FoodcheckError::Config(format!(
                    "Environment variable {} is not set",
                    config.api_key_env
                ))
            })?;

        let client = Client::builder()
            .timeout(config.request_timeout()?)
            .build()
            .map_err(|e| FoodcheckError::CompletionService(e.to_string()))?;

        Ok(Self {
            api_key,
            model_name: config.model.clone(),
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            quota_cooldown: config.quota_cooldown()?,
            client,
        })
    }

    pub fn with_quota_cooldown(mut self, cooldown: Duration) -> Self {
        self.quota_cooldown = cooldown;
        self
    }

    fn build_request(request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: request.system.clone(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.user.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type: "application/json".to_string(),
            },
        }
    }

    async fn call_gemini_api(&self, request: GeminiRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model_name.trim_start_matches("models/")
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini API request failed: {}", e);
                FoodcheckError::CompletionService(format!("Request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            FoodcheckError::CompletionService(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            tracing::error!("Gemini API error: {} - {}", status, body);
            return Err(classify_failure(status, &body, self.quota_cooldown));
        }

        extract_text(&body)
    }
}

/// Map a failed HTTP exchange onto the error taxonomy
fn classify_failure(status: StatusCode, body: &str, cooldown: Duration) -> FoodcheckError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        tracing::warn!(
            "Completion quota exhausted, caller should wait {}s",
            cooldown.as_secs()
        );
        return FoodcheckError::CompletionQuotaExceeded {
            retry_after: cooldown,
        };
    }

    FoodcheckError::CompletionService(format!("API returned {} - {}", status, body))
}

/// Concatenated text parts of the first candidate
fn extract_text(body: &str) -> Result<String> {
    let response: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        tracing::error!("Failed to parse Gemini response: {}", e);
        FoodcheckError::CompletionService(format!("Failed to parse response envelope: {}", e))
    })?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(FoodcheckError::CompletionService(format!(
            "Prompt blocked: {}",
            reason
        )));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| FoodcheckError::CompletionService("No candidates returned".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(FoodcheckError::CompletionService(format!(
            "Empty completion (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

impl CompletionProvider for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        tracing::debug!(
            "Calling {} (system {} chars, user {} chars, temperature {})",
            self.model_name,
            request.system.len(),
            request.user.len(),
            request.temperature
        );
        self.call_gemini_api(Self::build_request(request)).await
    }
}
