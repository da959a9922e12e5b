//! Gemini text-generation provider.
//!
//! Calls `POST {base}/models/{model}:generateContent`. System messages are
//! sent as `systemInstruction`; every other message becomes a `contents`
//! entry. The answer is the concatenated text of the first candidate.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{build_http_client, status_error, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::LlmError;
use crate::llm::{GenerationRequest, GenerationResponse, LlmProvider, Usage};

/// Default Gemini API endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text-generation backend for Google Gemini models.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    /// Create a provider against the public Gemini endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_base_url(
            api_key,
            GEMINI_BASE_URL,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Create a provider with a custom endpoint and timeout.
    ///
    /// Useful for testing or for regional/proxy endpoints.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey("GEMINI_API_KEY".to_string()));
        }

        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the API key (masked for logging).
    pub fn api_key_masked(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 8 {
            "*".repeat(chars.len())
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }

    fn role_to_gemini(role: &str) -> String {
        match role {
            "assistant" => "model".to_string(),
            _ => "user".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);

        let api_request = GenerateContentRequest {
            contents: request
                .messages
                .iter()
                .map(|m| Content {
                    role: Some(Self::role_to_gemini(&m.role)),
                    parts: vec![Part {
                        text: Some(m.content.clone()),
                    }],
                })
                .collect(),
            generation_config: if request.temperature.is_some() || request.max_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: request.temperature,
                    max_output_tokens: request.max_tokens,
                })
            } else {
                None
            },
        };

        tracing::debug!(model = %request.model, "Sending Gemini generateContent request");

        let http_response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .ok()
                .map(|e| e.error.message);
            return Err(status_error(status.as_u16(), message, error_text));
        }

        let api_response: GenerateContentResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse Gemini response: {}", e)))?;

        let usage = api_response
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            })
            .unwrap_or_default();

        let text = api_response.candidates.into_iter().next().map(|candidate| {
            candidate
                .content
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .filter_map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default()
        });

        Ok(match text {
            Some(text) => GenerationResponse::single(request.model, text, usage),
            None => GenerationResponse {
                model: request.model,
                choices: Vec::new(),
                usage,
            },
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
