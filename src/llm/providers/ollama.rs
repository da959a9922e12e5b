//! Ollama chat provider.
//!
//! Sends single-shot, non-streaming chat requests to `POST {base}/api/chat`.
//! Cloud-hosted models (`*:cloud`) go through the same local server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{build_http_client, status_error, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::LlmError;
use crate::llm::{GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};

/// Default Ollama server address.
pub const OLLAMA_DEFAULT_HOST: &str = "http://localhost:11434";

/// Chat-style backend talking to an Ollama server.
pub struct OllamaChatProvider {
    /// HTTP client for making API requests.
    client: Client,
    /// Base URL of the Ollama server.
    base_url: String,
}

impl OllamaChatProvider {
    /// Create a provider for the given server address with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Create a provider with an explicit per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmProvider for OllamaChatProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        let api_request = ChatRequest {
            model: request.model.clone(),
            messages: request.messages,
            stream: false,
            options: if request.temperature.is_some() || request.max_tokens.is_some() {
                Some(ChatOptions {
                    temperature: request.temperature,
                    num_predict: request.max_tokens,
                })
            } else {
                None
            },
        };

        tracing::debug!(model = %request.model, url = %url, "Sending Ollama chat request");

        let http_response = self
            .client
            .post(&url)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::RequestFailed(format!(
                        "Ollama server not reachable at {}: {}",
                        self.base_url, e
                    ))
                } else {
                    LlmError::RequestFailed(e.to_string())
                }
            })?;

        let status = http_response.status();

        if !status.is_success() {
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .ok()
                .map(|e| e.error);
            return Err(status_error(status.as_u16(), message, error_text));
        }

        let api_response: ChatResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        if let Some(error) = api_response.error {
            return Err(LlmError::ApiError {
                code: status.as_u16(),
                message: error,
            });
        }

        let usage = Usage::new(
            api_response.prompt_eval_count.unwrap_or(0),
            api_response.eval_count.unwrap_or(0),
        );
        let model = api_response.model.unwrap_or(request.model);

        Ok(match api_response.message {
            Some(message) => GenerationResponse::single(model, message.content, usage),
            None => GenerationResponse {
                model,
                choices: Vec::new(),
                usage,
            },
        })
    }
}

/// Request body for `/api/chat`.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response body for a non-streaming `/api/chat` call.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    message: Option<Message>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}
