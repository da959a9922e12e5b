//! Provider-neutral request and response types for generation backends.
//!
//! Every backend integration translates these into its own wire format, so
//! callers never see the differences between chat-style and text-generation
//! protocols.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender ("user" or "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request for text generation from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Technical model identifier understood by the backend.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature. Backend default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new generation request with default parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens for this request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from an LLM generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model that generated this response.
    pub model: String,
    /// Generated choices/completions.
    pub choices: Vec<Choice>,
    /// Token usage statistics, zeroed when the backend does not report them.
    pub usage: Usage,
}

impl GenerationResponse {
    /// Build a response holding a single assistant answer.
    pub fn single(model: impl Into<String>, content: impl Into<String>, usage: Usage) -> Self {
        Self {
            model: model.into(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(content),
                finish_reason: "stop".to_string(),
            }],
            usage,
        }
    }

    /// Get the content of the first choice, if available.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// A single generated choice from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Index of this choice in the response.
    pub index: u32,
    /// Generated message.
    pub message: Message,
    /// Reason the generation stopped (e.g., "stop", "length").
    pub finish_reason: String,
}

/// Token usage statistics for a generation request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,
    /// Number of tokens generated.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Trait for LLM backends that can generate text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a response for the given request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let user = Message::user("Hello");
        assert_eq!(user.role, "user");
        assert_eq!(user.content, "Hello");

        let assistant = Message::assistant("Hi there!");
        assert_eq!(assistant.role, "assistant");
    }

    #[test]
    fn test_generation_request_builder() {
        let request = GenerationRequest::new("gpt-oss-safeguard:latest", vec![Message::user("x")])
            .with_temperature(0.2)
            .with_max_tokens(1000);

        assert_eq!(request.model, "gpt-oss-safeguard:latest");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(1000));
    }

    #[test]
    fn test_first_content() {
        let response = GenerationResponse::single("m", "Hello!", Usage::new(10, 5));
        assert_eq!(response.first_content(), Some("Hello!"));
        assert_eq!(response.usage.total_tokens, 15);

        let empty = GenerationResponse {
            model: "m".to_string(),
            choices: vec![],
            usage: Usage::default(),
        };
        assert_eq!(empty.first_content(), None);
    }

    #[test]
    fn test_usage_total_saturates() {
        let usage = Usage::new(u32::MAX - 1, 10);
        assert_eq!(usage.total_tokens, u32::MAX);
        assert_eq!(usage.prompt_tokens, u32::MAX - 1);
    }

    #[test]
    fn test_request_serialization_skips_unset_options() {
        let request = GenerationRequest::new("m", vec![Message::user("test")]);
        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(json.contains("\"model\":\"m\""));
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }
}
