//! Generation backend implementations.
//!
//! - [`OllamaChatProvider`]: chat-style requests against an Ollama server
//!   (`/api/chat`), used for the DeepSeek, GPT and LLAMA families.
//! - [`GeminiProvider`]: text-generation requests against the Gemini
//!   `generateContent` endpoint.

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiProvider;
pub use ollama::OllamaChatProvider;

// Re-export the main LlmProvider trait for convenience
pub use super::types::LlmProvider;

use std::time::Duration;

use reqwest::Client;

use crate::error::LlmError;

/// Default request timeout in seconds for backend calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Build the HTTP client shared by the providers.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::RequestFailed(format!("Failed to build HTTP client: {}", e)))
}

/// Map a non-success HTTP status and its body to an [`LlmError`].
///
/// `message` is the error text extracted from the body when the backend
/// returned a structured error, otherwise the raw body is used.
pub(crate) fn status_error(status_code: u16, message: Option<String>, raw_body: String) -> LlmError {
    let message = message.unwrap_or(raw_body);
    match status_code {
        429 => LlmError::RateLimited(message),
        404 => LlmError::ModelNotFound(message),
        code => LlmError::ApiError { code, message },
    }
}
