//! LLM integration for baseline-forge.
//!
//! This module provides the provider-neutral request types, the two backend
//! integrations (Ollama chat and Gemini text generation) and the router that
//! maps logical model names onto them.
//!
//! ```ignore
//! use baseline_forge::llm::{BackendKind, BackendSet, OllamaChatProvider, ProviderRouter};
//! use std::sync::Arc;
//!
//! let router = ProviderRouter::new();
//! let resolved = router.resolve("GPT");
//! assert_eq!(resolved.backend(), Some(BackendKind::Chat));
//!
//! let backends = BackendSet::new()
//!     .with_backend(BackendKind::Chat, Arc::new(OllamaChatProvider::new("http://localhost:11434")?));
//! ```

pub mod providers;
pub mod router;
pub mod types;

pub use providers::{GeminiProvider, OllamaChatProvider};
pub use router::{BackendKind, BackendSet, ModelFamily, ProviderRouter, ResolvedModel, ROUTING_ORDER};
pub use types::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};
