//! baseline-forge: baseline LLM solutions for programming challenges.
//!
//! This library ingests LeetCode challenges into a relational database,
//! routes each (challenge, model) pair to a chat or text-generation
//! backend, and stores the answer once it passes a code-likeness check.

pub mod catalog;
pub mod cli;
pub mod error;
pub mod generation;
pub mod llm;
pub mod pipeline;
pub mod storage;

// Re-export commonly used error types
pub use error::{CatalogError, ConfigError, LlmError};
pub use generation::GenerationError;
pub use storage::DatabaseError;
