//! Baseline code generation.
//!
//! A prompt goes to a routed backend; the answer is stripped of markdown
//! fencing, checked by the validator, and retried with exponential backoff
//! until accepted or the attempt budget runs out.

pub mod backoff;
pub mod extractor;
pub mod orchestrator;
pub mod prompt;
pub mod validator;

pub use backoff::{BackoffPolicy, RetryPolicy, Sleeper, TokioSleeper, DEFAULT_MAX_ATTEMPTS};
pub use extractor::{extract_code, CodeExtractor, CODE_FENCE, DEFAULT_LANGUAGE_TAG};
pub use orchestrator::{
    AttemptFailure, AttemptOutcome, GeneratedCode, GenerationAttempt, GenerationError,
    GenerationOrchestrator,
};
pub use prompt::{build_baseline_prompt, BASELINE_INSTRUCTIONS};
pub use validator::{
    looks_like_code, ValidationFailure, ValidationRules, DEFAULT_MIN_ACCEPTED_LENGTH,
    DEFAULT_STRUCTURAL_INDICATORS,
};
