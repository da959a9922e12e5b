//! Generation orchestrator: routes a prompt to a backend, extracts and
//! validates the answer, and retries with exponential backoff until the
//! code is accepted or the attempt budget runs out.
//!
//! Every attempt failure (no backend, transport error, empty answer,
//! rejected code) is retryable; only [`GenerationError::Exhausted`] leaves `generate`.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::backoff::{RetryPolicy, Sleeper, TokioSleeper};
use super::extractor::CodeExtractor;
use super::validator::{ValidationFailure, ValidationRules};
use crate::error::LlmError;
use crate::llm::{BackendKind, BackendSet, GenerationRequest, Message, ProviderRouter};

/// Why a single attempt did not produce accepted code.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error("no backend for '{technical_id}': the name matches no model family and no fallback backend is configured")]
    NoBackend { technical_id: String },

    #[error("backend '{0}' is not configured")]
    BackendUnavailable(BackendKind),

    #[error("backend call failed: {0}")]
    Backend(#[from] LlmError),

    #[error("backend returned no content")]
    EmptyResponse,

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),
}

/// Error returned by [`GenerationOrchestrator::generate`].
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation with model '{model}' failed after {attempts} attempts: {last_failure}")]
    Exhausted {
        model: String,
        attempts: u32,
        last_failure: AttemptFailure,
    },
}

impl GenerationError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn last_failure(&self) -> &AttemptFailure {
        match self {
            Self::Exhausted { last_failure, .. } => last_failure,
        }
    }
}

/// Accepted code for a (model, prompt) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedCode {
    pub model_name: String,
    pub technical_id: String,
    pub code: String,
    /// Number of attempts used, including the successful one.
    pub attempts: u32,
}

/// Tagged result of one attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Accepted,
    Retryable(AttemptFailure),
}

/// Transient record of one attempt. Logged, never persisted.
#[derive(Debug)]
pub struct GenerationAttempt {
    pub number: u32,
    pub technical_id: String,
    pub raw_output: Option<String>,
    pub extracted: Option<String>,
    pub outcome: AttemptOutcome,
}

impl GenerationAttempt {
    fn new(number: u32, technical_id: &str) -> Self {
        Self {
            number,
            technical_id: technical_id.to_string(),
            raw_output: None,
            extracted: None,
            outcome: AttemptOutcome::Accepted,
        }
    }

    fn failed(mut self, failure: impl Into<AttemptFailure>) -> Self {
        self.outcome = AttemptOutcome::Retryable(failure.into());
        self
    }
}

enum State {
    Attempting { number: u32 },
    Succeeded(GeneratedCode),
    Failed { attempts: u32, last_failure: AttemptFailure },
}

/// Produces validated source code for (model, prompt) pairs.
pub struct GenerationOrchestrator {
    router: ProviderRouter,
    backends: BackendSet,
    extractor: CodeExtractor,
    rules: ValidationRules,
    retry: RetryPolicy,
    fallback_backend: Option<BackendKind>,
    sleeper: Arc<dyn Sleeper>,
}

impl GenerationOrchestrator {
    /// Create an orchestrator with default extraction, validation and retry settings.
    pub fn new(router: ProviderRouter, backends: BackendSet) -> Self {
        Self {
            router,
            backends,
            extractor: CodeExtractor::default(),
            rules: ValidationRules::default(),
            retry: RetryPolicy::default(),
            fallback_backend: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_extractor(mut self, extractor: CodeExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Backend used for names that match no known family.
    pub fn with_fallback_backend(mut self, backend: Option<BackendKind>) -> Self {
        self.fallback_backend = backend;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Generate validated code for `prompt` with the model named `model_name`.
    pub async fn generate(
        &self,
        model_name: &str,
        prompt: &str,
    ) -> Result<GeneratedCode, GenerationError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut state = State::Attempting { number: 1 };

        loop {
            state = match state {
                State::Attempting { number } => {
                    let attempt = self.attempt(model_name, prompt, number).await;
                    debug!(
                        model = %model_name,
                        technical_id = %attempt.technical_id,
                        attempt = attempt.number,
                        raw_output = attempt.raw_output.as_deref().unwrap_or(""),
                        "Generation attempt finished"
                    );

                    match attempt.outcome {
                        AttemptOutcome::Accepted => State::Succeeded(GeneratedCode {
                            model_name: model_name.to_string(),
                            technical_id: attempt.technical_id,
                            code: attempt.extracted.unwrap_or_default(),
                            attempts: number,
                        }),
                        AttemptOutcome::Retryable(failure) if number < max_attempts => {
                            let delay = self.retry.backoff.delay_before(number + 1);
                            warn!(
                                model = %model_name,
                                attempt = number,
                                max_attempts,
                                delay_secs = delay.as_secs_f64(),
                                error = %failure,
                                "Generation attempt failed, retrying"
                            );
                            self.sleeper.sleep(delay).await;
                            State::Attempting { number: number + 1 }
                        }
                        AttemptOutcome::Retryable(failure) => State::Failed {
                            attempts: number,
                            last_failure: failure,
                        },
                    }
                }
                State::Succeeded(generated) => {
                    info!(
                        model = %generated.model_name,
                        technical_id = %generated.technical_id,
                        attempts = generated.attempts,
                        code_len = generated.code.len(),
                        "Generated code accepted"
                    );
                    return Ok(generated);
                }
                State::Failed {
                    attempts,
                    last_failure,
                } => {
                    return Err(GenerationError::Exhausted {
                        model: model_name.to_string(),
                        attempts,
                        last_failure,
                    });
                }
            };
        }
    }

    /// Run one attempt: resolve, invoke, extract, validate.
    async fn attempt(&self, model_name: &str, prompt: &str, number: u32) -> GenerationAttempt {
        let resolved = self.router.resolve(model_name);
        let mut attempt = GenerationAttempt::new(number, resolved.technical_id());

        let Some(kind) = resolved.backend().or(self.fallback_backend) else {
            return attempt.failed(AttemptFailure::NoBackend {
                technical_id: resolved.technical_id().to_string(),
            });
        };
        let Some(provider) = self.backends.get(kind) else {
            return attempt.failed(AttemptFailure::BackendUnavailable(kind));
        };

        let request = GenerationRequest::new(resolved.technical_id(), vec![Message::user(prompt)]);
        let response = match provider.generate(request).await {
            Ok(response) => response,
            Err(err) => return attempt.failed(err),
        };

        let Some(raw) = response.first_content().map(str::to_string) else {
            return attempt.failed(AttemptFailure::EmptyResponse);
        };

        let code = self.extractor.extract(&raw);
        attempt.raw_output = Some(raw);
        let verdict = self.rules.check(&code);
        attempt.extracted = Some(code);

        match verdict {
            Ok(()) => attempt,
            Err(failure) => attempt.failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerationResponse, LlmProvider, Usage};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns scripted answers in order, repeating the last one.
    struct ScriptedProvider {
        answers: Vec<Result<String, String>>,
        calls: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedProvider {
        fn new(answers: Vec<Result<&str, &str>>) -> Self {
            Self {
                answers: answers
                    .into_iter()
                    .map(|a| a.map(str::to_string).map_err(str::to_string))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("lock poisoned").len()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            let mut calls = self.calls.lock().expect("lock poisoned");
            let index = calls.len().min(self.answers.len() - 1);
            calls.push(request.clone());
            match &self.answers[index] {
                Ok(text) => Ok(GenerationResponse::single(
                    request.model,
                    text.clone(),
                    Usage::default(),
                )),
                Err(message) => Err(LlmError::RequestFailed(message.clone())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn seconds(&self) -> Vec<u64> {
            self.delays
                .lock()
                .expect("lock poisoned")
                .iter()
                .map(Duration::as_secs)
                .collect()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().expect("lock poisoned").push(duration);
        }
    }

    const VALID_ANSWER: &str =
        "Sure!\n```python\nclass Solution:\n    def solve(self):\n        return 42\n```";

    fn orchestrator(
        kind: BackendKind,
        provider: Arc<ScriptedProvider>,
        sleeper: Arc<RecordingSleeper>,
    ) -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            ProviderRouter::new(),
            BackendSet::new().with_backend(kind, provider),
        )
        .with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_always_invalid_output_exhausts_budget() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("I cannot help with that.")]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator = orchestrator(BackendKind::Chat, provider.clone(), sleeper.clone());

        let err = orchestrator
            .generate("GPT", "solve")
            .await
            .expect_err("should exhaust retries");

        assert_eq!(provider.call_count(), 5);
        assert_eq!(err.attempts(), 5);
        assert!(matches!(&err, GenerationError::Exhausted { model, .. } if model == "GPT"));
        assert!(matches!(
            err.last_failure(),
            AttemptFailure::Validation(ValidationFailure::MissingIndicators)
        ));

        let policy = orchestrator.retry_policy().backoff;
        let expected: Vec<u64> = (2..=5)
            .map(|attempt| policy.delay_before(attempt).as_secs())
            .collect();
        assert_eq!(sleeper.seconds(), expected);
        assert_eq!(sleeper.seconds(), vec![4, 4, 4, 8]);
    }

    #[tokio::test]
    async fn test_success_on_third_attempt_stops_calling() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err("connection reset"),
            Ok("def f(): 1"),
            Ok(VALID_ANSWER),
            Ok(VALID_ANSWER),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator = orchestrator(BackendKind::Chat, provider.clone(), sleeper.clone());

        let generated = orchestrator
            .generate("LLAMA", "solve")
            .await
            .expect("third attempt succeeds");

        assert_eq!(generated.attempts, 3);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(sleeper.seconds(), vec![4, 4]);
        assert_eq!(
            generated.code,
            "class Solution:\n    def solve(self):\n        return 42"
        );
        assert_eq!(generated.technical_id, "compcj/llama4-scout-ud-q2-k-xl:latest");
    }

    #[tokio::test]
    async fn test_first_attempt_success_never_sleeps() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(VALID_ANSWER)]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator =
            orchestrator(BackendKind::TextGeneration, provider.clone(), sleeper.clone());

        let generated = orchestrator.generate("Gemini", "solve").await.expect("success");

        assert_eq!(generated.attempts, 1);
        assert!(sleeper.seconds().is_empty());

        let calls = provider.calls.lock().expect("lock poisoned");
        assert_eq!(calls[0].model, "gemini-3-flash-preview");
        assert_eq!(calls[0].messages, vec![Message::user("solve")]);
    }

    #[tokio::test]
    async fn test_short_code_is_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("```python\nx = 1\n```")]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator = orchestrator(BackendKind::Chat, provider.clone(), sleeper)
            .with_retry_policy(RetryPolicy::default().with_max_attempts(2));

        let err = orchestrator.generate("deepseek", "p").await.expect_err("too short");

        assert_eq!(provider.call_count(), 2);
        assert!(matches!(
            err.last_failure(),
            AttemptFailure::Validation(ValidationFailure::TooShort { length: 5, minimum: 20 })
        ));
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried_and_reported() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err("server unreachable")]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator = orchestrator(BackendKind::Chat, provider.clone(), sleeper);

        let err = orchestrator.generate("GPT", "p").await.expect_err("fails");

        assert_eq!(provider.call_count(), 5);
        assert!(err.to_string().contains("server unreachable"));
        assert!(err.to_string().contains("after 5 attempts"));
    }

    #[tokio::test]
    async fn test_passthrough_without_fallback_fails_every_attempt() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(VALID_ANSWER)]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator = orchestrator(BackendKind::Chat, provider.clone(), sleeper.clone());

        let err = orchestrator
            .generate("unknown-model-123", "p")
            .await
            .expect_err("no route");

        assert_eq!(provider.call_count(), 0);
        assert_eq!(err.attempts(), 5);
        assert_eq!(sleeper.seconds().len(), 4);
        assert!(matches!(err.last_failure(), AttemptFailure::NoBackend { .. }));
    }

    #[tokio::test]
    async fn test_passthrough_uses_fallback_backend() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(VALID_ANSWER)]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator = orchestrator(BackendKind::Chat, provider.clone(), sleeper)
            .with_fallback_backend(Some(BackendKind::Chat));

        let generated = orchestrator
            .generate("qwen2.5-coder:7b", "p")
            .await
            .expect("fallback route");

        assert_eq!(generated.technical_id, "qwen2.5-coder:7b");
        assert_eq!(provider.calls.lock().expect("lock poisoned")[0].model, "qwen2.5-coder:7b");
    }

    #[tokio::test]
    async fn test_missing_backend_is_reported() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(VALID_ANSWER)]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator = orchestrator(BackendKind::Chat, provider, sleeper)
            .with_retry_policy(RetryPolicy::default().with_max_attempts(1));

        let err = orchestrator.generate("Gemini", "p").await.expect_err("no gemini backend");
        assert!(matches!(
            err.last_failure(),
            AttemptFailure::BackendUnavailable(BackendKind::TextGeneration)
        ));
    }

    #[tokio::test]
    async fn test_zero_attempt_budget_still_tries_once() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("nope")]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator = orchestrator(BackendKind::Chat, provider.clone(), sleeper)
            .with_retry_policy(RetryPolicy::default().with_max_attempts(0));

        let err = orchestrator.generate("GPT", "p").await.expect_err("fails");
        assert_eq!(err.attempts(), 1);
        assert_eq!(provider.call_count(), 1);
    }
}
