//! Pipeline configuration.
//!
//! Backend endpoints, retry tuning and request pacing, loaded from the
//! environment and overridable per run by the CLI.

use std::time::Duration;

use crate::catalog::DEFAULT_PER_DIFFICULTY_LIMIT;
use crate::error::ConfigError;
use crate::generation::{
    BackoffPolicy, RetryPolicy, ValidationRules, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_ACCEPTED_LENGTH,
};
use crate::llm::providers::gemini::GEMINI_BASE_URL;
use crate::llm::providers::ollama::OLLAMA_DEFAULT_HOST;
use crate::llm::providers::DEFAULT_REQUEST_TIMEOUT_SECS;

/// Default pause between catalog statement requests.
pub const DEFAULT_CATALOG_REQUEST_DELAY_MS: u64 = 600;

/// Configuration for ingestion and generation runs.
#[derive(Clone)]
pub struct PipelineConfig {
    // Backend settings
    /// Ollama server address for the chat backend.
    pub ollama_host: String,
    /// Gemini API key; the text-generation backend is disabled without it.
    pub gemini_api_key: Option<String>,
    /// Gemini REST base URL.
    pub gemini_api_base: String,
    /// Per-request HTTP timeout for both backends.
    pub request_timeout: Duration,

    // Generation settings
    pub max_attempts: u32,
    pub min_code_length: usize,
    pub backoff_floor: Duration,
    pub backoff_ceiling: Duration,
    /// Fixed pause between (challenge, model) pairs.
    pub pair_delay: Duration,

    // Catalog settings
    pub catalog_request_delay: Duration,
    pub per_difficulty_limit: usize,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("ollama_host", &self.ollama_host)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "***"),
            )
            .field("gemini_api_base", &self.gemini_api_base)
            .field("request_timeout", &self.request_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("min_code_length", &self.min_code_length)
            .field("backoff_floor", &self.backoff_floor)
            .field("backoff_ceiling", &self.backoff_ceiling)
            .field("pair_delay", &self.pair_delay)
            .field("catalog_request_delay", &self.catalog_request_delay)
            .field("per_difficulty_limit", &self.per_difficulty_limit)
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let backoff = BackoffPolicy::default();
        Self {
            ollama_host: OLLAMA_DEFAULT_HOST.to_string(),
            gemini_api_key: None,
            gemini_api_base: GEMINI_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),

            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_code_length: DEFAULT_MIN_ACCEPTED_LENGTH,
            backoff_floor: backoff.floor,
            backoff_ceiling: backoff.ceiling,
            pair_delay: Duration::ZERO,

            catalog_request_delay: Duration::from_millis(DEFAULT_CATALOG_REQUEST_DELAY_MS),
            per_difficulty_limit: DEFAULT_PER_DIFFICULTY_LIMIT,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OLLAMA_HOST`: Ollama server address (default: http://localhost:11434)
    /// - `GEMINI_API_KEY`: Gemini API key (optional)
    /// - `GEMINI_API_BASE`: Gemini REST base URL
    /// - `LLM_REQUEST_TIMEOUT_SECS`: Backend request timeout (default: 300)
    /// - `GENERATION_MAX_ATTEMPTS`: Attempts per pair (default: 5)
    /// - `GENERATION_MIN_CODE_LENGTH`: Minimum accepted code length (default: 20)
    /// - `GENERATION_BACKOFF_FLOOR_SECS`: Minimum retry wait (default: 4)
    /// - `GENERATION_BACKOFF_CEILING_SECS`: Maximum retry wait (default: 10)
    /// - `CATALOG_REQUEST_DELAY_MS`: Pause between statement requests (default: 600)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Backend settings
        if let Some(val) = lookup("OLLAMA_HOST") {
            config.ollama_host = normalize_host(&val);
        }

        config.gemini_api_key = lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty());

        if let Some(val) = lookup("GEMINI_API_BASE") {
            config.gemini_api_base = val;
        }

        if let Some(val) = lookup("LLM_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "LLM_REQUEST_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        // Generation settings
        if let Some(val) = lookup("GENERATION_MAX_ATTEMPTS") {
            config.max_attempts = parse_env_value(&val, "GENERATION_MAX_ATTEMPTS")?;
        }

        if let Some(val) = lookup("GENERATION_MIN_CODE_LENGTH") {
            config.min_code_length = parse_env_value(&val, "GENERATION_MIN_CODE_LENGTH")?;
        }

        if let Some(val) = lookup("GENERATION_BACKOFF_FLOOR_SECS") {
            let secs: u64 = parse_env_value(&val, "GENERATION_BACKOFF_FLOOR_SECS")?;
            config.backoff_floor = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("GENERATION_BACKOFF_CEILING_SECS") {
            let secs: u64 = parse_env_value(&val, "GENERATION_BACKOFF_CEILING_SECS")?;
            config.backoff_ceiling = Duration::from_secs(secs);
        }

        // Catalog settings
        if let Some(val) = lookup("CATALOG_REQUEST_DELAY_MS") {
            let ms: u64 = parse_env_value(&val, "CATALOG_REQUEST_DELAY_MS")?;
            config.catalog_request_delay = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ollama_host.starts_with("http://") || self.ollama_host.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "ollama_host must be an http(s) URL, got '{}'",
                self.ollama_host
            )));
        }

        if self.gemini_api_base.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "gemini_api_base cannot be empty".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.backoff_floor > self.backoff_ceiling {
            return Err(ConfigError::ValidationFailed(
                "backoff_floor cannot exceed backoff_ceiling".to_string(),
            ));
        }

        if self.per_difficulty_limit == 0 {
            return Err(ConfigError::ValidationFailed(
                "per_difficulty_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Retry policy derived from the generation settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(BackoffPolicy {
                floor: self.backoff_floor,
                ceiling: self.backoff_ceiling,
                ..BackoffPolicy::default()
            })
    }

    /// Validation rules with the configured minimum length.
    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules::default().with_min_length(self.min_code_length)
    }

    pub fn with_ollama_host(mut self, host: impl Into<String>) -> Self {
        self.ollama_host = normalize_host(&host.into());
        self
    }

    pub fn with_gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(key.into());
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_pair_delay(mut self, delay: Duration) -> Self {
        self.pair_delay = delay;
        self
    }

    pub fn with_catalog_request_delay(mut self, delay: Duration) -> Self {
        self.catalog_request_delay = delay;
        self
    }

    pub fn with_per_difficulty_limit(mut self, limit: usize) -> Self {
        self.per_difficulty_limit = limit;
        self
    }
}

/// `OLLAMA_HOST` is often given as `host:port`; default to plain http.
fn normalize_host(value: &str) -> String {
    let value = value.trim().trim_end_matches('/');
    if value.starts_with("http://") || value.starts_with("https://") {
        value.to_string()
    } else {
        format!("http://{}", value)
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.ollama_host, "http://localhost:11434");
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.min_code_length, 20);
        assert_eq!(config.catalog_request_delay, Duration::from_millis(600));
        assert_eq!(config.per_difficulty_limit, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_all_keys() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("OLLAMA_HOST", "ollama.internal:11434"),
            ("GEMINI_API_KEY", "key-123"),
            ("LLM_REQUEST_TIMEOUT_SECS", "30"),
            ("GENERATION_MAX_ATTEMPTS", "3"),
            ("GENERATION_MIN_CODE_LENGTH", "40"),
            ("GENERATION_BACKOFF_FLOOR_SECS", "1"),
            ("GENERATION_BACKOFF_CEILING_SECS", "2"),
            ("CATALOG_REQUEST_DELAY_MS", "0"),
        ]))
        .expect("valid config");

        assert_eq!(config.ollama_host, "http://ollama.internal:11434");
        assert_eq!(config.gemini_api_key.as_deref(), Some("key-123"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.retry_policy().max_attempts, 3);
        assert_eq!(config.retry_policy().backoff.ceiling, Duration::from_secs(2));
        assert_eq!(config.validation_rules().min_accepted_length, 40);
        assert!(config.catalog_request_delay.is_zero());
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config =
            PipelineConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "  ")])).expect("config");
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("GENERATION_MAX_ATTEMPTS", "many")]))
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "GENERATION_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_validation_failures() {
        assert!(PipelineConfig::default()
            .with_max_attempts(0)
            .validate()
            .is_err());

        let err = PipelineConfig::from_lookup(lookup_from(&[
            ("GENERATION_BACKOFF_FLOOR_SECS", "20"),
            ("GENERATION_BACKOFF_CEILING_SECS", "10"),
        ]))
        .expect_err("floor above ceiling");
        assert!(err.to_string().contains("backoff_floor"));
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = PipelineConfig::default().with_gemini_api_key("super-secret");
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn test_default_retry_policy_matches_generation_defaults() {
        assert_eq!(PipelineConfig::default().retry_policy(), RetryPolicy::default());
    }
}
