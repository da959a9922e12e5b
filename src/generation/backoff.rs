//! Retry budget and exponential backoff between generation attempts.

use async_trait::async_trait;
use std::time::Duration;

/// Default number of attempts per (model, prompt) pair.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Exponential backoff: `clamp(multiplier * 2^(n-1), floor, ceiling)` where
/// `n` is the number of the attempt that just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub multiplier: Duration,
    pub floor: Duration,
    pub ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            multiplier: Duration::from_secs(1),
            floor: Duration::from_secs(4),
            ceiling: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after attempt `failed_attempt` (1-based) failed.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.max(1) - 1;
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.multiplier
            .saturating_mul(factor)
            .max(self.floor)
            .min(self.ceiling)
    }

    /// Delay to wait before starting attempt `attempt`; zero for the first.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.delay_after(attempt - 1)
        }
    }
}

/// Bounded retry configuration for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Blocks the pipeline between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
