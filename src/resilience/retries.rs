//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is retryable
//! - Execute attempts with exponential backoff between them
//! - Report how many attempts were spent
//!
//! # Design Decisions
//! - `max_attempts` counts the first call
//! - No retryable status codes configured → every call failure is retried
//! - No sleep after the final attempt; the last error is returned unchanged
//! - Backoff sleeps hold no locks

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::GatewayError;
use crate::resilience::backoff::{apply_jitter, calculate_backoff};

/// Retry behaviour for one route.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

/// Result of running an operation under a policy.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, GatewayError>,
    /// Attempts made, the first one included.
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Policy making exactly one attempt.
    pub fn single_attempt() -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        })
    }

    pub fn from_route(config: Option<&RetryConfig>) -> Self {
        config.cloned().map(Self::new).unwrap_or_else(Self::single_attempt)
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Whether `error` after attempt number `attempt` (1-based) warrants another try.
    pub fn should_retry(&self, attempt: u32, error: &GatewayError) -> bool {
        attempt < self.max_attempts()
            && error.is_retryable(self.config.retryable_status_codes.as_deref())
    }

    /// Delay after attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = calculate_backoff(
            attempt,
            self.config.initial_delay_ms,
            self.config.backoff_multiplier,
            self.config.max_delay_ms,
        );
        if self.config.jitter {
            apply_jitter(delay, self.config.max_delay_ms)
        } else {
            delay
        }
    }

    /// Run `operation` until it succeeds, fails for good or attempts run out.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(error) if self.should_retry(attempt, &error) => {
                    let delay = self.delay_after(attempt);
                    tracing::info!(attempt, delay = ?delay, error = %error, "Retrying request");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    if attempt > 1 {
                        tracing::warn!(attempts = attempt, error = %error, "Retries exhausted");
                    }
                    return RetryOutcome {
                        result: Err(error),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
