//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a single failed call while its error is transient
//! - Space attempts with capped exponential backoff
//! - Give up immediately on permanent errors
//!
//! # Design Decisions
//! - Knows nothing about circuit breakers; the fallback chain composes both
//! - The caller decides what is retryable via a predicate
//! - No internal deadline: worst case is `max_attempts * max_delay`, callers
//!   that need a hard bound wrap the whole retry in a timeout

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Attempt budget and backoff shape for one retried call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_base: f64,
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_base: config.backoff_base,
            jitter_ratio: config.jitter_ratio,
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the retry that follows attempt `attempt_index` (0-based).
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        calculate_backoff(
            attempt_index,
            self.initial_delay,
            self.max_delay,
            self.backoff_base,
            self.jitter_ratio,
        )
    }
}

/// Run `call` until it succeeds, fails permanently, or runs out of attempts.
///
/// The last error is returned unchanged.
pub async fn execute_with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut call: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        attempt += 1;

        if !is_retryable(&err) {
            tracing::debug!(attempt, error = %err, "Permanent failure, not retrying");
            return Err(err);
        }
        if attempt >= max_attempts {
            tracing::debug!(attempt, error = %err, "Retry attempts exhausted");
            return Err(err);
        }

        let delay = policy.delay_for(attempt - 1);
        tracing::debug!(attempt, delay = ?delay, error = %err, "Retrying after transient failure");
        metrics::record_retry();
        tokio::time::sleep(delay).await;
    }
}
