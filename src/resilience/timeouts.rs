//! Timeout enforcement.
//!
//! # Responsibilities
//! - Carry one request-wide deadline through every dependency call
//! - Bound each individual call by the smaller of its own limit and the
//!   time left on the deadline
//!
//! # Design Decisions
//! - Uses Tokio's clock so paused-time tests drive expiry
//! - Expiry cancels the in-flight future; breaker permits record the failure
//!   on drop
//! - Timeout errors map to the retryable `BackendError::Timeout`

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::backends::{BackendError, BackendResult};

/// Point in time after which a request stops consulting dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Limit for one call: `cap`, shortened to what is left on the deadline.
    pub fn budget(&self, cap: Duration) -> Duration {
        cap.min(self.remaining())
    }
}

/// Run `call`, failing with `BackendError::Timeout(limit)` if it takes longer.
pub async fn with_timeout<T, Fut>(limit: Duration, call: Fut) -> BackendResult<T>
where
    Fut: Future<Output = BackendResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_counts_down() {
        let deadline = Deadline::after(Duration::from_secs(10));
        assert_eq!(deadline.remaining(), Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(deadline.remaining(), Duration::from_secs(6));
        assert_eq!(deadline.budget(Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(deadline.budget(Duration::from_secs(8)), Duration::from_secs(6));

        tokio::time::advance(Duration::from_secs(7)).await;
        assert!(deadline.is_expired());
        assert_eq!(deadline.budget(Duration::from_secs(2)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_maps_elapsed() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, BackendError>("late")
        };
        let result = with_timeout(Duration::from_secs(1), slow).await;
        assert_eq!(result, Err(BackendError::Timeout(Duration::from_secs(1))));

        let fast = async { Ok::<_, BackendError>("ok") };
        assert_eq!(with_timeout(Duration::from_secs(1), fast).await, Ok("ok"));
    }
}
