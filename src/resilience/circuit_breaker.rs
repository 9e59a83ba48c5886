//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast with `BreakerOpen`
//! - Half-Open: recovery timeout elapsed, exactly one probe call allowed
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: checked on each call attempt, once the time since the
//!                   last failure exceeds recovery_timeout (strictly)
//! Half-Open → Closed: probe succeeds (failures reset to 0)
//! Half-Open → Open: probe fails (new last-failure timestamp, no threshold check)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency name, shared by all in-flight requests
//! - The record is guarded by a std mutex that is never held across `.await`
//! - Callers hold a `CallPermit` for the duration of the call; dropping it
//!   unsettled (cancellation, deadline) counts as a failure so the half-open
//!   probe slot is always released

use serde::Serialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;

/// Circuit state for one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time after the last failure before a probe is allowed.
    pub recovery_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Returned instead of invoking the dependency while the circuit is open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker for '{dependency}' is open (retry after {retry_after:?})")]
pub struct BreakerOpen {
    pub dependency: String,
    pub retry_after: Duration,
}

/// Outcome of a call made through [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker rejected the call; the dependency was not invoked.
    #[error(transparent)]
    Open(#[from] BreakerOpen),
    /// The dependency was invoked and failed.
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct BreakerRecord {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
    times_opened: u64,
}

/// Point-in-time view of a breaker, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub dependency: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: f64,
    pub last_failure_secs_ago: Option<f64>,
    pub times_opened: u64,
}

/// Per-dependency circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    record: Mutex<BreakerRecord>,
}

impl CircuitBreaker {
    /// Create a breaker in the Closed state.
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let settings = BreakerSettings {
            failure_threshold: settings.failure_threshold.max(1),
            ..settings
        };
        let name = name.into();
        metrics::record_breaker_state(&name, CircuitState::Closed);
        Self {
            name,
            settings,
            record: Mutex::new(BreakerRecord {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                probe_in_flight: false,
                times_opened: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    /// Stored state. An expired Open circuit only becomes Half-Open on the
    /// next call attempt.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let record = self.lock();
        BreakerSnapshot {
            dependency: self.name.clone(),
            state: record.state,
            consecutive_failures: record.consecutive_failures,
            failure_threshold: self.settings.failure_threshold,
            recovery_timeout_secs: self.settings.recovery_timeout.as_secs_f64(),
            last_failure_secs_ago: record
                .last_failure
                .map(|at| Instant::now().saturating_duration_since(at).as_secs_f64()),
            times_opened: record.times_opened,
        }
    }

    /// Ask to make one call.
    ///
    /// Moves Open → Half-Open first when the recovery timeout has elapsed.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, BreakerOpen> {
        let mut record = self.lock();

        if record.state == CircuitState::Open {
            if let Some(at) = record.last_failure {
                let elapsed = Instant::now().saturating_duration_since(at);
                if elapsed <= self.settings.recovery_timeout {
                    return Err(self.open_error(self.settings.recovery_timeout - elapsed));
                }
            }
            self.transition(&mut record, CircuitState::HalfOpen);
        }

        match record.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false)),
            CircuitState::HalfOpen if !record.probe_in_flight => {
                record.probe_in_flight = true;
                tracing::debug!(dependency = %self.name, "Allowing half-open probe");
                Ok(CallPermit::new(self, true))
            }
            _ => Err(self.open_error(Duration::ZERO)),
        }
    }

    /// Run `call` under breaker protection.
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire()?;
        match call().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(err) => {
                permit.record_failure();
                Err(BreakerError::Inner(err))
            }
        }
    }

    fn settle_success(&self, probe: bool) {
        let mut record = self.lock();
        if probe {
            record.probe_in_flight = false;
        }
        match record.state {
            CircuitState::Closed => record.consecutive_failures = 0,
            CircuitState::HalfOpen if probe => {
                record.consecutive_failures = 0;
                self.transition(&mut record, CircuitState::Closed);
            }
            // A call admitted before the circuit opened says nothing about recovery.
            _ => {}
        }
    }

    fn settle_failure(&self, probe: bool) {
        let mut record = self.lock();
        let now = Instant::now();
        if probe {
            record.probe_in_flight = false;
        }
        match record.state {
            CircuitState::Closed => {
                record.consecutive_failures += 1;
                record.last_failure = Some(now);
                if record.consecutive_failures >= self.settings.failure_threshold {
                    self.transition(&mut record, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen if probe => {
                record.last_failure = Some(now);
                self.transition(&mut record, CircuitState::Open);
            }
            _ => {
                record.consecutive_failures = record.consecutive_failures.saturating_add(1);
            }
        }
    }

    fn transition(&self, record: &mut BreakerRecord, to: CircuitState) {
        let from = record.state;
        record.state = to;
        if to == CircuitState::Open {
            record.times_opened += 1;
            tracing::warn!(
                dependency = %self.name,
                from = %from,
                consecutive_failures = record.consecutive_failures,
                recovery_timeout = ?self.settings.recovery_timeout,
                "Circuit opened"
            );
        } else {
            tracing::info!(dependency = %self.name, from = %from, to = %to, "Circuit state changed");
        }
        metrics::record_breaker_transition(&self.name, to);
    }

    fn open_error(&self, retry_after: Duration) -> BreakerOpen {
        BreakerOpen {
            dependency: self.name.clone(),
            retry_after,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admission to call the dependency once. Settle it with the outcome.
#[derive(Debug)]
#[must_use = "an unsettled permit is recorded as a failure when dropped"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    /// True when this permit is the single Half-Open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.settle_success(self.probe);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.settle_failure(self.probe);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(
                dependency = %self.breaker.name,
                probe = self.probe,
                "Call abandoned before completion, counting as failure"
            );
            self.breaker.settle_failure(self.probe);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn breaker(threshold: u32, recovery_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "provider-a",
            BreakerSettings {
                failure_threshold: threshold,
                recovery_timeout: Duration::from_secs(recovery_secs),
            },
        )
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.execute(|| async { Err::<(), _>("boom") }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_starts_closed() {
        let cb = breaker(3, 60);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_opens_exactly_at_threshold() {
        let cb = breaker(3, 60);

        for expected in 1..3 {
            assert!(matches!(fail(&cb).await, Err(BreakerError::Inner("boom"))));
            assert_eq!(cb.state(), CircuitState::Closed);
            assert_eq!(cb.consecutive_failures(), expected);
        }

        assert!(matches!(fail(&cb).await, Err(BreakerError::Inner(_))));
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.snapshot().times_opened, 1);

        // Further attempts are rejected and do not re-open.
        assert!(matches!(fail(&cb).await, Err(BreakerError::Open(_))));
        assert_eq!(cb.snapshot().times_opened, 1);
        assert!(cb.consecutive_failures() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failures() {
        let cb = breaker(3, 60);
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        let ok: Result<u32, BreakerError<&str>> = cb.execute(|| async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(cb.consecutive_failures(), 0);
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_invoking() {
        let cb = breaker(1, 60);
        let _ = fail(&cb).await;

        let calls = AtomicU32::new(0);
        tokio::time::advance(Duration::from_secs(30)).await;
        let result: Result<(), BreakerError<&str>> = cb
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        match result {
            Err(BreakerError::Open(open)) => {
                assert_eq!(open.dependency, "provider-a");
                assert_eq!(open.retry_after, Duration::from_secs(30));
            }
            other => panic!("expected open rejection, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_probe_invokes_once_and_closes() {
        let cb = breaker(2, 60);
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(61)).await;
        // Stored state only moves on the next attempt.
        assert_eq!(cb.state(), CircuitState::Open);

        let calls = AtomicU32::new(0);
        let result: Result<(), BreakerError<&str>> = cb
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_allows_single_probe() {
        let cb = breaker(1, 10);
        let _ = fail(&cb).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let probe = cb.try_acquire().expect("probe should be admitted");
        assert!(probe.is_probe());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // A concurrent caller during the probe window is rejected.
        assert!(cb.try_acquire().is_err());

        probe.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.snapshot().times_opened, 2);

        // The failed probe restarted the recovery window.
        assert!(cb.try_acquire().is_err());
        tokio::time::advance(Duration::from_secs(11)).await;
        let probe = cb.try_acquire().expect("second probe");
        probe.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_probe_reopens_circuit() {
        let cb = breaker(1, 5);
        let _ = fail(&cb).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        {
            let _probe = cb.try_acquire().unwrap();
        }

        assert_eq!(cb.state(), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cb.try_acquire().is_ok(), "probe slot must be released");
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_timeout_boundary_still_rejects() {
        let cb = breaker(1, 10);
        let _ = fail(&cb).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        let rejected = cb.try_acquire().map(|_| ()).unwrap_err();
        assert_eq!(rejected.retry_after, Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(1)).await;
        let permit = cb.try_acquire().expect("admitted once the timeout is exceeded");
        assert!(permit.is_probe());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_success_does_not_close_open_circuit() {
        let cb = breaker(1, 60);
        let early = cb.try_acquire().unwrap();
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        early.record_success();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.consecutive_failures() >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_not_lost() {
        let cb = Arc::new(breaker(10_000, 60));
        let mut handles = Vec::new();
        for _ in 0..200 {
            let cb = cb.clone();
            handles.push(tokio::spawn(async move {
                let permit = cb.try_acquire().unwrap();
                tokio::task::yield_now().await;
                permit.record_failure();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cb.consecutive_failures(), 200);
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
