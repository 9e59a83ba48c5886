//! Metrics collection and exposition.
//!
//! # Metrics
//! - `orchestrator_requests_total` (counter): responses by route, fallback_reason
//! - `orchestrator_request_duration_seconds` (histogram): end-to-end latency
//! - `orchestrator_provider_calls_total` (counter): provider attempts by provider, outcome
//! - `orchestrator_retries_total` (counter): retry sleeps taken
//! - `orchestrator_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `orchestrator_breaker_transitions_total` (counter): transitions by dependency, to
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op, so tests need no setup
//! - Prometheus exposition is opt-in via config

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tokio::time::Instant;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(route: &str, fallback_reason: Option<&str>, start: Instant) {
    counter!(
        "orchestrator_requests_total",
        "route" => route.to_string(),
        "fallback_reason" => fallback_reason.unwrap_or("none").to_string()
    )
    .increment(1);
    histogram!("orchestrator_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_provider_call(provider: &str, outcome: &str) {
    counter!(
        "orchestrator_provider_calls_total",
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_retry() {
    counter!("orchestrator_retries_total").increment(1);
}

pub fn record_breaker_state(dependency: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("orchestrator_breaker_state", "dependency" => dependency.to_string()).set(value);
}

pub fn record_breaker_transition(dependency: &str, to: CircuitState) {
    counter!(
        "orchestrator_breaker_transitions_total",
        "dependency" => dependency.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    record_breaker_state(dependency, to);
}
