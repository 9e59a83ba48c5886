//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → registry.rs (look up the dependency's breaker)
//!     → circuit_breaker.rs (admit, or reject with BreakerOpen)
//!     → retries.rs (retry transient failures with backoff.rs delays)
//!     → timeouts.rs (bound each attempt and the whole request)
//!     → outcome settles the breaker permit
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Retry and breaker are independent layers; callers compose them
//! - Breaker state is shared across requests, retry state never is
//! - Cancellation is a failure, never a silent leak of the probe slot

pub mod backoff;
pub mod circuit_breaker;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerError, BreakerOpen, BreakerSettings, BreakerSnapshot, CallPermit, CircuitBreaker,
    CircuitState,
};
pub use registry::BreakerRegistry;
pub use retries::{execute_with_retry, RetryPolicy};
pub use timeouts::{with_timeout, Deadline};
