//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! respond() span (request_id, session)
//!     → logging.rs (routing decision, provider attempts, degradations)
//!     → metrics.rs (requests by route and fallback reason, breaker state)
//!
//! Consumers:
//!     → stderr (pretty, compact or JSON; stdout stays free for answers)
//!     → Prometheus scrape endpoint, when enabled
//! ```
//!
//! # Design Decisions
//! - Every log event of a `respond` call carries its request ID
//! - Breaker transitions are logged and counted at the point they happen
//! - `RUST_LOG` overrides the configured level

pub mod logging;
pub mod metrics;
