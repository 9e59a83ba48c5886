//! Request orchestration.
//!
//! # Data Flow
//! ```text
//! respond(query, session)
//!     → validate query (empty / oversized → canned, invalid_query)
//!     → classifier (own breaker; any failure → confidence 0.0)
//!     → ConfidenceRouter::decide
//!         STRUCTURED             → StructuredResponder
//!                                  ↳ failure: GENERATIVE once (structured_path_failed)
//!         GENERATIVE             → context → FallbackChain
//!                                  ↳ exhausted: search (search_fallback_used)
//!                                  ↳ search failed: canned (all_providers_exhausted)
//!         GENERATIVE_WITH_SEARCH → context → FallbackChain ∥ search
//!                                  ↳ chain ok: merge search (classifier_low_confidence)
//!                                  ↳ exhausted: search, else canned
//!     → ResponseAssembler → FinalResponse
//! ```
//!
//! # Design Decisions
//! - `respond` has no error type; every failure ends in a degraded answer
//! - One deadline per request covers classification, context, chain and search
//! - The router sits behind `ArcSwap` so reloads never block requests

mod builder;
mod pipeline;

pub use builder::OrchestratorBuilder;
pub use pipeline::Orchestrator;

use std::sync::Arc;

use crate::resilience::BreakerRegistry;

impl Orchestrator {
    pub fn builder(registry: Arc<BreakerRegistry>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(registry)
    }
}
