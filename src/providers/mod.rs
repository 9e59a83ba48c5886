//! Generative provider subsystem.
//!
//! # Data Flow
//! ```text
//! GenerationRequest (query, context, history)
//!     → chain.rs (providers in priority order)
//!         → breaker open? skip, not an attempt
//!         → breaker admits → retry policy → Provider::generate
//!         → success: stop; failure: breaker records it, next provider
//!     → ChainOutcome::Success(ProviderResponse) | ChainOutcome::Exhausted
//! ```
//!
//! # Design Decisions
//! - Providers are trait objects in an ordered list; no string-keyed dispatch
//! - Descriptors are immutable after load
//! - One breaker per provider, shared through the registry

pub mod chain;
pub mod descriptor;

use async_trait::async_trait;

use crate::backends::{BackendResult, GeneratedText, GenerationRequest};

pub use chain::{
    AttemptOutcome, AttemptRecord, ChainOutcome, ChainReport, FallbackChain, ProviderResponse,
};
pub use descriptor::ProviderDescriptor;

/// A generative text backend.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> BackendResult<GeneratedText>;
}
