//! Collaborator services consumed by the orchestrator.
//!
//! # Data Flow
//! ```text
//! Orchestrator
//!     → Classifier::classify        (intent, confidence, entities)
//!     → ContextRetriever::retrieve  (best-effort RAG context)
//!     → providers::Provider         (generative text, via the fallback chain)
//!     → SearchService::search       (web search fallback)
//! ```
//!
//! # Design Decisions
//! - Every collaborator is a trait object so tests inject scripted fakes
//! - All failures share one taxonomy (`BackendError`) with an explicit
//!   retryable/permanent split
//! - HTTP adapters live in `http.rs`; nothing else knows about the wire
//! - A missing endpoint becomes a `Disabled` collaborator, never a startup crash

pub mod error;
pub mod http;
pub mod types;

use async_trait::async_trait;

pub use error::{BackendError, BackendResult};
pub use types::{
    ChatSession, ChatTurn, Classification, Entity, GeneratedText, GenerationRequest, SearchHit,
    SearchResults, Speaker,
};

/// Breaker names of the non-provider collaborators.
pub mod dependency {
    pub const CLASSIFIER: &str = "classifier";
    pub const SEARCH: &str = "search";
    pub const CONTEXT: &str = "context";

    /// Names a provider may not use.
    pub const RESERVED: [&str; 3] = [CLASSIFIER, SEARCH, CONTEXT];
}

/// Structured-intent classifier.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str, language: &str) -> BackendResult<Classification>;
}

/// Web search fallback.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str, language: &str) -> BackendResult<SearchResults>;
}

/// RAG context assembly. `Ok(None)` means nothing relevant was found.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> BackendResult<Option<String>>;
}

/// Stand-in for a collaborator whose endpoint is not configured.
#[derive(Debug, Clone)]
pub struct Disabled {
    service: &'static str,
}

impl Disabled {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }

    fn error(&self) -> BackendError {
        BackendError::Unavailable(format!("{} is not configured", self.service))
    }
}

#[async_trait]
impl Classifier for Disabled {
    async fn classify(&self, _text: &str, _language: &str) -> BackendResult<Classification> {
        Err(self.error())
    }
}

#[async_trait]
impl SearchService for Disabled {
    async fn search(&self, _query: &str, _language: &str) -> BackendResult<SearchResults> {
        Err(self.error())
    }
}

#[async_trait]
impl ContextRetriever for Disabled {
    async fn retrieve(&self, _query: &str) -> BackendResult<Option<String>> {
        Ok(None)
    }
}
