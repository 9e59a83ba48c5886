//! Structured (template) responses.
//!
//! # Data Flow
//! ```text
//! Classification (intent, entities) + session language
//!     → template.rs (template for intent, fill {entity_type} slots)
//!     → Ok(text) | Err(Unsupported) → router degrades to generative
//!
//! Total exhaustion:
//!     → canned_response(language) (always available, no I/O)
//! ```
//!
//! # Design Decisions
//! - A template with an unfilled slot is a failure, not a half-rendered answer
//! - The canned response never fails; it is the floor of every request

pub mod template;

use async_trait::async_trait;

use crate::backends::{BackendResult, ChatSession, Classification};

pub use template::TemplateResponder;

/// Answers recognized intents without a generative model.
#[async_trait]
pub trait StructuredResponder: Send + Sync {
    async fn respond(
        &self,
        classification: &Classification,
        session: &ChatSession,
    ) -> BackendResult<String>;

    /// Generic answer used when nothing else worked.
    fn canned_response(&self, language: &str) -> String;
}
