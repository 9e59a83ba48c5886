//! Resilient chat orchestration library.
//!
//! Routes each conversational query to a structured responder, a chain of
//! generative providers, or web search, and always produces an answer.

pub mod backends;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod providers;
pub mod resilience;
pub mod response;
pub mod routing;
pub mod structured;

pub use backends::ChatSession;
pub use config::OrchestratorConfig;
pub use lifecycle::Shutdown;
pub use orchestrator::Orchestrator;
pub use response::{FallbackReason, FinalResponse};
