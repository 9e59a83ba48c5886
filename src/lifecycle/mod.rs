//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Registry → Collaborators → Chain → Orchestrator
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → loops finish their current request → Exit
//!
//! Signals (signals.rs):
//!     Ctrl-C → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then breakers, then collaborators
//! - Fail fast: an invalid config never produces an orchestrator

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_orchestrator, StartupError};
