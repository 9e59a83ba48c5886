//! Response subsystem.
//!
//! # Data Flow
//! ```text
//! Winning path output
//!     structured text | ProviderResponse (+ SearchResults) | SearchResults | canned text
//!     → assembler.rs (normalize, merge sources, attach fallback reason)
//!     → FinalResponse
//! ```

pub mod assembler;
pub mod types;

pub use assembler::ResponseAssembler;
pub use types::{provider_used, FallbackReason, FinalResponse};
