//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, apply CHAT_ORCHESTRATOR_* overrides)
//!     → validation.rs (semantic checks)
//!     → OrchestratorConfig (validated, immutable)
//!     → startup wires collaborators from it
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → routing section swapped into the running orchestrator
//! ```
//!
//! # Design Decisions
//! - Only routing is hot-reloadable; providers and breakers live for the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BreakerConfig, ComplexityConfig, LogFormat, ObservabilityConfig, OrchestratorConfig,
    ProviderConfig, ResponseConfig, RetryConfig, RoutingConfig, ServicesConfig, StructuredConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
