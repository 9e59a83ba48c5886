//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Classification (intent, confidence, entities) + query text
//!     → complexity.rs (length / keyword / question-mark rules)
//!     → router.rs (decision table)
//!     → Return: RoutingDecision (route target + matched rule)
//! ```
//!
//! # Design Decisions
//! - Thresholds are configuration, swapped as a whole on reload
//! - No regex in the hot path (word-boundary scan only)
//! - Deterministic: same input always gives the same route
//! - First match wins (decision table order)

pub mod complexity;
pub mod decision;
pub mod router;

pub use complexity::{AnyRule, ComplexityRule, KeywordRule, LengthRule, QuestionMarkRule};
pub use decision::{DecisionRule, RouteTarget, RoutingDecision};
pub use router::ConfidenceRouter;
