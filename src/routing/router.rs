//! Confidence router.
//!
//! # Decision Table (first match wins)
//! ```text
//! 1. confidence >= high AND structured intent AND simple → STRUCTURED
//! 2. confidence <  low                                  → GENERATIVE_WITH_SEARCH
//! 3. complex query                                      → GENERATIVE
//! 4. confidence >= medium AND structured intent         → STRUCTURED
//! 5. otherwise                                          → GENERATIVE
//! ```
//!
//! # Design Decisions
//! - Pure: no I/O, no breaker state; same input always gives the same route
//! - Immutable after construction; reloads build a new router

use std::collections::HashSet;

use crate::backends::Classification;
use crate::config::RoutingConfig;
use crate::routing::complexity::{AnyRule, ComplexityRule};
use crate::routing::decision::{DecisionRule, RouteTarget, RoutingDecision};

/// Chooses a route from classifier output and query shape.
#[derive(Debug)]
pub struct ConfidenceRouter {
    high: f32,
    medium: f32,
    low: f32,
    structured_intents: HashSet<String>,
    complexity: Box<dyn ComplexityRule>,
}

impl ConfidenceRouter {
    pub fn new(config: &RoutingConfig) -> Self {
        Self::with_complexity(config, Box::new(AnyRule::from_config(&config.complexity)))
    }

    /// Router with a custom complexity rule.
    pub fn with_complexity(config: &RoutingConfig, complexity: Box<dyn ComplexityRule>) -> Self {
        Self {
            high: config.high_confidence,
            medium: config.medium_confidence,
            low: config.low_confidence,
            structured_intents: config
                .structured_intents
                .iter()
                .map(|i| i.to_lowercase())
                .collect(),
            complexity,
        }
    }

    pub fn is_structured_intent(&self, intent: &str) -> bool {
        self.structured_intents.contains(&intent.to_lowercase())
    }

    pub fn is_complex(&self, query: &str) -> bool {
        self.complexity.matches(query)
    }

    pub fn decide(&self, classification: &Classification, query: &str) -> RoutingDecision {
        let confidence = classification.confidence;
        let structured = self.is_structured_intent(&classification.intent);
        let complex = self.is_complex(query);

        let (route_target, rule) = if confidence >= self.high && structured && !complex {
            (RouteTarget::Structured, DecisionRule::HighConfidenceStructured)
        } else if confidence < self.low {
            (RouteTarget::GenerativeWithSearch, DecisionRule::LowConfidence)
        } else if complex {
            (RouteTarget::Generative, DecisionRule::ComplexQuery)
        } else if confidence >= self.medium && structured {
            (RouteTarget::Structured, DecisionRule::MediumConfidenceStructured)
        } else {
            (RouteTarget::Generative, DecisionRule::Default)
        };

        tracing::debug!(
            intent = %classification.intent,
            confidence,
            complex,
            route = %route_target,
            rule = ?rule,
            "Routing decision"
        );

        RoutingDecision {
            classified_intent: classification.intent.clone(),
            classifier_confidence: confidence,
            extracted_entities: classification.entities.clone(),
            route_target,
            complexity_flag: complex,
            rule,
        }
    }
}

impl Default for ConfidenceRouter {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}
