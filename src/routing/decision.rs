//! Routing decision types.

use serde::Serialize;

use crate::backends::Entity;

/// Path chosen for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteTarget {
    /// Template answer from the structured responder.
    Structured,
    /// Fallback chain only.
    Generative,
    /// Fallback chain and web search together.
    GenerativeWithSearch,
}

impl RouteTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteTarget::Structured => "structured",
            RouteTarget::Generative => "generative",
            RouteTarget::GenerativeWithSearch => "generative_with_search",
        }
    }
}

impl std::fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the decision table that produced a route. First match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    /// High confidence, structured intent, simple query.
    HighConfidenceStructured,
    /// Confidence below the low threshold.
    LowConfidence,
    /// Complex query.
    ComplexQuery,
    /// Medium confidence, structured intent.
    MediumConfidenceStructured,
    /// Nothing else matched.
    Default,
}

/// Per-request routing verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub classified_intent: String,
    pub classifier_confidence: f32,
    pub extracted_entities: Vec<Entity>,
    pub route_target: RouteTarget,
    pub complexity_flag: bool,
    pub rule: DecisionRule,
}
