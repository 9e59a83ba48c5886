//! Final response returned to the caller.

use serde::Serialize;
use uuid::Uuid;

use crate::backends::Entity;
use crate::routing::RouteTarget;

/// Why the answer did not come from the router's first-choice path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Low classifier confidence sent the query to generation plus search.
    ClassifierLowConfidence,
    /// The structured responder failed; generation answered instead.
    StructuredPathFailed,
    /// No provider and no search result; the canned response answered.
    AllProvidersExhausted,
    /// Every provider failed; web search answered.
    SearchFallbackUsed,
    /// The query was empty or too long to process.
    InvalidQuery,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::ClassifierLowConfidence => "classifier_low_confidence",
            FallbackReason::StructuredPathFailed => "structured_path_failed",
            FallbackReason::AllProvidersExhausted => "all_providers_exhausted",
            FallbackReason::SearchFallbackUsed => "search_fallback_used",
            FallbackReason::InvalidQuery => "invalid_query",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What produced the answer text.
pub mod provider_used {
    pub const STRUCTURED: &str = "structured";
    pub const SEARCH: &str = "search";
    pub const CANNED: &str = "canned";
}

/// Answer to one `respond` call. Always produced, never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResponse {
    /// Correlates the response with its log events.
    pub request_id: Uuid,
    pub text: String,
    pub intent: String,
    pub confidence: f32,
    pub entities: Vec<Entity>,
    /// Route chosen by the router; `None` when the query was rejected before routing.
    pub route: Option<RouteTarget>,
    /// Provider name, or one of the [`provider_used`] constants.
    pub provider_used: String,
    pub sources: Vec<String>,
    pub fallback_reason: Option<FallbackReason>,
}

impl FinalResponse {
    pub fn is_degraded(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_wire_format() {
        let json = serde_json::to_string(&FallbackReason::AllProvidersExhausted).unwrap();
        assert_eq!(json, "\"all_providers_exhausted\"");
        assert_eq!(
            FallbackReason::SearchFallbackUsed.to_string(),
            "search_fallback_used"
        );
    }
}
