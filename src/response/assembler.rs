//! Response assembly.
//!
//! # Responsibilities
//! - Turn the winning path's output into a `FinalResponse`
//! - Attach routing metadata and the fallback reason
//! - Merge search results into generated answers without duplicates
//!
//! # Design Decisions
//! - Pure: no I/O, no clock, no shared state
//! - Canned answers report zero confidence

use std::collections::HashSet;
use uuid::Uuid;

use crate::backends::{Classification, SearchHit, SearchResults};
use crate::config::ResponseConfig;
use crate::providers::ProviderResponse;
use crate::response::types::{provider_used, FallbackReason, FinalResponse};
use crate::routing::{RouteTarget, RoutingDecision};

/// Builds final responses.
#[derive(Debug, Clone)]
pub struct ResponseAssembler {
    max_search_results: usize,
    search_confidence: f32,
}

impl ResponseAssembler {
    pub fn new(config: &ResponseConfig) -> Self {
        Self {
            max_search_results: config.max_search_results,
            search_confidence: config.search_confidence,
        }
    }

    /// Answer rendered by the structured responder.
    pub fn structured(&self, request_id: Uuid, decision: &RoutingDecision, text: String) -> FinalResponse {
        FinalResponse {
            request_id,
            text,
            intent: decision.classified_intent.clone(),
            confidence: decision.classifier_confidence,
            entities: decision.extracted_entities.clone(),
            route: Some(decision.route_target),
            provider_used: provider_used::STRUCTURED.to_string(),
            sources: Vec::new(),
            fallback_reason: None,
        }
    }

    /// Answer from a provider, optionally enriched with search results.
    pub fn generated(
        &self,
        request_id: Uuid,
        decision: &RoutingDecision,
        response: ProviderResponse,
        search: Option<&SearchResults>,
        fallback_reason: Option<FallbackReason>,
    ) -> FinalResponse {
        let search_refs = search
            .into_iter()
            .flat_map(|s| s.results.iter().take(self.max_search_results))
            .map(|hit| hit.reference().to_string());
        let sources = dedup(response.source_snippets.into_iter().chain(search_refs));

        FinalResponse {
            request_id,
            text: response.text,
            intent: decision.classified_intent.clone(),
            confidence: response.confidence_score,
            entities: decision.extracted_entities.clone(),
            route: Some(decision.route_target),
            provider_used: response.provider_name,
            sources,
            fallback_reason,
        }
    }

    /// Answer composed from web search alone.
    pub fn searched(
        &self,
        request_id: Uuid,
        decision: &RoutingDecision,
        results: &SearchResults,
        fallback_reason: Option<FallbackReason>,
    ) -> FinalResponse {
        FinalResponse {
            request_id,
            text: self.search_text(results),
            intent: decision.classified_intent.clone(),
            confidence: self.search_confidence,
            entities: decision.extracted_entities.clone(),
            route: Some(decision.route_target),
            provider_used: provider_used::SEARCH.to_string(),
            sources: dedup(
                self.top_hits(results)
                    .map(|hit| hit.reference().to_string()),
            ),
            fallback_reason,
        }
    }

    /// True when [`Self::searched`] would produce non-empty text.
    pub fn answers_from(&self, results: &SearchResults) -> bool {
        !self.search_text(results).is_empty()
    }

    fn top_hits<'a>(&self, results: &'a SearchResults) -> impl Iterator<Item = &'a SearchHit> {
        results.results.iter().take(self.max_search_results)
    }

    /// The search answer, or one line per capped hit when there is none.
    fn search_text(&self, results: &SearchResults) -> String {
        if !results.answer.trim().is_empty() {
            return results.answer.trim().to_string();
        }
        self.top_hits(results)
            .map(|hit| match (hit.title.trim(), hit.snippet.trim()) {
                (title, "") => title.to_string(),
                ("", snippet) => snippet.to_string(),
                (title, snippet) => format!("{title}: {snippet}"),
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The canned floor.
    ///
    /// `route` is `None` when the query was rejected before classification.
    pub fn canned(
        &self,
        request_id: Uuid,
        classification: &Classification,
        route: Option<RouteTarget>,
        text: String,
        fallback_reason: FallbackReason,
    ) -> FinalResponse {
        FinalResponse {
            request_id,
            text,
            intent: classification.intent.clone(),
            confidence: 0.0,
            entities: classification.entities.clone(),
            route,
            provider_used: provider_used::CANNED.to_string(),
            sources: Vec::new(),
            fallback_reason: Some(fallback_reason),
        }
    }
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new(&ResponseConfig::default())
    }
}

/// Drop empty and repeated entries, keeping first-seen order.
fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Entity;
    use crate::routing::DecisionRule;

    fn decision(route: RouteTarget) -> RoutingDecision {
        RoutingDecision {
            classified_intent: "destination_info".to_string(),
            classifier_confidence: 0.3,
            extracted_entities: vec![Entity::new("location", "Galle")],
            route_target: route,
            complexity_flag: false,
            rule: DecisionRule::LowConfidence,
        }
    }

    fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
        }
    }

    fn search() -> SearchResults {
        SearchResults {
            answer: String::new(),
            results: vec![
                hit("Galle Fort", "https://a.example/fort", "Dutch-era fortifications."),
                hit("Lighthouse", "https://a.example/light", ""),
                hit("Fort again", "https://a.example/fort", "Duplicate link."),
                hit("Beyond cap", "https://a.example/cap", "Not shown."),
            ],
        }
    }

    #[test]
    fn test_generated_merges_and_dedups_sources() {
        let assembler = ResponseAssembler::default();
        let response = ProviderResponse {
            text: "Galle is a coastal city.".to_string(),
            confidence_score: 0.8,
            source_snippets: vec!["https://a.example/fort".to_string(), " ".to_string()],
            provider_name: "gemini".to_string(),
            succeeded: true,
        };

        let out = assembler.generated(
            Uuid::new_v4(),
            &decision(RouteTarget::GenerativeWithSearch),
            response,
            Some(&search()),
            Some(FallbackReason::ClassifierLowConfidence),
        );

        assert_eq!(out.provider_used, "gemini");
        assert_eq!(out.confidence, 0.8);
        assert_eq!(
            out.sources,
            vec!["https://a.example/fort", "https://a.example/light"]
        );
        assert_eq!(out.fallback_reason, Some(FallbackReason::ClassifierLowConfidence));
        assert_eq!(out.entities[0].value, "Galle");
    }

    #[test]
    fn test_searched_composes_text_from_snippets() {
        let assembler = ResponseAssembler::default();
        let out = assembler.searched(
            Uuid::new_v4(),
            &decision(RouteTarget::Generative),
            &search(),
            Some(FallbackReason::SearchFallbackUsed),
        );
        assert_eq!(
            out.text,
            "Galle Fort: Dutch-era fortifications.\nLighthouse\nFort again: Duplicate link."
        );
        assert_eq!(out.provider_used, provider_used::SEARCH);
        assert_eq!(out.confidence, 0.5);
        assert_eq!(out.sources.len(), 2);
    }

    #[test]
    fn test_searched_prefers_answer() {
        let assembler = ResponseAssembler::default();
        let mut results = search();
        results.answer = "  Galle is on the south coast. ".to_string();
        let out = assembler.searched(Uuid::new_v4(), &decision(RouteTarget::Generative), &results, None);
        assert_eq!(out.text, "Galle is on the south coast.");
    }

    #[test]
    fn test_answers_only_from_capped_hits() {
        let assembler = ResponseAssembler::new(&ResponseConfig {
            max_search_results: 2,
            ..ResponseConfig::default()
        });
        let mut results = SearchResults {
            answer: String::new(),
            results: vec![
                hit("", "https://a.example/1", ""),
                hit("", "https://a.example/2", ""),
                hit("Sigiriya", "https://a.example/3", "Rock fortress"),
            ],
        };
        assert!(!results.is_empty());
        assert!(!assembler.answers_from(&results));

        results.answer = "Sigiriya is a rock fortress.".to_string();
        assert!(assembler.answers_from(&results));

        let no_hits = ResponseAssembler::new(&ResponseConfig {
            max_search_results: 0,
            ..ResponseConfig::default()
        });
        assert!(!no_hits.answers_from(&search()));
    }

    #[test]
    fn test_canned_floor() {
        let assembler = ResponseAssembler::default();
        let id = Uuid::new_v4();
        let out = assembler.canned(
            id,
            &Classification::unknown(),
            None,
            "Sorry.".to_string(),
            FallbackReason::InvalidQuery,
        );
        assert_eq!(out.request_id, id);
        assert_eq!(out.intent, Classification::UNKNOWN_INTENT);
        assert_eq!(out.provider_used, provider_used::CANNED);
        assert!(out.route.is_none());
        assert!(out.is_degraded());
    }
}
