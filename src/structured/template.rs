//! Template-driven structured responder.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::backends::{BackendError, BackendResult, ChatSession, Classification};
use crate::config::StructuredConfig;
use crate::structured::StructuredResponder;

const FALLBACK_CANNED: &str = "I'm sorry, I can't answer that right now. Please try again later.";

/// Fills per-intent templates with extracted entity values.
#[derive(Debug, Clone)]
pub struct TemplateResponder {
    templates: BTreeMap<String, String>,
    canned: BTreeMap<String, String>,
    default_language: String,
}

impl TemplateResponder {
    pub fn new(config: &StructuredConfig) -> Self {
        Self {
            templates: config
                .templates
                .iter()
                .map(|(intent, template)| (intent.to_lowercase(), template.clone()))
                .collect(),
            canned: config.canned_responses.clone(),
            default_language: config.default_language.clone(),
        }
    }

    /// Render the template for `classification`, or fail with `Unsupported`.
    pub fn render(&self, classification: &Classification) -> BackendResult<String> {
        let intent = classification.intent.to_lowercase();
        let template = self.templates.get(&intent).ok_or_else(|| {
            BackendError::Unsupported(format!("no template for intent '{intent}'"))
        })?;

        let mut text = template.clone();
        for entity in &classification.entities {
            let slot = format!("{{{}}}", entity.entity_type);
            if text.contains(&slot) {
                text = text.replace(&slot, entity.value.trim());
            }
        }

        if let Some(slot) = unfilled_slot(&text) {
            return Err(BackendError::Unsupported(format!(
                "template for '{intent}' needs entity '{slot}'"
            )));
        }
        Ok(text)
    }
}

impl Default for TemplateResponder {
    fn default() -> Self {
        Self::new(&StructuredConfig::default())
    }
}

#[async_trait]
impl StructuredResponder for TemplateResponder {
    async fn respond(
        &self,
        classification: &Classification,
        _session: &ChatSession,
    ) -> BackendResult<String> {
        self.render(classification)
    }

    fn canned_response(&self, language: &str) -> String {
        self.canned
            .get(language)
            .or_else(|| self.canned.get(&self.default_language))
            .map(String::as_str)
            .unwrap_or(FALLBACK_CANNED)
            .to_string()
    }
}

/// First `{name}` placeholder left in `text`.
fn unfilled_slot(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let rest = &text[start + 1..];
    let end = rest.find('}')?;
    let name = &rest[..end];
    let is_slot = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    if is_slot {
        Some(name)
    } else {
        unfilled_slot(&rest[end + 1..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Entity;

    fn session() -> ChatSession {
        ChatSession::new("s1", "en")
    }

    #[tokio::test]
    async fn test_fills_entity_slots() {
        let responder = TemplateResponder::default();
        let classification = Classification::new(
            "weather_info",
            0.9,
            vec![Entity::new("location", " Nuwara Eliya ")],
        );
        let text = responder.respond(&classification, &session()).await.unwrap();
        assert_eq!(text, "Checking the weather for Nuwara Eliya.");
    }

    #[tokio::test]
    async fn test_missing_entity_is_unsupported() {
        let responder = TemplateResponder::default();
        let classification = Classification::new("hotel_search", 0.9, vec![]);
        let err = responder.respond(&classification, &session()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unsupported(msg) if msg.contains("location")));
    }

    #[tokio::test]
    async fn test_unknown_intent_is_unsupported() {
        let responder = TemplateResponder::default();
        let classification = Classification::new("visa_rules", 0.9, vec![]);
        assert!(responder.respond(&classification, &session()).await.is_err());
    }

    #[test]
    fn test_canned_falls_back_to_default_language() {
        let responder = TemplateResponder::default();
        assert!(responder.canned_response("en").starts_with("I'm sorry"));
        assert_eq!(responder.canned_response("fr"), responder.canned_response("en"));
        assert_ne!(responder.canned_response("si"), responder.canned_response("en"));
    }

    #[test]
    fn test_canned_never_empty() {
        let responder = TemplateResponder::new(&StructuredConfig {
            canned_responses: BTreeMap::new(),
            ..StructuredConfig::default()
        });
        assert_eq!(responder.canned_response("en"), FALLBACK_CANNED);
    }

    #[test]
    fn test_unfilled_slot_ignores_plain_braces() {
        assert_eq!(unfilled_slot("a {b c} then {city}"), Some("city"));
        assert_eq!(unfilled_slot("no slots {} here"), None);
    }
}
