//! Request and response payloads exchanged with collaborator services.

use serde::{Deserialize, Serialize};

/// A single extracted entity, e.g. `{type: "location", value: "Kandy"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            value: value.into(),
        }
    }
}

/// Output of the intent classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: String,
    /// Confidence in [0.0, 1.0].
    pub confidence: f32,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Classification {
    /// Intent reported when the classifier could not be consulted.
    pub const UNKNOWN_INTENT: &'static str = "unknown";

    pub fn new(intent: impl Into<String>, confidence: f32, entities: Vec<Entity>) -> Self {
        Self {
            intent: intent.into(),
            confidence: sanitize_confidence(confidence),
            entities,
        }
    }

    /// Classification used when the classifier failed: confidence 0.0.
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN_INTENT, 0.0, Vec::new())
    }
}

/// Clamp to [0, 1], mapping NaN to 0.
pub fn sanitize_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One prior exchange in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

/// Conversation state supplied by the caller with every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: String,
    pub language: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            language: language.into(),
            history: Vec::new(),
        }
    }

    /// Append a completed exchange, keeping at most `max_turns` turns.
    pub fn record_exchange(&mut self, query: &str, answer: &str, max_turns: usize) {
        self.history.push(ChatTurn {
            speaker: Speaker::User,
            text: query.to_string(),
        });
        self.history.push(ChatTurn {
            speaker: Speaker::Assistant,
            text: answer.to_string(),
        });
        if self.history.len() > max_turns {
            let excess = self.history.len() - max_turns;
            self.history.drain(..excess);
        }
    }
}

/// Input handed to a generative provider.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub query: String,
    pub context: Option<String>,
    pub history: Vec<ChatTurn>,
}

/// Raw output of a generative provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Provider-reported confidence, when it has one.
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

impl SearchHit {
    /// Reference shown in a response's sources list.
    pub fn reference(&self) -> &str {
        if self.url.is_empty() {
            &self.title
        } else {
            &self.url
        }
    }
}

/// Output of the web search fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl SearchResults {
    /// True when there is nothing to show the user.
    pub fn is_empty(&self) -> bool {
        self.answer.trim().is_empty()
            && self
                .results
                .iter()
                .all(|r| r.snippet.trim().is_empty() && r.title.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Classification::new("greeting", 1.7, vec![]).confidence, 1.0);
        assert_eq!(Classification::new("greeting", -0.2, vec![]).confidence, 0.0);
        assert_eq!(Classification::new("greeting", f32::NAN, vec![]).confidence, 0.0);
    }

    #[test]
    fn test_entity_wire_format() {
        let json = r#"{"intent":"weather_info","confidence":0.9,"entities":[{"type":"location","value":"Ella"}]}"#;
        let parsed: Classification = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.entities, vec![Entity::new("location", "Ella")]);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = ChatSession::new("s1", "en");
        for i in 0..5 {
            session.record_exchange(&format!("q{i}"), &format!("a{i}"), 4);
        }
        assert_eq!(session.history.len(), 4);
        assert_eq!(session.history[0].text, "q3");
        assert_eq!(session.history[3].text, "a4");
    }

    #[test]
    fn test_search_results_emptiness() {
        assert!(SearchResults::default().is_empty());
        let results = SearchResults {
            answer: String::new(),
            results: vec![SearchHit {
                title: "Sigiriya".into(),
                url: "https://example.org/sigiriya".into(),
                snippet: String::new(),
            }],
        };
        assert!(!results.is_empty());
        assert_eq!(results.results[0].reference(), "https://example.org/sigiriya");
    }
}
