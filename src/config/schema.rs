//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the orchestrator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::resilience::BreakerSettings;

/// Root configuration for the orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Confidence thresholds and query-shape heuristics.
    pub routing: RoutingConfig,

    /// Default circuit breaker settings for every dependency.
    pub breaker: BreakerConfig,

    /// Retry policy for provider calls.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Generative providers, tried in ascending `priority`.
    pub providers: Vec<ProviderConfig>,

    /// Classifier, search and context endpoints.
    pub services: ServicesConfig,

    /// Structured (template) responses and the canned floor.
    pub structured: StructuredConfig,

    /// Response assembly settings.
    pub response: ResponseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Confidence Router configuration. Hot-reloadable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Structured path without further checks at or above this confidence.
    pub high_confidence: f32,

    /// Structured path for simple queries at or above this confidence.
    pub medium_confidence: f32,

    /// Below this confidence the search fallback runs alongside generation.
    pub low_confidence: f32,

    /// Intents the structured responder can answer.
    pub structured_intents: Vec<String>,

    /// Complexity heuristics.
    pub complexity: ComplexityConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            high_confidence: 0.7,
            medium_confidence: 0.4,
            low_confidence: 0.4,
            structured_intents: [
                "greeting",
                "goodbye",
                "thanks",
                "help",
                "destination_info",
                "hotel_search",
                "weather_info",
                "transport_info",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            complexity: ComplexityConfig::default(),
        }
    }
}

/// Heuristics that flag a query as complex.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComplexityConfig {
    /// Queries longer than this many characters are complex.
    pub max_chars: usize,

    /// Comparison, explanation and planning keywords (matched on word boundaries).
    pub keywords: Vec<String>,

    /// More question marks than this marks a multi-part question.
    pub max_question_marks: usize,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            max_chars: 150,
            keywords: [
                "compare",
                "compared",
                "comparing",
                "comparison",
                "versus",
                "vs",
                "difference",
                "differences",
                "better",
                "explain",
                "why",
                "plan",
                "planning",
                "itinerary",
                "how does",
                "how do",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_question_marks: 1,
        }
    }
}

/// Default circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds after the last failure before a probe is allowed.
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout_secs: 60,
        }
    }
}

impl BreakerConfig {
    pub fn settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per provider call, including the first.
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt.
    pub backoff_base: f64,

    /// Random extra delay as a fraction of the computed delay (0 disables).
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 4000,
            backoff_base: 2.0,
            jitter_ratio: 0.0,
        }
    }
}

/// Timeout configuration for dependency calls.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall deadline for one `respond` call in seconds.
    pub request_secs: u64,

    /// Limit for a single provider call in seconds.
    pub provider_call_secs: u64,

    /// Classifier call limit in seconds.
    pub classify_secs: u64,

    /// Search call limit in seconds.
    pub search_secs: u64,

    /// Context retrieval limit in seconds.
    pub context_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            provider_call_secs: 20,
            classify_secs: 5,
            search_secs: 10,
            context_secs: 5,
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn provider_call(&self) -> Duration {
        Duration::from_secs(self.provider_call_secs)
    }

    pub fn classify(&self) -> Duration {
        Duration::from_secs(self.classify_secs)
    }

    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn context(&self) -> Duration {
        Duration::from_secs(self.context_secs)
    }
}

/// One generative provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Unique provider identifier, also the breaker name.
    pub name: String,

    /// Lower is tried first.
    #[serde(default)]
    pub priority: u32,

    /// JSON endpoint accepting a generation request.
    pub endpoint: String,

    /// Environment variable holding the bearer token, if any.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Overrides `breaker.failure_threshold` for this provider.
    #[serde(default)]
    pub failure_threshold: Option<u32>,

    /// Overrides `breaker.recovery_timeout_secs` for this provider.
    #[serde(default)]
    pub recovery_timeout_secs: Option<u64>,

    /// Confidence reported for this provider's answers when it gives none.
    #[serde(default = "default_response_confidence")]
    pub response_confidence: f32,
}

fn default_response_confidence() -> f32 {
    0.8
}

/// Endpoints of the non-generative collaborators. Missing ones are disabled.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub classifier_url: Option<String>,
    pub search_url: Option<String>,
    pub context_url: Option<String>,
}

/// Structured responder configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StructuredConfig {
    /// Response template per intent. `{entity_type}` is replaced by the entity value.
    pub templates: BTreeMap<String, String>,

    /// Generic canned response per language code.
    pub canned_responses: BTreeMap<String, String>,

    /// Language used when a session's language has no canned response.
    pub default_language: String,

    /// Longer queries are answered with the canned response directly.
    pub max_query_chars: usize,
}

impl Default for StructuredConfig {
    fn default() -> Self {
        let templates = [
            ("greeting", "Hello! How can I help you with your travel plans today?"),
            ("goodbye", "Goodbye, and enjoy your trip!"),
            ("thanks", "You're welcome! Let me know if there's anything else."),
            (
                "help",
                "I can help with destinations, hotels, weather and getting around. Just ask!",
            ),
            ("destination_info", "Here is an overview of {location}."),
            ("hotel_search", "Looking for places to stay in {location}."),
            ("weather_info", "Checking the weather for {location}."),
            ("transport_info", "Here are the ways to get to {location}."),
        ];
        let canned = [
            (
                "en",
                "I'm sorry, I can't answer that right now. Please try again in a moment.",
            ),
            (
                "si",
                "සමාවන්න, මට දැන් පිළිතුරු දිය නොහැක. කරුණාකර මොහොතකින් නැවත උත්සාහ කරන්න.",
            ),
            (
                "ta",
                "மன்னிக்கவும், இப்போது பதிலளிக்க முடியவில்லை. சிறிது நேரம் கழித்து மீண்டும் முயற்சிக்கவும்.",
            ),
        ];
        Self {
            templates: templates
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            canned_responses: canned
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default_language: "en".to_string(),
            max_query_chars: 2000,
        }
    }
}

/// Response assembly configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Search results merged into a response.
    pub max_search_results: usize,

    /// Confidence reported for search-only answers.
    pub search_confidence: f32,

    /// Turns of history kept by the interactive session.
    pub max_history_turns: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            max_search_results: 3,
            search_confidence: 0.5,
            max_history_turns: 20,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
