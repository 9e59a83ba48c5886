//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds in [0, 1], attempts > 0)
//! - Check provider names are unique and endpoints parse
//! - Check every structured intent has a template
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: OrchestratorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, including on reload

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::backends::dependency;
use crate::config::schema::{OrchestratorConfig, RoutingConfig};

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a whole configuration.
pub fn validate_config(config: &OrchestratorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_routing_into(&config.routing, &mut errors);

    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("breaker.failure_threshold", "must be at least 1"));
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if retries.backoff_base.is_nan() || retries.backoff_base < 1.0 {
        errors.push(ValidationError::new("retries.backoff_base", "must be >= 1.0"));
    }
    if retries.initial_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.initial_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }
    if !(0.0..=1.0).contains(&retries.jitter_ratio) {
        errors.push(ValidationError::new("retries.jitter_ratio", "must be within [0, 1]"));
    }

    let timeouts = &config.timeouts;
    for (field, secs) in [
        ("timeouts.request_secs", timeouts.request_secs),
        ("timeouts.provider_call_secs", timeouts.provider_call_secs),
        ("timeouts.classify_secs", timeouts.classify_secs),
        ("timeouts.search_secs", timeouts.search_secs),
        ("timeouts.context_secs", timeouts.context_secs),
    ] {
        if secs == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let mut seen = HashSet::new();
    for (i, provider) in config.providers.iter().enumerate() {
        let prefix = format!("providers[{i}]");
        if provider.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{prefix}.name"), "must not be empty"));
        } else if dependency::RESERVED.contains(&provider.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{prefix}.name"),
                format!("'{}' is reserved for a built-in dependency", provider.name),
            ));
        } else if !seen.insert(provider.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{prefix}.name"),
                format!("duplicate provider name '{}'", provider.name),
            ));
        }
        check_url(&format!("{prefix}.endpoint"), &provider.endpoint, &mut errors);
        if provider.failure_threshold == Some(0) {
            errors.push(ValidationError::new(
                format!("{prefix}.failure_threshold"),
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&provider.response_confidence) {
            errors.push(ValidationError::new(
                format!("{prefix}.response_confidence"),
                "must be within [0, 1]",
            ));
        }
    }

    let services = &config.services;
    for (field, url) in [
        ("services.classifier_url", &services.classifier_url),
        ("services.search_url", &services.search_url),
        ("services.context_url", &services.context_url),
    ] {
        if let Some(url) = url {
            check_url(field, url, &mut errors);
        }
    }

    let structured = &config.structured;
    if !structured
        .canned_responses
        .contains_key(&structured.default_language)
    {
        errors.push(ValidationError::new(
            "structured.default_language",
            format!(
                "no canned response for default language '{}'",
                structured.default_language
            ),
        ));
    }
    if structured.max_query_chars == 0 {
        errors.push(ValidationError::new("structured.max_query_chars", "must be greater than 0"));
    }

    for intent in &config.routing.structured_intents {
        let templated = structured
            .templates
            .keys()
            .any(|key| key.eq_ignore_ascii_case(intent));
        if !templated {
            errors.push(ValidationError::new(
                "routing.structured_intents",
                format!("no structured.templates entry for intent '{intent}'"),
            ));
        }
    }

    if config.response.max_search_results == 0 {
        errors.push(ValidationError::new("response.max_search_results", "must be at least 1"));
    }
    if !(0.0..=1.0).contains(&config.response.search_confidence) {
        errors.push(ValidationError::new("response.search_confidence", "must be within [0, 1]"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check only the hot-reloadable routing section.
pub fn validate_routing(routing: &RoutingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_routing_into(routing, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_routing_into(routing: &RoutingConfig, errors: &mut Vec<ValidationError>) {
    let thresholds = [
        ("routing.high_confidence", routing.high_confidence),
        ("routing.medium_confidence", routing.medium_confidence),
        ("routing.low_confidence", routing.low_confidence),
    ];
    let mut in_range = true;
    for (field, value) in thresholds {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::new(field, "must be within [0, 1]"));
            in_range = false;
        }
    }
    if in_range
        && !(routing.low_confidence <= routing.medium_confidence
            && routing.medium_confidence <= routing.high_confidence)
    {
        errors.push(ValidationError::new(
            "routing",
            "thresholds must satisfy low <= medium <= high",
        ));
    }
    if routing.complexity.keywords.iter().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::new(
            "routing.complexity.keywords",
            "must not contain empty keywords",
        ));
    }
}

fn check_url(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {e}"))),
    }
}
