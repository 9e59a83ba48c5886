//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{LogFormat, OrchestratorConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "CHAT_ORCHESTRATOR_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}")]
    Env { key: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides to, and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse TOML without overrides or validation.
pub fn parse_config(content: &str) -> Result<OrchestratorConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply `CHAT_ORCHESTRATOR_*` overrides read through `lookup`.
///
/// Unset keys leave the file value alone; unparsable values are errors.
pub fn apply_overrides<F>(config: &mut OrchestratorConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |suffix: &str| {
        let key = format!("{ENV_PREFIX}{suffix}");
        lookup(&key).map(|value| (key, value))
    };

    if let Some((_, value)) = get("LOG_LEVEL") {
        config.observability.log_level = value;
    }
    if let Some((key, value)) = get("LOG_FORMAT") {
        config.observability.log_format = parse_value::<LogFormat>(key, value)?;
    }
    if let Some((key, value)) = get("METRICS_ENABLED") {
        config.observability.metrics_enabled = parse_value(key, value)?;
    }
    if let Some((_, value)) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = value;
    }
    if let Some((key, value)) = get("HIGH_CONFIDENCE") {
        config.routing.high_confidence = parse_value(key, value)?;
    }
    if let Some((key, value)) = get("MEDIUM_CONFIDENCE") {
        config.routing.medium_confidence = parse_value(key, value)?;
    }
    if let Some((key, value)) = get("LOW_CONFIDENCE") {
        config.routing.low_confidence = parse_value(key, value)?;
    }
    if let Some((key, value)) = get("REQUEST_TIMEOUT_SECS") {
        config.timeouts.request_secs = parse_value(key, value)?;
    }
    if let Some((key, value)) = get("RETRY_MAX_ATTEMPTS") {
        config.retries.max_attempts = parse_value(key, value)?;
    }
    if let Some((_, value)) = get("CLASSIFIER_URL") {
        config.services.classifier_url = Some(value);
    }
    if let Some((_, value)) = get("SEARCH_URL") {
        config.services.search_url = Some(value);
    }
    if let Some((_, value)) = get("CONTEXT_URL") {
        config.services.context_url = Some(value);
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: String, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}
