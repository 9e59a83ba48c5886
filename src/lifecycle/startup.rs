//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the breaker registry, collaborators and fallback chain in order
//! - Resolve provider API keys from the environment
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Missing service endpoints are not errors; those services are disabled

use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::backends::http::{HttpClassifier, HttpContextRetriever, HttpProvider, HttpSearch};
use crate::config::{validate_config, OrchestratorConfig, ValidationError};
use crate::orchestrator::Orchestrator;
use crate::providers::{FallbackChain, ProviderDescriptor};
use crate::resilience::{BreakerRegistry, RetryPolicy};
use crate::structured::TemplateResponder;

/// Error type for orchestrator startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("{field}: invalid URL '{value}': {source}")]
    Url {
        field: String,
        value: String,
        source: url::ParseError,
    },

    #[error("provider '{provider}' needs an API key in ${var}")]
    MissingApiKey { provider: String, var: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build an orchestrator from config, reading API keys from the process environment.
pub fn build_orchestrator(config: &OrchestratorConfig) -> Result<Orchestrator, StartupError> {
    build_orchestrator_with_env(config, |var| std::env::var(var).ok())
}

/// Build an orchestrator, resolving API key variables through `lookup`.
pub fn build_orchestrator_with_env<F>(
    config: &OrchestratorConfig,
    lookup: F,
) -> Result<Orchestrator, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    validate_config(config).map_err(StartupError::Config)?;

    let defaults = config.breaker.settings();
    let registry = Arc::new(BreakerRegistry::new(defaults));
    let client = reqwest::Client::builder()
        .user_agent(concat!("chat-orchestrator/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let timeouts = &config.timeouts;

    let mut chain = FallbackChain::new(
        registry.clone(),
        RetryPolicy::from(&config.retries),
        timeouts.provider_call(),
    );
    for provider_config in &config.providers {
        let field = format!("providers.{}.endpoint", provider_config.name);
        let url = parse_url(&field, &provider_config.endpoint)?;
        let mut provider = HttpProvider::new(
            provider_config.name.clone(),
            client.clone(),
            url,
            timeouts.provider_call(),
        );
        if let Some(var) = &provider_config.api_key_env {
            let token = lookup(var)
                .filter(|token| !token.trim().is_empty())
                .ok_or_else(|| StartupError::MissingApiKey {
                    provider: provider_config.name.clone(),
                    var: var.clone(),
                })?;
            provider = provider.with_bearer(token);
        }
        chain.register(
            ProviderDescriptor::from_config(provider_config, defaults),
            Arc::new(provider),
        );
    }

    let mut builder = Orchestrator::builder(registry)
        .chain(chain)
        .structured(Arc::new(TemplateResponder::new(&config.structured)))
        .routing(config.routing.clone())
        .response(config.response.clone())
        .timeouts(timeouts.clone())
        .max_query_chars(config.structured.max_query_chars);

    let services = &config.services;
    match &services.classifier_url {
        Some(url) => {
            let url = parse_url("services.classifier_url", url)?;
            builder = builder.classifier(Arc::new(HttpClassifier::new(
                client.clone(),
                url,
                timeouts.classify(),
            )));
        }
        None => tracing::warn!("No classifier configured; every query routes as low confidence"),
    }
    match &services.search_url {
        Some(url) => {
            let url = parse_url("services.search_url", url)?;
            builder = builder.search(Arc::new(HttpSearch::new(client.clone(), url, timeouts.search())));
        }
        None => tracing::warn!("No search service configured"),
    }
    if let Some(url) = &services.context_url {
        let url = parse_url("services.context_url", url)?;
        builder = builder.context(Arc::new(HttpContextRetriever::new(
            client,
            url,
            timeouts.context(),
        )));
    }

    let orchestrator = builder.build();
    tracing::info!(
        providers = ?orchestrator.providers(),
        "Orchestrator ready"
    );
    Ok(orchestrator)
}

fn parse_url(field: &str, value: &str) -> Result<Url, StartupError> {
    Url::parse(value).map_err(|source| StartupError::Url {
        field: field.to_string(),
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    fn provider(name: &str, priority: u32, api_key_env: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            priority,
            endpoint: format!("http://127.0.0.1:9/{name}"),
            api_key_env: api_key_env.map(String::from),
            failure_threshold: None,
            recovery_timeout_secs: Some(10),
            response_confidence: 0.8,
        }
    }

    #[tokio::test]
    async fn test_default_config_builds() {
        let orchestrator = build_orchestrator_with_env(&OrchestratorConfig::default(), |_| None)
            .unwrap();
        assert!(orchestrator.providers().is_empty());
        let names: Vec<String> = orchestrator
            .breaker_snapshot()
            .into_iter()
            .map(|s| s.dependency)
            .collect();
        assert_eq!(names, vec!["classifier", "context", "search"]);
    }

    #[tokio::test]
    async fn test_providers_registered_in_priority_order() {
        let mut config = OrchestratorConfig::default();
        config.providers = vec![
            provider("openai", 2, Some("OPENAI_KEY")),
            provider("gemini", 1, None),
        ];

        let orchestrator = build_orchestrator_with_env(&config, |var| {
            (var == "OPENAI_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();
        assert_eq!(orchestrator.providers(), vec!["gemini", "openai"]);

        let gemini = orchestrator.registry().get("gemini").unwrap();
        assert_eq!(gemini.settings().recovery_timeout.as_secs(), 10);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_fast() {
        let mut config = OrchestratorConfig::default();
        config.providers = vec![provider("openai", 1, Some("OPENAI_KEY"))];

        let err = build_orchestrator_with_env(&config, |_| None).unwrap_err();
        assert!(matches!(err, StartupError::MissingApiKey { ref var, .. } if var == "OPENAI_KEY"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = OrchestratorConfig::default();
        config.routing.high_confidence = 2.0;
        assert!(matches!(
            build_orchestrator_with_env(&config, |_| None),
            Err(StartupError::Config(_))
        ));
    }
}
