//! Static description of one generative provider.

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::resilience::BreakerSettings;

/// Confidence used for a provider's answers when neither it nor its config gives one.
pub const DEFAULT_RESPONSE_CONFIDENCE: f32 = 0.8;

/// Name, priority and breaker thresholds of a provider. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    /// Unique name, also the breaker's dependency name.
    pub name: String,
    /// Lower is tried first.
    pub priority_order: u32,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    /// Confidence reported when the provider does not return its own.
    pub response_confidence: f32,
}

impl ProviderDescriptor {
    /// Descriptor with the default breaker settings.
    pub fn new(name: impl Into<String>, priority_order: u32) -> Self {
        let defaults = BreakerSettings::default();
        Self {
            name: name.into(),
            priority_order,
            failure_threshold: defaults.failure_threshold,
            recovery_timeout: defaults.recovery_timeout,
            response_confidence: DEFAULT_RESPONSE_CONFIDENCE,
        }
    }

    pub fn with_breaker(mut self, settings: BreakerSettings) -> Self {
        self.failure_threshold = settings.failure_threshold;
        self.recovery_timeout = settings.recovery_timeout;
        self
    }

    pub fn with_response_confidence(mut self, confidence: f32) -> Self {
        self.response_confidence = confidence;
        self
    }

    /// Build from config, filling unset breaker overrides from `defaults`.
    pub fn from_config(config: &ProviderConfig, defaults: BreakerSettings) -> Self {
        Self {
            name: config.name.clone(),
            priority_order: config.priority,
            failure_threshold: config.failure_threshold.unwrap_or(defaults.failure_threshold),
            recovery_timeout: config
                .recovery_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.recovery_timeout),
            response_confidence: config.response_confidence,
        }
    }

    pub fn breaker_settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.failure_threshold,
            recovery_timeout: self.recovery_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_overrides_fall_back_to_defaults() {
        let config = ProviderConfig {
            name: "openai".to_string(),
            priority: 2,
            endpoint: "http://localhost:7002/generate".to_string(),
            api_key_env: None,
            failure_threshold: Some(5),
            recovery_timeout_secs: None,
            response_confidence: 0.75,
        };
        let defaults = BreakerSettings {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(45),
        };

        let descriptor = ProviderDescriptor::from_config(&config, defaults);
        assert_eq!(descriptor.priority_order, 2);
        assert_eq!(
            descriptor.breaker_settings(),
            BreakerSettings {
                failure_threshold: 5,
                recovery_timeout: Duration::from_secs(45),
            }
        );
        assert_eq!(descriptor.response_confidence, 0.75);
    }
}
