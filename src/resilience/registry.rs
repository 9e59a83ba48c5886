//! Process-wide map from dependency name to its circuit breaker.
//!
//! # Responsibilities
//! - Own one `CircuitBreaker` per dependency name
//! - Create breakers lazily with default settings, or eagerly with overrides
//! - Expose snapshots for diagnostics
//!
//! # Design Decisions
//! - Constructed at startup and injected; tests build a fresh registry each
//! - Concurrent map so lookups never serialize unrelated dependencies
//! - Breakers are never removed; they live as long as the process

use dashmap::DashMap;
use std::sync::Arc;

use crate::resilience::circuit_breaker::{BreakerSettings, BreakerSnapshot, CircuitBreaker};

/// Registry of circuit breakers keyed by dependency name.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    defaults: BreakerSettings,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(defaults: BreakerSettings) -> Self {
        Self {
            defaults,
            breakers: DashMap::new(),
        }
    }

    pub fn defaults(&self) -> BreakerSettings {
        self.defaults
    }

    /// Register a breaker with explicit settings.
    ///
    /// An existing breaker keeps its state and settings.
    pub fn register(&self, name: &str, settings: BreakerSettings) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(
                    dependency = %name,
                    failure_threshold = settings.failure_threshold,
                    recovery_timeout = ?settings.recovery_timeout,
                    "Registering circuit breaker"
                );
                Arc::new(CircuitBreaker::new(name, settings))
            })
            .clone()
    }

    /// Breaker for `name`, created with the default settings on first use.
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return existing.clone();
        }
        self.register(name, self.defaults)
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| b.clone())
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshots of every breaker, sorted by dependency name.
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let mut all: Vec<BreakerSnapshot> =
            self.breakers.iter().map(|entry| entry.value().snapshot()).collect();
        all.sort_by(|a, b| a.dependency.cmp(&b.dependency));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::CircuitState;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_same_name_shares_state() {
        let registry = BreakerRegistry::new(BreakerSettings {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(30),
        });

        let first = registry.breaker("search");
        first.try_acquire().unwrap().record_failure();

        let second = registry.breaker("search");
        assert_eq!(second.state(), CircuitState::Open);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_overrides_defaults_once() {
        let registry = BreakerRegistry::default();
        let custom = BreakerSettings {
            failure_threshold: 7,
            recovery_timeout: Duration::from_secs(5),
        };
        registry.register("gemini", custom);
        assert_eq!(registry.breaker("gemini").settings(), custom);

        // Re-registering does not replace the live breaker.
        registry.register("gemini", BreakerSettings::default());
        assert_eq!(registry.breaker("gemini").settings(), custom);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_is_sorted() {
        let registry = BreakerRegistry::default();
        registry.breaker("search");
        registry.breaker("classifier");
        registry.breaker("openai");

        let names: Vec<String> = registry.snapshot().into_iter().map(|s| s.dependency).collect();
        assert_eq!(names, vec!["classifier", "openai", "search"]);
        assert!(registry.get("missing").is_none());
    }
}
