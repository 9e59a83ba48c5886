//! Provider fallback chain.
//!
//! # Responsibilities
//! - Hold the registered providers in fixed priority order
//! - Skip providers whose breaker is open
//! - Call each remaining provider through its breaker and the retry policy
//! - Stop at the first success, or report exhaustion
//!
//! # Design Decisions
//! - Priority never changes at runtime; no re-ranking by success rate
//! - Attempts within one request are strictly sequential
//! - Exhaustion is an outcome, not an error
//! - The breaker sees one outcome per chain attempt, after retries

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::types::sanitize_confidence;
use crate::backends::{BackendError, GeneratedText, GenerationRequest};
use crate::observability::metrics;
use crate::providers::{Provider, ProviderDescriptor};
use crate::resilience::{
    execute_with_retry, with_timeout, BreakerError, BreakerRegistry, CircuitBreaker, Deadline,
    RetryPolicy,
};

/// Source snippets kept from a provider answer.
pub const MAX_SOURCE_SNIPPETS: usize = 3;

/// Outcome of one provider call as seen by the rest of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResponse {
    pub text: String,
    pub confidence_score: f32,
    pub source_snippets: Vec<String>,
    pub provider_name: String,
    pub succeeded: bool,
}

impl ProviderResponse {
    fn success(descriptor: &ProviderDescriptor, generated: GeneratedText) -> Self {
        let mut sources = generated.sources;
        sources.truncate(MAX_SOURCE_SNIPPETS);
        Self {
            text: generated.text,
            confidence_score: generated
                .confidence
                .map(sanitize_confidence)
                .unwrap_or(descriptor.response_confidence),
            source_snippets: sources,
            provider_name: descriptor.name.clone(),
            succeeded: true,
        }
    }

    fn failure(provider: &str) -> Self {
        Self {
            text: String::new(),
            confidence_score: 0.0,
            source_snippets: Vec::new(),
            provider_name: provider.to_string(),
            succeeded: false,
        }
    }
}

/// What happened when the chain reached one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Breaker open; the provider was not invoked.
    Skipped { retry_after_ms: u64 },
    /// Invoked and failed after retries.
    Failed { kind: &'static str, message: String },
    /// The request deadline ran out before or during the call.
    DeadlineExceeded,
    Succeeded,
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Skipped { .. } => "skipped",
            AttemptOutcome::Failed { kind, .. } => *kind,
            AttemptOutcome::DeadlineExceeded => "deadline_exceeded",
            AttemptOutcome::Succeeded => "success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub provider: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Per-request trail of every provider the chain reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChainReport {
    pub attempts: Vec<AttemptRecord>,
}

impl ChainReport {
    fn push(&mut self, provider: &str, outcome: AttemptOutcome) {
        metrics::record_provider_call(provider, outcome.label());
        self.attempts.push(AttemptRecord {
            provider: provider.to_string(),
            outcome,
        });
    }

    /// Providers actually invoked. Skips are not attempts.
    pub fn attempt_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped { .. }))
            .count()
    }

    pub fn was_consulted(&self, provider: &str) -> bool {
        self.attempts
            .iter()
            .any(|a| a.provider == provider && !matches!(a.outcome, AttemptOutcome::Skipped { .. }))
    }
}

/// Result of running the chain once.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Success {
        response: ProviderResponse,
        report: ChainReport,
    },
    /// Every provider was skipped, failed, or ran out of time.
    Exhausted {
        report: ChainReport,
        last_failure: Option<ProviderResponse>,
    },
}

impl ChainOutcome {
    pub fn report(&self) -> &ChainReport {
        match self {
            ChainOutcome::Success { report, .. } | ChainOutcome::Exhausted { report, .. } => report,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChainOutcome::Success { .. })
    }
}

struct ChainEntry {
    descriptor: ProviderDescriptor,
    provider: Arc<dyn Provider>,
    breaker: Arc<CircuitBreaker>,
}

/// Ordered providers with per-provider breakers.
pub struct FallbackChain {
    entries: Vec<ChainEntry>,
    registry: Arc<BreakerRegistry>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("providers", &self.provider_names())
            .field("retry", &self.retry)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl FallbackChain {
    pub fn new(registry: Arc<BreakerRegistry>, retry: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            entries: Vec::new(),
            registry,
            retry,
            call_timeout,
        }
    }

    /// Add a provider. Equal priorities keep registration order.
    pub fn register(&mut self, descriptor: ProviderDescriptor, provider: Arc<dyn Provider>) {
        let breaker = self
            .registry
            .register(&descriptor.name, descriptor.breaker_settings());
        tracing::info!(
            provider = %descriptor.name,
            priority = descriptor.priority_order,
            failure_threshold = descriptor.failure_threshold,
            "Registered provider"
        );
        self.entries.push(ChainEntry {
            descriptor,
            provider,
            breaker,
        });
        self.entries.sort_by_key(|e| e.descriptor.priority_order);
    }

    pub fn with_provider(mut self, descriptor: ProviderDescriptor, provider: Arc<dyn Provider>) -> Self {
        self.register(descriptor, provider);
        self
    }

    /// Provider names in the order they are tried.
    pub fn provider_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.descriptor.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Try providers in priority order until one succeeds.
    pub async fn run(&self, request: &GenerationRequest, deadline: Deadline) -> ChainOutcome {
        let mut report = ChainReport::default();
        let mut last_failure = None;

        for entry in &self.entries {
            let name = entry.descriptor.name.as_str();

            if deadline.is_expired() {
                tracing::debug!(provider = %name, "Deadline passed, provider not invoked");
                report.push(name, AttemptOutcome::DeadlineExceeded);
                continue;
            }

            match tokio::time::timeout(deadline.remaining(), self.attempt(entry, request)).await {
                Ok(Ok(generated)) => {
                    let response = ProviderResponse::success(&entry.descriptor, generated);
                    tracing::info!(
                        provider = %name,
                        attempt = report.attempt_count() + 1,
                        "Provider answered"
                    );
                    report.push(name, AttemptOutcome::Succeeded);
                    return ChainOutcome::Success { response, report };
                }
                Ok(Err(BreakerError::Open(open))) => {
                    tracing::debug!(provider = %name, retry_after = ?open.retry_after, "Breaker open, skipping provider");
                    report.push(
                        name,
                        AttemptOutcome::Skipped {
                            retry_after_ms: u64::try_from(open.retry_after.as_millis())
                                .unwrap_or(u64::MAX),
                        },
                    );
                }
                Ok(Err(BreakerError::Inner(err))) => {
                    tracing::warn!(provider = %name, error = %err, kind = err.kind(), "Provider failed");
                    report.push(
                        name,
                        AttemptOutcome::Failed {
                            kind: err.kind(),
                            message: err.to_string(),
                        },
                    );
                    last_failure = Some(ProviderResponse::failure(name));
                }
                Err(_elapsed) => {
                    tracing::warn!(provider = %name, "Request deadline expired during provider call");
                    report.push(name, AttemptOutcome::DeadlineExceeded);
                    last_failure = Some(ProviderResponse::failure(name));
                }
            }
        }

        tracing::warn!(
            providers = self.entries.len(),
            attempts = report.attempt_count(),
            "All providers exhausted"
        );
        ChainOutcome::Exhausted {
            report,
            last_failure,
        }
    }

    async fn attempt(
        &self,
        entry: &ChainEntry,
        request: &GenerationRequest,
    ) -> Result<GeneratedText, BreakerError<BackendError>> {
        let provider = entry.provider.as_ref();
        let name = entry.descriptor.name.as_str();
        let call_timeout = self.call_timeout;

        let call = move || async move {
            let generated = with_timeout(call_timeout, provider.generate(request)).await?;
            if generated.text.trim().is_empty() {
                return Err(BackendError::InvalidResponse(format!(
                    "{name} returned empty text"
                )));
            }
            Ok(generated)
        };

        entry
            .breaker
            .execute(|| execute_with_retry(&self.retry, call, BackendError::is_retryable))
            .await
    }
}
