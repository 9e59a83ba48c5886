//! Orchestrator construction.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::backends::{dependency, Classifier, ContextRetriever, Disabled, SearchService};
use crate::config::{ResponseConfig, RoutingConfig, StructuredConfig, TimeoutConfig};
use crate::orchestrator::Orchestrator;
use crate::providers::FallbackChain;
use crate::resilience::{BreakerRegistry, RetryPolicy};
use crate::response::ResponseAssembler;
use crate::routing::ConfidenceRouter;
use crate::structured::{StructuredResponder, TemplateResponder};

/// Assembles an [`Orchestrator`]. Unset collaborators are disabled.
pub struct OrchestratorBuilder {
    registry: Arc<BreakerRegistry>,
    classifier: Arc<dyn Classifier>,
    structured: Arc<dyn StructuredResponder>,
    search: Arc<dyn SearchService>,
    context: Arc<dyn ContextRetriever>,
    chain: Option<FallbackChain>,
    routing: RoutingConfig,
    response: ResponseConfig,
    timeouts: TimeoutConfig,
    max_query_chars: usize,
}

impl OrchestratorBuilder {
    pub fn new(registry: Arc<BreakerRegistry>) -> Self {
        Self {
            registry,
            classifier: Arc::new(Disabled::new(dependency::CLASSIFIER)),
            structured: Arc::new(TemplateResponder::default()),
            search: Arc::new(Disabled::new(dependency::SEARCH)),
            context: Arc::new(Disabled::new(dependency::CONTEXT)),
            chain: None,
            routing: RoutingConfig::default(),
            response: ResponseConfig::default(),
            timeouts: TimeoutConfig::default(),
            max_query_chars: StructuredConfig::default().max_query_chars,
        }
    }

    /// Registry shared by the chain and the service breakers.
    pub fn registry(&self) -> Arc<BreakerRegistry> {
        self.registry.clone()
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn structured(mut self, structured: Arc<dyn StructuredResponder>) -> Self {
        self.structured = structured;
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchService>) -> Self {
        self.search = search;
        self
    }

    pub fn context(mut self, context: Arc<dyn ContextRetriever>) -> Self {
        self.context = context;
        self
    }

    /// The chain must have been built on [`Self::registry`].
    pub fn chain(mut self, chain: FallbackChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    pub fn response(mut self, response: ResponseConfig) -> Self {
        self.response = response;
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn max_query_chars(mut self, max_query_chars: usize) -> Self {
        self.max_query_chars = max_query_chars;
        self
    }

    pub fn build(self) -> Orchestrator {
        for name in dependency::RESERVED {
            self.registry.breaker(name);
        }

        let chain = self.chain.unwrap_or_else(|| {
            tracing::warn!("No generative providers configured");
            FallbackChain::new(
                self.registry.clone(),
                RetryPolicy::default(),
                self.timeouts.provider_call(),
            )
        });

        Orchestrator {
            classifier: self.classifier,
            structured: self.structured,
            search: self.search,
            context: self.context,
            chain,
            registry: self.registry,
            router: ArcSwap::from_pointee(ConfidenceRouter::new(&self.routing)),
            assembler: ResponseAssembler::new(&self.response),
            timeouts: self.timeouts,
            max_query_chars: self.max_query_chars,
        }
    }
}
