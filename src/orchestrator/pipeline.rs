//! The `respond` pipeline.

use arc_swap::ArcSwap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::backends::{
    dependency, BackendResult, ChatSession, Classification, Classifier, ContextRetriever,
    GenerationRequest, SearchResults, SearchService,
};
use crate::config::validation::validate_routing;
use crate::config::{RoutingConfig, TimeoutConfig, ValidationError};
use crate::observability::metrics;
use crate::providers::{ChainOutcome, FallbackChain};
use crate::resilience::{with_timeout, BreakerError, BreakerRegistry, BreakerSnapshot, Deadline};
use crate::response::{FallbackReason, FinalResponse, ResponseAssembler};
use crate::routing::{ConfidenceRouter, RouteTarget, RoutingDecision};
use crate::structured::StructuredResponder;

/// Routes each query to the right backends and always answers.
pub struct Orchestrator {
    pub(super) classifier: Arc<dyn Classifier>,
    pub(super) structured: Arc<dyn StructuredResponder>,
    pub(super) search: Arc<dyn SearchService>,
    pub(super) context: Arc<dyn ContextRetriever>,
    pub(super) chain: FallbackChain,
    pub(super) registry: Arc<BreakerRegistry>,
    pub(super) router: ArcSwap<ConfidenceRouter>,
    pub(super) assembler: ResponseAssembler,
    pub(super) timeouts: TimeoutConfig,
    pub(super) max_query_chars: usize,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("chain", &self.chain)
            .field("breakers", &self.registry.len())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Everything one request carries between pipeline stages.
struct RequestContext<'a> {
    request_id: Uuid,
    query: &'a str,
    session: &'a ChatSession,
    classification: Classification,
    decision: RoutingDecision,
    deadline: Deadline,
}

impl Orchestrator {
    /// Answer `query` for `session`. Never fails; degradations show up as
    /// `fallback_reason`.
    pub async fn respond(&self, query: &str, session: &ChatSession) -> FinalResponse {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "respond",
            request_id = %request_id,
            session = %session.session_id
        );
        let start = Instant::now();

        let response = self.run(request_id, query, session).instrument(span).await;

        metrics::record_request(
            response.route.map_or("none", |r| r.as_str()),
            response.fallback_reason.map(|r| r.as_str()),
            start,
        );
        response
    }

    async fn run(&self, request_id: Uuid, query: &str, session: &ChatSession) -> FinalResponse {
        let deadline = Deadline::after(self.timeouts.request());
        let query = query.trim();

        if query.is_empty() || query.chars().count() > self.max_query_chars {
            tracing::warn!(
                chars = query.chars().count(),
                max_chars = self.max_query_chars,
                "Rejecting empty or oversized query"
            );
            return self.assembler.canned(
                request_id,
                &Classification::unknown(),
                None,
                self.structured.canned_response(&session.language),
                FallbackReason::InvalidQuery,
            );
        }

        let classification = self.classify(query, &session.language, deadline).await;
        let decision = self.router.load().decide(&classification, query);
        tracing::info!(
            intent = %decision.classified_intent,
            confidence = decision.classifier_confidence,
            route = %decision.route_target,
            "Query routed"
        );

        let ctx = RequestContext {
            request_id,
            query,
            session,
            classification,
            decision,
            deadline,
        };

        match ctx.decision.route_target {
            RouteTarget::Structured => self.structured_path(&ctx).await,
            RouteTarget::Generative => self.generative_path(&ctx, None).await,
            RouteTarget::GenerativeWithSearch => self.generative_with_search(&ctx).await,
        }
    }

    async fn structured_path(&self, ctx: &RequestContext<'_>) -> FinalResponse {
        let rendered = with_timeout(
            ctx.deadline.remaining(),
            self.structured.respond(&ctx.classification, ctx.session),
        )
        .await;

        match rendered {
            Ok(text) if !text.trim().is_empty() => {
                return self.assembler.structured(ctx.request_id, &ctx.decision, text);
            }
            Ok(_) => tracing::warn!("Structured responder returned empty text, degrading to generative"),
            Err(e) => tracing::warn!(error = %e, "Structured path failed, degrading to generative"),
        }

        self.generative_path(ctx, Some(FallbackReason::StructuredPathFailed))
            .await
    }

    async fn generative_path(
        &self,
        ctx: &RequestContext<'_>,
        reason: Option<FallbackReason>,
    ) -> FinalResponse {
        let request = self.generation_request(ctx).await;

        match self.chain.run(&request, ctx.deadline).await {
            ChainOutcome::Success { response, .. } => {
                self.assembler
                    .generated(ctx.request_id, &ctx.decision, response, None, reason)
            }
            ChainOutcome::Exhausted { .. } => {
                let search = self.search(ctx.query, &ctx.session.language, ctx.deadline).await;
                self.search_or_canned(ctx, search)
            }
        }
    }

    async fn generative_with_search(&self, ctx: &RequestContext<'_>) -> FinalResponse {
        let request = self.generation_request(ctx).await;

        let (outcome, search) = tokio::join!(
            self.chain.run(&request, ctx.deadline),
            self.search(ctx.query, &ctx.session.language, ctx.deadline),
        );

        match (outcome, search) {
            (ChainOutcome::Success { response, .. }, search) => self.assembler.generated(
                ctx.request_id,
                &ctx.decision,
                response,
                search.as_ref(),
                Some(FallbackReason::ClassifierLowConfidence),
            ),
            (ChainOutcome::Exhausted { .. }, search) => self.search_or_canned(ctx, search),
        }
    }

    /// Answer from search when it yields text, otherwise the canned floor.
    fn search_or_canned(
        &self,
        ctx: &RequestContext<'_>,
        search: Option<SearchResults>,
    ) -> FinalResponse {
        match search {
            Some(results) if self.assembler.answers_from(&results) => self.assembler.searched(
                ctx.request_id,
                &ctx.decision,
                &results,
                Some(FallbackReason::SearchFallbackUsed),
            ),
            Some(_) => {
                tracing::info!("Search results yield no answer text");
                self.canned(ctx)
            }
            None => self.canned(ctx),
        }
    }

    fn canned(&self, ctx: &RequestContext<'_>) -> FinalResponse {
        tracing::warn!("Providers and search unavailable, answering with canned response");
        self.assembler.canned(
            ctx.request_id,
            &ctx.classification,
            Some(ctx.decision.route_target),
            self.structured.canned_response(&ctx.session.language),
            FallbackReason::AllProvidersExhausted,
        )
    }

    async fn classify(&self, query: &str, language: &str, deadline: Deadline) -> Classification {
        let limit = deadline.budget(self.timeouts.classify());
        match self
            .guarded(dependency::CLASSIFIER, limit, self.classifier.classify(query, language))
            .await
        {
            Ok(c) => Classification::new(c.intent, c.confidence, c.entities),
            Err(e) => {
                tracing::warn!(error = %e, "Classifier unavailable, treating as zero confidence");
                Classification::unknown()
            }
        }
    }

    /// Search results worth showing, or `None`.
    async fn search(&self, query: &str, language: &str, deadline: Deadline) -> Option<SearchResults> {
        if deadline.is_expired() {
            tracing::debug!("Deadline passed, search not invoked");
            return None;
        }
        let limit = deadline.budget(self.timeouts.search());
        match self
            .guarded(dependency::SEARCH, limit, self.search.search(query, language))
            .await
        {
            Ok(results) if !results.is_empty() => Some(results),
            Ok(_) => {
                tracing::info!("Search returned no usable results");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Search fallback failed");
                None
            }
        }
    }

    /// Best effort: any failure just omits the context.
    async fn retrieve_context(&self, query: &str, deadline: Deadline) -> Option<String> {
        if deadline.is_expired() {
            return None;
        }
        let limit = deadline.budget(self.timeouts.context());
        match self
            .guarded(dependency::CONTEXT, limit, self.context.retrieve(query))
            .await
        {
            Ok(context) => context,
            Err(e) => {
                tracing::debug!(error = %e, "Context retrieval failed, continuing without");
                None
            }
        }
    }

    async fn generation_request(&self, ctx: &RequestContext<'_>) -> GenerationRequest {
        GenerationRequest {
            query: ctx.query.to_string(),
            context: self.retrieve_context(ctx.query, ctx.deadline).await,
            history: ctx.session.history.clone(),
        }
    }

    /// Run a collaborator call under its breaker and a time limit.
    async fn guarded<T, Fut>(
        &self,
        dependency: &str,
        limit: Duration,
        call: Fut,
    ) -> Result<T, BreakerError<crate::backends::BackendError>>
    where
        Fut: Future<Output = BackendResult<T>>,
    {
        self.registry
            .breaker(dependency)
            .execute(|| with_timeout(limit, call))
            .await
    }

    /// Replace routing thresholds and heuristics. Breakers are untouched.
    pub fn apply_routing(&self, routing: &RoutingConfig) -> Result<(), Vec<ValidationError>> {
        validate_routing(routing)?;
        self.router.store(Arc::new(ConfidenceRouter::new(routing)));
        tracing::info!(
            high = routing.high_confidence,
            medium = routing.medium_confidence,
            low = routing.low_confidence,
            "Routing configuration applied"
        );
        Ok(())
    }

    pub fn breaker_snapshot(&self) -> Vec<BreakerSnapshot> {
        self.registry.snapshot()
    }

    pub fn registry(&self) -> &Arc<BreakerRegistry> {
        &self.registry
    }

    /// Provider names in fallback order.
    pub fn providers(&self) -> Vec<&str> {
        self.chain.provider_names()
    }
}
