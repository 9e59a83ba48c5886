//! JSON-over-HTTP adapters for collaborator services.
//!
//! # Responsibilities
//! - POST a JSON body to the configured endpoint
//! - Map transport failures and HTTP statuses onto `BackendError` kinds
//! - Decode the JSON payload into the shared collaborator types
//!
//! # Status Mapping
//! ```text
//! 429              → RateLimited   (retryable)
//! 5xx              → Unavailable   (retryable)
//! 401 / 403        → Unauthorized
//! 400 / 422 / 4xx  → MalformedInput
//! undecodable body → InvalidResponse
//! client timeout   → Timeout       (retryable)
//! connect failure  → Connection    (retryable)
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::backends::{
    BackendError, BackendResult, Classification, Classifier, ContextRetriever, GeneratedText,
    GenerationRequest, SearchResults, SearchService,
};
use crate::providers::Provider;

/// Thin wrapper over a shared `reqwest::Client` bound to one endpoint.
#[derive(Debug, Clone)]
struct JsonEndpoint {
    client: Client,
    url: Url,
    bearer: Option<String>,
    timeout: Duration,
}

impl JsonEndpoint {
    fn new(client: Client, url: Url, timeout: Duration) -> Self {
        Self {
            client,
            url,
            bearer: None,
            timeout,
        }
    }

    async fn post<B, R>(&self, body: &B) -> BackendResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(body);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(status, &detail));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("{}: {}", self.url, e)))
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else if err.is_connect() {
            BackendError::Connection(format!("{}: {}", self.url, err))
        } else if err.is_decode() || err.is_body() {
            BackendError::InvalidResponse(format!("{}: {}", self.url, err))
        } else {
            BackendError::Unavailable(format!("{}: {}", self.url, err))
        }
    }
}

/// Map a non-success HTTP status to an error kind.
pub fn status_error(status: StatusCode, detail: &str) -> BackendError {
    let message = if detail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", truncate(detail, 200))
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        s if s.is_server_error() => BackendError::Unavailable(message),
        _ => BackendError::MalformedInput(message),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Serialize)]
struct ClassifyBody<'a> {
    text: &'a str,
    language: &'a str,
}

/// Classifier reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    endpoint: JsonEndpoint,
}

impl HttpClassifier {
    pub fn new(client: Client, url: Url, timeout: Duration) -> Self {
        Self {
            endpoint: JsonEndpoint::new(client, url, timeout),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str, language: &str) -> BackendResult<Classification> {
        let raw: Classification = self.endpoint.post(&ClassifyBody { text, language }).await?;
        Ok(Classification::new(raw.intent, raw.confidence, raw.entities))
    }
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    language: &'a str,
}

/// Web search service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSearch {
    endpoint: JsonEndpoint,
}

impl HttpSearch {
    pub fn new(client: Client, url: Url, timeout: Duration) -> Self {
        Self {
            endpoint: JsonEndpoint::new(client, url, timeout),
        }
    }
}

#[async_trait]
impl SearchService for HttpSearch {
    async fn search(&self, query: &str, language: &str) -> BackendResult<SearchResults> {
        self.endpoint.post(&SearchBody { query, language }).await
    }
}

#[derive(Serialize)]
struct ContextBody<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ContextReply {
    #[serde(default)]
    context: Option<String>,
}

/// RAG context service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpContextRetriever {
    endpoint: JsonEndpoint,
}

impl HttpContextRetriever {
    pub fn new(client: Client, url: Url, timeout: Duration) -> Self {
        Self {
            endpoint: JsonEndpoint::new(client, url, timeout),
        }
    }
}

#[async_trait]
impl ContextRetriever for HttpContextRetriever {
    async fn retrieve(&self, query: &str) -> BackendResult<Option<String>> {
        let reply: ContextReply = self.endpoint.post(&ContextBody { query }).await?;
        Ok(reply.context.filter(|c| !c.trim().is_empty()))
    }
}

/// Generative provider reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    name: String,
    endpoint: JsonEndpoint,
}

impl HttpProvider {
    pub fn new(name: impl Into<String>, client: Client, url: Url, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            endpoint: JsonEndpoint::new(client, url, timeout),
        }
    }

    /// Send `Authorization: Bearer <token>` with every call.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.endpoint.bearer = Some(token.into());
        self
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerationRequest) -> BackendResult<GeneratedText> {
        self.endpoint.post(request).await
    }
}
