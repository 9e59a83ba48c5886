//! Shared fakes for integration and load testing.

#![allow(dead_code)]

use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use chat_orchestrator::backends::{
    BackendError, BackendResult, Classification, Classifier, ContextRetriever, Entity,
    GeneratedText, GenerationRequest, SearchHit, SearchResults, SearchService,
};
use chat_orchestrator::providers::Provider;

/// Replays a script of results, repeating the last entry once the rest are used.
struct Script<T> {
    steps: Mutex<Vec<BackendResult<T>>>,
    calls: AtomicU32,
}

impl<T: Clone> Script<T> {
    fn new(steps: Vec<BackendResult<T>>) -> Self {
        assert!(!steps.is_empty(), "script needs at least one step");
        Self {
            steps: Mutex::new(steps),
            calls: AtomicU32::new(0),
        }
    }

    fn next(&self) -> BackendResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.remove(0)
        } else {
            steps[0].clone()
        }
    }

    fn replace(&self, steps: Vec<BackendResult<T>>) {
        *self.steps.lock().unwrap() = steps;
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

pub struct ScriptedClassifier {
    script: Script<Classification>,
}

impl ScriptedClassifier {
    pub fn returning(intent: &str, confidence: f32, entities: Vec<Entity>) -> Arc<Self> {
        Self::scripted(vec![Ok(Classification::new(intent, confidence, entities))])
    }

    pub fn failing(err: BackendError) -> Arc<Self> {
        Self::scripted(vec![Err(err)])
    }

    pub fn scripted(steps: Vec<BackendResult<Classification>>) -> Arc<Self> {
        Arc::new(Self {
            script: Script::new(steps),
        })
    }

    pub fn calls(&self) -> u32 {
        self.script.calls()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _text: &str, _language: &str) -> BackendResult<Classification> {
        self.script.next()
    }
}

pub struct ScriptedProvider {
    name: String,
    script: Script<GeneratedText>,
    latency: Duration,
}

impl ScriptedProvider {
    pub fn new(name: &str, steps: Vec<BackendResult<GeneratedText>>) -> Arc<Self> {
        Self::slow(name, Duration::ZERO, steps)
    }

    /// Sleeps `latency` before answering.
    pub fn slow(name: &str, latency: Duration, steps: Vec<BackendResult<GeneratedText>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Script::new(steps),
            latency,
        })
    }

    pub fn answering(name: &str, text: &str) -> Arc<Self> {
        Self::new(name, vec![generated(text)])
    }

    pub fn down(name: &str) -> Arc<Self> {
        Self::new(name, vec![Err(unavailable(name))])
    }

    /// Swap the remaining script, e.g. to let a provider recover.
    pub fn rescript(&self, steps: Vec<BackendResult<GeneratedText>>) {
        self.script.replace(steps);
    }

    pub fn calls(&self) -> u32 {
        self.script.calls()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _request: &GenerationRequest) -> BackendResult<GeneratedText> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.script.next()
    }
}

pub struct ScriptedSearch {
    script: Script<SearchResults>,
}

impl ScriptedSearch {
    pub fn returning(results: SearchResults) -> Arc<Self> {
        Arc::new(Self {
            script: Script::new(vec![Ok(results)]),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            script: Script::new(vec![Err(unavailable("search"))]),
        })
    }

    pub fn calls(&self) -> u32 {
        self.script.calls()
    }
}

#[async_trait]
impl SearchService for ScriptedSearch {
    async fn search(&self, _query: &str, _language: &str) -> BackendResult<SearchResults> {
        self.script.next()
    }
}

/// Context retriever that always finds the same passage.
pub struct FixedContext(pub &'static str);

#[async_trait]
impl ContextRetriever for FixedContext {
    async fn retrieve(&self, _query: &str) -> BackendResult<Option<String>> {
        Ok(Some(self.0.to_string()))
    }
}

pub fn generated(text: &str) -> BackendResult<GeneratedText> {
    Ok(GeneratedText {
        text: text.to_string(),
        sources: Vec::new(),
        confidence: None,
    })
}

pub fn unavailable(who: &str) -> BackendError {
    BackendError::Unavailable(format!("{who} returned 503"))
}

pub fn search_results(answer: &str, hits: &[(&str, &str)]) -> SearchResults {
    SearchResults {
        answer: answer.to_string(),
        results: hits
            .iter()
            .map(|(title, url)| SearchHit {
                title: title.to_string(),
                url: url.to_string(),
                snippet: format!("About {title}"),
            })
            .collect(),
    }
}

/// Start a programmable JSON backend on an ephemeral port.
///
/// `f` maps each request body to a status code and response body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let body = read_request_body(&mut socket).await;
                        let (status, reply) = f(body).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            reply.len(),
                            reply
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read one HTTP/1.1 request and return its body.
async fn read_request_body(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = find_header_end(&buf) else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= header_end + 4 + content_length {
            return String::from_utf8_lossy(&buf[header_end + 4..header_end + 4 + content_length])
                .into_owned();
        }
    }

    String::new()
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
