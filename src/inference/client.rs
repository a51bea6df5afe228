//! Ollama chat client with token streaming.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the health probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of retries for transient failures when opening a stream.
const MAX_RETRIES: u32 = 3;

/// Determine if a request should be retried based on status code and attempt count.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    if attempt >= MAX_RETRIES {
        return false;
    }
    (500..600).contains(&status_code)
}

/// Calculate exponential backoff duration for retry attempts.
fn calculate_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt)
}

/// Message role in a chat exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Errors from inference operations.
#[derive(thiserror::Error, Debug)]
pub enum InferenceError {
    /// Service unreachable; a deployment problem, not a content gap.
    #[error("Inference service is not reachable at {0}; is it running?")]
    Unavailable(String),
    /// Requested model is not loaded on the service.
    #[error("Model \"{0}\" not found; pull it on the inference service first")]
    ModelMissing(String),
    /// Generic request failure.
    #[error("Inference request failed: {0}")]
    RequestFailed(String),
    /// Wall-clock bound exceeded.
    #[error("Inference request timed out")]
    Timeout,
}

impl InferenceError {
    /// Timeouts are handled with cancellation semantics by the caller.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, InferenceError::Timeout)
    }
}

/// Stream of answer text chunks from the inference service.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, InferenceError>> + Send>>;

/// Trait for streaming inference backends.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Open a deterministic (temperature zero) streaming chat completion.
    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<TokenStream, InferenceError>;

    /// Check whether the service is reachable.
    async fn health_check(&self) -> bool;

    /// The configured model name.
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    keep_alive: &'a str,
    options: SamplingOptions,
}

/// Sampling pinned for grounded generation: zero temperature, top-k 1 and a
/// fixed seed so identical inputs produce identical outputs.
#[derive(Serialize)]
struct SamplingOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
    seed: u32,
    num_predict: u32,
}

impl SamplingOptions {
    fn deterministic(num_predict: u32) -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.0,
            top_k: 1,
            repeat_penalty: 1.1,
            seed: 42,
            num_predict,
        }
    }
}

#[derive(Deserialize, Default)]
struct ChatChunk {
    #[serde(default)]
    message: ChunkMessage,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize, Default)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Client for a local Ollama instance.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: Url,
    model: String,
}

impl OllamaClient {
    /// Create a client for the given base URL and model.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::RequestFailed` if the base URL is not a valid URL.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| InferenceError::RequestFailed(format!("invalid base URL: {e}")))?;
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| InferenceError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            model: model.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    fn map_request_error(&self, e: &reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout
        } else if e.is_connect() {
            InferenceError::Unavailable(self.base_url.to_string())
        } else {
            InferenceError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl InferenceProvider for OllamaClient {
    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<TokenStream, InferenceError> {
        let url = self.endpoint("/api/chat");
        let body = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: true,
            keep_alive: "10m",
            options: SamplingOptions::deterministic(max_tokens),
        };

        let mut attempt = 0;
        let response = loop {
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| self.map_request_error(&e))?;

            let status = response.status();
            if status.is_success() {
                break response;
            }
            if status.as_u16() == 404 {
                return Err(InferenceError::ModelMissing(self.model.clone()));
            }
            if should_retry(status.as_u16(), attempt) {
                tokio::time::sleep(calculate_backoff(attempt)).await;
                attempt += 1;
                continue;
            }
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::RequestFailed(format!("HTTP {status}: {text}")));
        };

        let state = StreamState {
            inner: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            buffer: String::new(),
            pending: VecDeque::new(),
            base_url: self.base_url.to_string(),
            finished: false,
        };
        Ok(Box::pin(futures_util::stream::unfold(state, next_token)))
    }

    async fn health_check(&self) -> bool {
        let url = self.endpoint("/api/tags");
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Inference health check failed");
                false
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

struct StreamState {
    inner: Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>,
    buffer: String,
    pending: VecDeque<Result<String, InferenceError>>,
    base_url: String,
    finished: bool,
}

/// Drain complete newline-delimited JSON chunks from the buffer into pending
/// tokens. Lines that do not parse are skipped.
fn drain_lines(state: &mut StreamState) {
    while let Some(pos) = state.buffer.find('\n') {
        let line: String = state.buffer.drain(..=pos).collect();
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(chunk) = serde_json::from_str::<ChatChunk>(line) {
            if !chunk.message.content.is_empty() {
                state.pending.push_back(Ok(chunk.message.content));
            }
            if chunk.done {
                state.finished = true;
            }
        }
    }
}

async fn next_token(
    mut state: StreamState,
) -> Option<(Result<String, InferenceError>, StreamState)> {
    loop {
        if let Some(item) = state.pending.pop_front() {
            return Some((item, state));
        }
        if state.finished {
            return None;
        }
        match state.inner.next().await {
            Some(Ok(bytes)) => {
                state.buffer.push_str(&String::from_utf8_lossy(&bytes));
                drain_lines(&mut state);
            }
            Some(Err(e)) => {
                state.finished = true;
                let error = if e.is_timeout() {
                    InferenceError::Timeout
                } else if e.is_connect() {
                    InferenceError::Unavailable(state.base_url.clone())
                } else {
                    InferenceError::RequestFailed(e.to_string())
                };
                state.pending.push_back(Err(error));
            }
            None => {
                state.finished = true;
                if !state.buffer.trim().is_empty() {
                    state.buffer.push('\n');
                    drain_lines(&mut state);
                }
            }
        }
    }
}
