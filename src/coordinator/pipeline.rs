//! The generation coordinator: one streaming answer per request.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::hub::FanoutHub;
use crate::inference::{
    build_messages, find_hedging, ChatMessage, InferenceError, InferenceProvider,
    ANSWER_TOKEN_BUDGET,
};
use crate::knowledge::KnowledgeStore;
use crate::retrieval::{
    fallback_answer, DirectSource, Language, QueryCategory, RetrievalEngine, RetrievalOutcome,
};
use crate::storage::{NewQuery, QueryLog};

use super::sessions::{SessionRegistry, StreamSession};
use super::speech::prepare_speech_text;

/// Category label written for answers served from the response cache.
const CACHED_CATEGORY: &str = "cached";

/// One kiosk question with its conversation context.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub question: String,
    /// Short rolling window of prior user/assistant turns.
    pub history: Vec<ChatMessage>,
    pub language: Language,
    pub user_type: String,
    pub client_session_id: String,
}

/// Error kinds surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The inference service is unreachable or the model is not loaded.
    Unavailable,
    /// The inference call exceeded its wall-clock bound.
    Timeout,
    /// Any other transport failure.
    Failed,
}

/// Summary of a finished answer, sent after the last token.
#[derive(Debug, Clone)]
pub struct CompletedAnswer {
    /// Persisted query id; `None` if the storage write failed.
    pub query_id: Option<Uuid>,
    pub answer: String,
    pub speech_text: String,
    pub category: Option<String>,
    pub cached: bool,
}

/// Events streamed back to the caller.
#[derive(Debug, Clone)]
pub enum AnswerEvent {
    /// One chunk of answer text, forwarded as it arrives.
    Token(String),
    /// The answer is complete and side effects have been applied.
    Done(CompletedAnswer),
    /// The request failed; no side effects were applied.
    Error { kind: ErrorKind, message: String },
}

/// Orchestrates retrieval, caching, streaming inference, persistence and
/// fan-out for each question. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Coordinator {
    engine: Arc<RetrievalEngine>,
    provider: Arc<dyn InferenceProvider>,
    cache: Arc<ResponseCache>,
    hub: Arc<FanoutHub>,
    log: QueryLog,
    sessions: SessionRegistry,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        knowledge: Arc<dyn KnowledgeStore>,
        provider: Arc<dyn InferenceProvider>,
        cache: Arc<ResponseCache>,
        hub: Arc<FanoutHub>,
        log: QueryLog,
    ) -> Self {
        Self {
            engine: Arc::new(RetrievalEngine::new(knowledge)),
            provider,
            cache,
            hub,
            log,
            sessions: SessionRegistry::new(),
        }
    }

    /// Number of clients with an in-flight generation.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.active_count()
    }

    /// Handle a question, superseding any still-running generation for the
    /// same client session. Returns the event stream for this request.
    #[must_use]
    pub fn handle(&self, request: ChatRequest) -> mpsc::Receiver<AnswerEvent> {
        let (tx, rx) = mpsc::channel(32);
        let coordinator = self.clone();
        tokio::spawn(async move {
            let session = coordinator.sessions.begin(&request.client_session_id);
            coordinator.run(&request, &session, tx).await;
            coordinator
                .sessions
                .finish(&request.client_session_id, session.id);
        });
        rx
    }

    async fn run(
        &self,
        request: &ChatRequest,
        session: &StreamSession,
        tx: mpsc::Sender<AnswerEvent>,
    ) {
        let started = Instant::now();

        match self.engine.retrieve(&request.question, request.language).await {
            RetrievalOutcome::Direct { answer, source } => {
                let category = match source {
                    DirectSource::Greeting => Some("greeting".to_string()),
                    DirectSource::Gratitude => Some("gratitude".to_string()),
                    DirectSource::Faq => Some(classify(&request.question)),
                };
                self.complete(request, session, answer, category, started, false, &tx)
                    .await;
            }
            RetrievalOutcome::Rejected { reason } => {
                tracing::debug!(?reason, "Question rejected; answering with fallback");
                self.complete(
                    request,
                    session,
                    fallback_answer().to_string(),
                    None,
                    started,
                    false,
                    &tx,
                )
                .await;
            }
            RetrievalOutcome::Evidence(bundle) => {
                self.generate(request, session, &bundle.context, started, tx)
                    .await;
            }
        }
    }

    /// Grounded model call for an assembled evidence context.
    async fn generate(
        &self,
        request: &ChatRequest,
        session: &StreamSession,
        evidence: &str,
        started: Instant,
        tx: mpsc::Sender<AnswerEvent>,
    ) {
        // Context-dependent answers must not be served from or written to
        // the cache, so any history bypasses it entirely.
        if request.history.is_empty() {
            if let Some(hit) = self.cache.get(&self.cache_key(request)) {
                tracing::debug!(hits = hit.hit_count, "Cache hit");
                self.complete_cached(request, session, hit.answer, hit.speech_text, &tx)
                    .await;
                return;
            }
        }

        let messages = build_messages(
            evidence,
            &request.history,
            &request.question,
            request.language,
        );
        let mut stream = match self.provider.chat_stream(messages, ANSWER_TOKEN_BUDGET).await {
            Ok(stream) => stream,
            Err(error) => {
                self.fail(&error, false, &tx).await;
                return;
            }
        };

        let mut answer = String::new();
        loop {
            tokio::select! {
                () = session.cancel.cancelled() => {
                    tracing::debug!(session = %session.id, "Generation superseded mid-stream");
                    self.hub.broadcast_speaking(false, "");
                    return;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(token)) => {
                        answer.push_str(&token);
                        let _ = tx.send(AnswerEvent::Token(token)).await;
                    }
                    Some(Err(error)) => {
                        self.fail(&error, true, &tx).await;
                        return;
                    }
                    None => break,
                },
            }
        }

        // The stream may have finished in the same instant a newer request
        // superseded this session; side effects must not be applied then.
        if session.cancel.is_cancelled() {
            tracing::debug!(session = %session.id, "Generation superseded at completion");
            self.hub.broadcast_speaking(false, "");
            return;
        }

        if let Some(phrase) = find_hedging(&answer) {
            tracing::warn!(phrase, "Hedging detected in answer; substituting fallback");
            let _ = self
                .log
                .record_event(
                    "hallucination_filtered",
                    &serde_json::json!({ "phrase": phrase }),
                    Some(&request.client_session_id),
                    Some(&request.user_type),
                )
                .await;
            answer = fallback_answer().to_string();
        }
        if answer.trim().is_empty() {
            answer = fallback_answer().to_string();
        }

        let category = Some(classify(&request.question));
        self.complete(request, session, answer, category, started, true, &tx)
            .await;
    }

    /// Apply completion side effects and emit the final events.
    #[allow(clippy::too_many_arguments)]
    async fn complete(
        &self,
        request: &ChatRequest,
        session: &StreamSession,
        answer: String,
        category: Option<String>,
        started: Instant,
        already_streamed: bool,
        tx: &mpsc::Sender<AnswerEvent>,
    ) {
        if session.cancel.is_cancelled() {
            self.hub.broadcast_speaking(false, "");
            return;
        }

        if !already_streamed {
            let _ = tx.send(AnswerEvent::Token(answer.clone())).await;
        }

        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let speech_text = prepare_speech_text(&answer);

        let query = self.persist(request, &answer, category.clone(), response_time_ms).await;

        if request.history.is_empty() {
            self.cache
                .set(&self.cache_key(request), &answer, &speech_text);
        }

        self.hub.broadcast_speaking(true, &speech_text);
        if let Some(query) = &query {
            self.hub.broadcast_new_query(query.clone());
        }

        self.track(request, category.as_deref(), response_time_ms, false)
            .await;

        let _ = tx
            .send(AnswerEvent::Done(CompletedAnswer {
                query_id: query.map(|q| q.id),
                answer,
                speech_text,
                category,
                cached: false,
            }))
            .await;
    }

    /// Completion path for a cache hit: persisted for the admin log but with
    /// zero response time, and without an admin new-query notification.
    async fn complete_cached(
        &self,
        request: &ChatRequest,
        session: &StreamSession,
        answer: String,
        speech_text: String,
        tx: &mpsc::Sender<AnswerEvent>,
    ) {
        if session.cancel.is_cancelled() {
            self.hub.broadcast_speaking(false, "");
            return;
        }

        let _ = tx.send(AnswerEvent::Token(answer.clone())).await;

        let category = Some(CACHED_CATEGORY.to_string());
        let query = self.persist(request, &answer, category.clone(), 0).await;

        self.hub.broadcast_speaking(true, &speech_text);
        self.track(request, category.as_deref(), 0, true).await;

        let _ = tx
            .send(AnswerEvent::Done(CompletedAnswer {
                query_id: query.map(|q| q.id),
                answer,
                speech_text,
                category,
                cached: true,
            }))
            .await;
    }

    async fn persist(
        &self,
        request: &ChatRequest,
        answer: &str,
        category: Option<String>,
        response_time_ms: u64,
    ) -> Option<crate::storage::Query> {
        let query = match self
            .log
            .create_query(NewQuery {
                question: request.question.clone(),
                answer: answer.to_string(),
                user_type: request.user_type.clone(),
                category,
                response_time_ms,
            })
            .await
        {
            Ok(query) => Some(query),
            Err(error) => {
                tracing::error!(%error, "Failed to persist query");
                None
            }
        };

        let query_id = query.as_ref().map(|q| q.id);
        if let Err(error) = self
            .log
            .record_chat_message(query_id, &request.question, true)
            .await
        {
            tracing::error!(%error, "Failed to record user message");
        }
        if let Err(error) = self.log.record_chat_message(query_id, answer, false).await {
            tracing::error!(%error, "Failed to record assistant message");
        }

        query
    }

    async fn track(
        &self,
        request: &ChatRequest,
        category: Option<&str>,
        response_time_ms: u64,
        cached: bool,
    ) {
        let data = serde_json::json!({
            "category": category,
            "responseTimeMs": response_time_ms,
            "cached": cached,
        });
        if let Err(error) = self
            .log
            .record_event(
                "chat_query",
                &data,
                Some(&request.client_session_id),
                Some(&request.user_type),
            )
            .await
        {
            tracing::error!(%error, "Failed to record analytics event");
        }
    }

    async fn fail(&self, error: &InferenceError, mid_stream: bool, tx: &mpsc::Sender<AnswerEvent>) {
        let kind = match error {
            InferenceError::Unavailable(_) | InferenceError::ModelMissing(_) => {
                ErrorKind::Unavailable
            }
            InferenceError::Timeout => ErrorKind::Timeout,
            InferenceError::RequestFailed(_) => ErrorKind::Failed,
        };
        tracing::error!(%error, ?kind, mid_stream, "Inference call failed");

        // Timeouts and mid-stream failures follow cancellation semantics:
        // displays revert to idle and nothing is persisted.
        if mid_stream || error.is_timeout() {
            self.hub.broadcast_speaking(false, "");
        }
        let _ = tx
            .send(AnswerEvent::Error {
                kind,
                message: error.to_string(),
            })
            .await;
    }

    fn cache_key(&self, request: &ChatRequest) -> String {
        format!("{}:{}", request.language.as_str(), request.question)
    }
}

fn classify(question: &str) -> String {
    QueryCategory::classify(question).as_str().to_string()
}
