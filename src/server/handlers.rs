//! HTTP handlers for the kiosk API.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::coordinator::{AnswerEvent, ChatRequest, Coordinator};
use crate::hub::{FanoutHub, SubscriberRole, WireEvent};
use crate::inference::InferenceProvider;
use crate::knowledge::KnowledgeStore;
use crate::storage::QueryLog;

use super::api::{
    ChatRequestBody, DonePayload, FeedbackBody, FeedbackResponse, HealthResponse, KnowledgeCounts,
    SubscriberCounts,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
    pub hub: Arc<FanoutHub>,
    pub log: QueryLog,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub provider: Arc<dyn InferenceProvider>,
    pub cache: Arc<ResponseCache>,
    /// Cancellation token for graceful shutdown.
    pub cancel: CancellationToken,
}

/// POST /api/chat - answer a question, streaming tokens as SSE events.
pub async fn post_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>>, impl IntoResponse> {
    if body.question.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Question is required" })),
        ));
    }

    let request = ChatRequest {
        question: body.question,
        history: body.conversation_history,
        language: body.language,
        user_type: body.user_type,
        client_session_id: body
            .client_session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    };

    let rx = state.coordinator.handle(request);
    let stream = ReceiverStream::new(rx).map(|event| {
        let sse_event = match event {
            AnswerEvent::Token(token) => Event::default()
                .event("token")
                .data(serde_json::json!({ "token": token }).to_string()),
            AnswerEvent::Done(done) => {
                let payload = DonePayload::from(done);
                Event::default().event("done").data(
                    serde_json::to_string(&payload)
                        .unwrap_or_else(|_| r#"{"done":true}"#.to_string()),
                )
            }
            AnswerEvent::Error { kind, message } => Event::default().event("error").data(
                serde_json::json!({ "kind": kind, "error": message }).to_string(),
            ),
        };
        Ok(sse_event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /api/feedback - store a visitor rating for a query.
pub async fn post_feedback(
    State(state): State<AppState>,
    Json(body): Json<FeedbackBody>,
) -> (StatusCode, Json<FeedbackResponse>) {
    if let Err(error) = state
        .log
        .create_feedback(body.query_id, body.rating, body.comment.clone())
        .await
    {
        tracing::error!(%error, "Failed to store feedback");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FeedbackResponse {
                success: false,
                message: "Failed to submit feedback".to_string(),
            }),
        );
    }

    let data = serde_json::json!({
        "queryId": body.query_id,
        "rating": body.rating,
    });
    if let Err(error) = state.log.record_event("feedback", &data, None, None).await {
        tracing::error!(%error, "Failed to record feedback analytics event");
    }

    (
        StatusCode::OK,
        Json(FeedbackResponse {
            success: true,
            message: "Thank you for your feedback!".to_string(),
        }),
    )
}

/// GET /api/health - inference reachability plus pipeline counters.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let inference_ready = state.provider.health_check().await;
    let knowledge = KnowledgeCounts {
        faqs: state.knowledge.list_active_faqs().await.len(),
        people: state.knowledge.list_people().await.len(),
        facilities: state.knowledge.list_facilities().await.len(),
        events: state.knowledge.list_upcoming_events().await.len(),
    };

    Json(HealthResponse {
        inference_ready,
        model: state.provider.model_name().to_string(),
        knowledge,
        cache: state.cache.stats(),
        subscribers: SubscriberCounts {
            display: state.hub.count(SubscriberRole::Display),
            admin: state.hub.count(SubscriberRole::Admin),
        },
        active_sessions: state.coordinator.active_sessions(),
    })
}

/// First frame expected on a new subscription connection.
#[derive(Debug, Deserialize)]
struct SubscribeMessage {
    #[serde(rename = "type")]
    kind: String,
    role: SubscriberRole,
}

/// GET /ws - persistent subscription channel for displays and admins.
pub async fn ws_subscribe(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();

    // The first text frame must declare the subscriber's role.
    let role = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<SubscribeMessage>(&text) {
                    Ok(message) if message.kind == "subscribe" => break message.role,
                    _ => {
                        let _ = sink
                            .send(Message::Text(
                                serde_json::json!({
                                    "type": "error",
                                    "message": "Expected a subscribe message"
                                })
                                .to_string(),
                            ))
                            .await;
                        return;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => {}
        }
    };

    let (id, mut events) = state.hub.subscribe(role);
    let _ = sink
        .send(Message::Text(
            serde_json::json!({ "type": "subscribed", "role": role }).to_string(),
        ))
        .await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    let Ok(payload) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sink.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    // Displays relay state events to their peers (e.g. a
                    // kiosk keeping a hologram screen in sync); the sender
                    // itself is excluded.
                    if role == SubscriberRole::Display {
                        if let Ok(event) = serde_json::from_str::<WireEvent>(&text) {
                            state.hub.broadcast(SubscriberRole::Display, &event, Some(id));
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.hub.unsubscribe(id);
}
