//! Request and response shapes for the HTTP API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::CacheStats;
use crate::coordinator::CompletedAnswer;
use crate::inference::ChatMessage;
use crate::retrieval::Language;
use crate::storage::Rating;

fn default_user_type() -> String {
    "visitor".to_string()
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    pub question: String,
    /// Short rolling window of prior turns; non-empty history bypasses the
    /// response cache.
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_user_type")]
    pub user_type: String,
    /// Stable id per kiosk conversation; a new question for the same id
    /// supersedes the one still streaming.
    #[serde(default)]
    pub client_session_id: Option<String>,
}

/// Final SSE event payload of `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonePayload {
    pub done: bool,
    pub complete: String,
    pub speech_text: String,
    pub category: Option<String>,
    pub query_id: Option<Uuid>,
    pub cached: bool,
}

impl From<CompletedAnswer> for DonePayload {
    fn from(answer: CompletedAnswer) -> Self {
        Self {
            done: true,
            complete: answer.answer,
            speech_text: answer.speech_text,
            category: answer.category,
            query_id: answer.query_id,
            cached: answer.cached,
        }
    }
}

/// Body of `POST /api/feedback`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBody {
    pub query_id: Uuid,
    pub rating: Rating,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Response of `POST /api/feedback`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}

/// Record counts per knowledge kind.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeCounts {
    pub faqs: usize,
    pub people: usize,
    pub facilities: usize,
    pub events: usize,
}

/// Subscriber counts per role.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberCounts {
    pub display: usize,
    pub admin: usize,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub inference_ready: bool,
    pub model: String,
    pub knowledge: KnowledgeCounts,
    pub cache: CacheStats,
    pub subscribers: SubscriberCounts,
    pub active_sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_body_minimal() {
        let body: ChatRequestBody =
            serde_json::from_str(r#"{"question": "How do I apply?"}"#).unwrap();
        assert_eq!(body.question, "How do I apply?");
        assert!(body.conversation_history.is_empty());
        assert_eq!(body.language, Language::Primary);
        assert_eq!(body.user_type, "visitor");
        assert!(body.client_session_id.is_none());
    }

    #[test]
    fn test_chat_body_full() {
        let body: ChatRequestBody = serde_json::from_str(
            r#"{
                "question": "and the fees?",
                "conversationHistory": [
                    {"role": "user", "content": "tell me about programs"},
                    {"role": "assistant", "content": "We offer engineering."}
                ],
                "language": "secondary",
                "userType": "student",
                "clientSessionId": "kiosk-7"
            }"#,
        )
        .unwrap();
        assert_eq!(body.conversation_history.len(), 2);
        assert_eq!(body.language, Language::Secondary);
        assert_eq!(body.user_type, "student");
        assert_eq!(body.client_session_id.as_deref(), Some("kiosk-7"));
    }

    #[test]
    fn test_done_payload_wire_shape() {
        let payload = DonePayload {
            done: true,
            complete: "answer".to_string(),
            speech_text: "answer".to_string(),
            category: Some("admissions".to_string()),
            query_id: Some(Uuid::nil()),
            cached: false,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["done"], true);
        assert_eq!(json["complete"], "answer");
        assert!(json.get("speechText").is_some());
        assert!(json.get("queryId").is_some());
    }

    #[test]
    fn test_feedback_body_rating_parsing() {
        let body: FeedbackBody = serde_json::from_str(
            r#"{"queryId": "6f2b8d0a-0000-4000-8000-000000000001", "rating": "negative"}"#,
        )
        .unwrap();
        assert_eq!(body.rating, Rating::Negative);
        assert!(body.comment.is_none());

        let invalid = serde_json::from_str::<FeedbackBody>(
            r#"{"queryId": "6f2b8d0a-0000-4000-8000-000000000001", "rating": "meh"}"#,
        );
        assert!(invalid.is_err());
    }
}
