//! Storage record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed kiosk interaction, persisted exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub user_type: String,
    pub category: Option<String>,
    pub response_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the coordinator when persisting a completed query.
#[derive(Debug, Clone)]
pub struct NewQuery {
    pub question: String,
    pub answer: String,
    pub user_type: String,
    pub category: Option<String>,
    pub response_time_ms: u64,
}

/// Visitor rating on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Positive => "positive",
            Rating::Negative => "negative",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "positive" => Some(Rating::Positive),
            "negative" => Some(Rating::Negative),
            _ => None,
        }
    }
}

/// Stored feedback row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub query_id: Uuid,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tables governed by the retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetainedTable {
    ChatHistory,
    Queries,
    AnalyticsEvents,
    Feedback,
}

impl RetainedTable {
    /// All retained tables, in cleanup order (most sensitive first).
    pub const ALL: [RetainedTable; 4] = [
        RetainedTable::ChatHistory,
        RetainedTable::Queries,
        RetainedTable::AnalyticsEvents,
        RetainedTable::Feedback,
    ];

    /// The SQL table name.
    #[must_use]
    pub fn table_name(self) -> &'static str {
        match self {
            RetainedTable::ChatHistory => "chat_history",
            RetainedTable::Queries => "queries",
            RetainedTable::AnalyticsEvents => "analytics_events",
            RetainedTable::Feedback => "feedback",
        }
    }
}
