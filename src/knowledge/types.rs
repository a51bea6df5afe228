//! Knowledge record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A frequently asked question with a curated answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    /// Topic label assigned by the admin layer (admissions, academic, ...).
    pub category: String,
    /// Higher priority wins keyword-match ties.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// A faculty or staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Uuid,
    pub full_name: String,
    pub position: String,
    pub department: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A campus facility (library, lab, gym, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub location: String,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A scheduled campus event or announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub location: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default = "default_event_kind")]
    pub kind: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn default_status() -> String {
    "active".to_string()
}

fn default_event_kind() -> String {
    "event".to_string()
}

impl Faq {
    /// Combined question and answer text, used for keyword matching.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!("{} {}", self.question, self.answer).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faq_search_text_combines_question_and_answer() {
        let faq = Faq {
            id: Uuid::new_v4(),
            question: "How do I apply?".to_string(),
            answer: "Visit the registrar.".to_string(),
            category: "admissions".to_string(),
            priority: 0,
            is_active: true,
        };
        assert_eq!(faq.search_text(), "how do i apply? visit the registrar.");
    }

    #[test]
    fn test_faq_deserialize_defaults() {
        let json = r#"{
            "id": "6f2b8d0a-0000-4000-8000-000000000001",
            "question": "Q",
            "answer": "A",
            "category": "general"
        }"#;
        let faq: Faq = serde_json::from_str(json).unwrap();
        assert_eq!(faq.priority, 0);
        assert!(faq.is_active);
    }
}
