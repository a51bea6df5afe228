//! Read access to the knowledge base.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::types::{Event, Facility, Faq, Person};

/// Read-only view of the knowledge base consumed by the retrieval pipeline.
///
/// The admin/CRUD layer owns the records; implementations only need to hand
/// back current snapshots of each kind.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// All FAQs currently marked active.
    async fn list_active_faqs(&self) -> Vec<Faq>;
    /// All faculty and staff records.
    async fn list_people(&self) -> Vec<Person>;
    /// All facility records.
    async fn list_facilities(&self) -> Vec<Facility>;
    /// Active events that have not yet ended, soonest first.
    async fn list_upcoming_events(&self) -> Vec<Event>;
}

/// Serializable bundle of all record kinds, used to seed a store from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSnapshot {
    pub faqs: Vec<Faq>,
    pub people: Vec<Person>,
    pub facilities: Vec<Facility>,
    pub events: Vec<Event>,
}

/// In-memory knowledge store.
///
/// Holds the snapshot the external CRUD layer last pushed; `replace` swaps it
/// atomically so readers never observe a half-updated set.
#[derive(Debug, Default)]
pub struct MemoryKnowledgeStore {
    inner: RwLock<KnowledgeSnapshot>,
}

impl MemoryKnowledgeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: KnowledgeSnapshot) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(snapshot),
        })
    }

    /// Replace the entire snapshot.
    pub async fn replace(&self, snapshot: KnowledgeSnapshot) {
        *self.inner.write().await = snapshot;
    }

    /// Record counts per kind: (faqs, people, facilities, events).
    pub async fn counts(&self) -> (usize, usize, usize, usize) {
        let snapshot = self.inner.read().await;
        (
            snapshot.faqs.len(),
            snapshot.people.len(),
            snapshot.facilities.len(),
            snapshot.events.len(),
        )
    }
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    async fn list_active_faqs(&self) -> Vec<Faq> {
        self.inner
            .read()
            .await
            .faqs
            .iter()
            .filter(|faq| faq.is_active)
            .cloned()
            .collect()
    }

    async fn list_people(&self) -> Vec<Person> {
        self.inner.read().await.people.clone()
    }

    async fn list_facilities(&self) -> Vec<Facility> {
        self.inner.read().await.facilities.clone()
    }

    async fn list_upcoming_events(&self) -> Vec<Event> {
        let now = Utc::now();
        let mut events: Vec<Event> = self
            .inner
            .read()
            .await
            .events
            .iter()
            .filter(|event| {
                event.is_active && event.ends_at.unwrap_or(event.starts_at) >= now
            })
            .cloned()
            .collect();
        events.sort_by_key(|event| event.starts_at);
        events
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;

    fn event_at(offset_hours: i64, title: &str) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "desc".to_string(),
            starts_at: Utc::now() + Duration::hours(offset_hours),
            ends_at: None,
            location: "Main Hall".to_string(),
            department: None,
            organizer: None,
            kind: "event".to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_inactive_faqs_filtered() {
        let store = MemoryKnowledgeStore::new();
        store
            .replace(KnowledgeSnapshot {
                faqs: vec![
                    Faq {
                        id: Uuid::new_v4(),
                        question: "active".to_string(),
                        answer: "a".to_string(),
                        category: "general".to_string(),
                        priority: 0,
                        is_active: true,
                    },
                    Faq {
                        id: Uuid::new_v4(),
                        question: "inactive".to_string(),
                        answer: "b".to_string(),
                        category: "general".to_string(),
                        priority: 0,
                        is_active: false,
                    },
                ],
                ..Default::default()
            })
            .await;

        let faqs = store.list_active_faqs().await;
        assert_eq!(faqs.len(), 1);
        assert_eq!(faqs[0].question, "active");
    }

    #[tokio::test]
    async fn test_upcoming_events_sorted_and_filtered() {
        let store = MemoryKnowledgeStore::new();
        let mut past = event_at(-48, "past");
        past.ends_at = Some(past.starts_at);
        store
            .replace(KnowledgeSnapshot {
                events: vec![event_at(72, "later"), past, event_at(24, "sooner")],
                ..Default::default()
            })
            .await;

        let events = store.list_upcoming_events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "sooner");
        assert_eq!(events[1].title, "later");
    }

    #[test]
    fn test_counts() {
        tokio_test::block_on(async {
            let store = MemoryKnowledgeStore::new();
            store
                .replace(KnowledgeSnapshot {
                    events: vec![event_at(1, "e")],
                    ..Default::default()
                })
                .await;
            assert_eq!(store.counts().await, (0, 0, 0, 1));
        });
    }

    #[test]
    fn test_snapshot_deserialize_partial() {
        let snapshot: KnowledgeSnapshot = serde_json::from_str(r#"{"faqs": []}"#).unwrap();
        assert!(snapshot.people.is_empty());
        assert!(snapshot.events.is_empty());
    }
}
