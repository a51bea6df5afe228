//! Subscriber registry and best-effort broadcast.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::WireEvent;

/// Role a subscriber connection registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberRole {
    /// Kiosk screen, hologram or other display surface.
    Display,
    /// Admin dashboard wanting live query updates.
    Admin,
}

/// Opaque identifier for a subscriber connection.
pub type SubscriberId = Uuid;

struct Subscriber {
    role: SubscriberRole,
    sender: mpsc::UnboundedSender<WireEvent>,
    subscribed_at: DateTime<Utc>,
}

/// Registry of long-lived subscriber connections.
///
/// Membership only: the hub never owns message content. Connections found
/// closed during a broadcast are dropped from the registry silently.
#[derive(Default)]
pub struct FanoutHub {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl FanoutHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; events for its role arrive on the receiver.
    pub fn subscribe(
        &self,
        role: SubscriberRole,
    ) -> (SubscriberId, mpsc::UnboundedReceiver<WireEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.subscribers.lock().expect("hub lock poisoned").insert(
            id,
            Subscriber {
                role,
                sender,
                subscribed_at: Utc::now(),
            },
        );
        tracing::debug!(subscriber = %id, ?role, "Subscriber connected");
        (id, receiver)
    }

    /// Remove a connection from the registry.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let removed = self
            .subscribers
            .lock()
            .expect("hub lock poisoned")
            .remove(&id);
        if let Some(subscriber) = removed {
            let connected_secs = (Utc::now() - subscriber.subscribed_at).num_seconds();
            tracing::debug!(subscriber = %id, connected_secs, "Subscriber disconnected");
        }
    }

    /// Deliver an event to every open connection of the given role, except
    /// the excluded sender. Returns the number of deliveries; closed
    /// connections are removed as a side effect.
    pub fn broadcast(
        &self,
        role: SubscriberRole,
        event: &WireEvent,
        exclude: Option<SubscriberId>,
    ) -> usize {
        let mut subscribers = self.subscribers.lock().expect("hub lock poisoned");
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, subscriber) in subscribers.iter() {
            if subscriber.role != role || Some(*id) == exclude {
                continue;
            }
            if subscriber.sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }
        for id in closed {
            subscribers.remove(&id);
            tracing::debug!(subscriber = %id, "Dropped closed subscriber during broadcast");
        }
        delivered
    }

    /// Notify display surfaces of a speaking-state change.
    pub fn broadcast_speaking(&self, is_speaking: bool, text: &str) -> usize {
        let event = if is_speaking {
            WireEvent::speaking(text)
        } else {
            WireEvent::idle()
        };
        self.broadcast(SubscriberRole::Display, &event, None)
    }

    /// Notify admin dashboards of a newly persisted query.
    pub fn broadcast_new_query(&self, query: crate::storage::Query) -> usize {
        self.broadcast(SubscriberRole::Admin, &WireEvent::NewQuery { query }, None)
    }

    /// Number of live subscribers with the given role.
    #[must_use]
    pub fn count(&self, role: SubscriberRole) -> usize {
        self.subscribers
            .lock()
            .expect("hub lock poisoned")
            .values()
            .filter(|subscriber| subscriber.role == role)
            .count()
    }
}
