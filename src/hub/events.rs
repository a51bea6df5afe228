//! Wire shapes broadcast to subscriber connections.

use serde::{Deserialize, Serialize};

use crate::storage::Query;

/// Event pushed to subscriber connections.
///
/// Delivery is best-effort and at-most-once per connection; ordering is only
/// guaranteed within a single connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireEvent {
    /// Display synchronization: the kiosk avatar started or stopped speaking.
    #[serde(rename_all = "camelCase")]
    Speaking { is_speaking: bool, text: String },
    /// Admin live-update: a query was just persisted.
    #[serde(rename_all = "camelCase")]
    NewQuery { query: Query },
}

impl WireEvent {
    /// Speaking-state event carrying the text being spoken.
    #[must_use]
    pub fn speaking(text: impl Into<String>) -> Self {
        WireEvent::Speaking {
            is_speaking: true,
            text: text.into(),
        }
    }

    /// Display idle event, sent when a generation completes or is abandoned.
    #[must_use]
    pub fn idle() -> Self {
        WireEvent::Speaking {
            is_speaking: false,
            text: String::new(),
        }
    }
}
