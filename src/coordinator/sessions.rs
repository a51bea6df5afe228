//! Single-flight session registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A live generation session for one client conversation.
///
/// Never persisted; destroyed on completion or when superseded.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub id: Uuid,
    pub cancel: CancellationToken,
    pub started_at: DateTime<Utc>,
}

struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
}

/// Tracks at most one active generation per client session id.
///
/// Starting a new session cancels the previous one for the same client
/// before the new one begins.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<String, ActiveSession>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a session for a client, superseding any still-running one.
    #[must_use]
    pub fn begin(&self, client_session_id: &str) -> StreamSession {
        let session = StreamSession {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
        };
        let previous = self.inner.lock().expect("session lock poisoned").insert(
            client_session_id.to_string(),
            ActiveSession {
                id: session.id,
                cancel: session.cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(
                client = client_session_id,
                superseded = %previous.id,
                "Superseding still-running session"
            );
            previous.cancel.cancel();
        }
        session
    }

    /// Drop the registry entry if the given session is still the active one.
    ///
    /// A session that was superseded leaves the newer entry untouched.
    pub fn finish(&self, client_session_id: &str, session_id: Uuid) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        if inner
            .get(client_session_id)
            .is_some_and(|active| active.id == session_id)
        {
            inner.remove(client_session_id);
        }
    }

    /// Number of clients with a registered session.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.lock().expect("session lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_registers_session() {
        let registry = SessionRegistry::new();
        let session = registry.begin("kiosk-1");
        assert!(!session.cancel.is_cancelled());
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_new_session_cancels_previous_for_same_client() {
        let registry = SessionRegistry::new();
        let first = registry.begin("kiosk-1");
        let second = registry.begin("kiosk-1");

        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_sessions_for_different_clients_independent() {
        let registry = SessionRegistry::new();
        let first = registry.begin("kiosk-1");
        let other = registry.begin("kiosk-2");

        assert!(!first.cancel.is_cancelled());
        assert!(!other.cancel.is_cancelled());
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_finish_removes_only_current_session() {
        let registry = SessionRegistry::new();
        let first = registry.begin("kiosk-1");
        let second = registry.begin("kiosk-1");

        // The superseded session finishing must not evict the newer one
        registry.finish("kiosk-1", first.id);
        assert_eq!(registry.active_count(), 1);

        registry.finish("kiosk-1", second.id);
        assert_eq!(registry.active_count(), 0);
    }
}
