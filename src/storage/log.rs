//! Interaction log implementation with async `SQLite` operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::StoreError;
use super::schema::SCHEMA;
use super::types::{Feedback, NewQuery, Query, Rating, RetainedTable};

/// Returns the default path for the interaction database.
///
/// This is `~/.local/share/campus-kiosk/kiosk.db` on Unix systems.
#[must_use]
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("campus-kiosk")
        .join("kiosk.db")
}

/// Persistent log of queries, chat messages, analytics events and feedback.
///
/// Uses `SQLite` for storage with async operations via `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct QueryLog {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl QueryLog {
    /// Open an interaction log at the specified path.
    ///
    /// Creates parent directories if they don't exist and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot be applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|source| {
                    StoreError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let path_clone = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn = Connection::open(&path_clone).map_err(|source| StoreError::DatabaseOpen {
                path: path_clone,
                source,
            })?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open an in-memory log for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or the schema cannot be applied.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection, StoreError> {
            let conn = Connection::open_in_memory()?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the path to the database, if opened from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist a completed query, assigning its id and timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be inserted.
    pub async fn create_query(&self, new: NewQuery) -> Result<Query, StoreError> {
        let query = Query {
            id: Uuid::new_v4(),
            question: new.question,
            answer: new.answer,
            user_type: new.user_type,
            category: new.category,
            response_time_ms: new.response_time_ms,
            created_at: Utc::now(),
        };

        let row = query.clone();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO queries (id, question, answer, user_type, category, response_time_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.id.to_string(),
                    row.question,
                    row.answer,
                    row.user_type,
                    row.category,
                    i64::try_from(row.response_time_ms).unwrap_or(i64::MAX),
                    row.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        Ok(query)
    }

    /// Record one user or assistant message in the chat history.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be inserted.
    pub async fn record_chat_message(
        &self,
        query_id: Option<Uuid>,
        message: impl Into<String>,
        is_user: bool,
    ) -> Result<(), StoreError> {
        let id = Uuid::new_v4().to_string();
        let query_id = query_id.map(|id| id.to_string());
        let message = message.into();
        let created_at = Utc::now().to_rfc3339();

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO chat_history (id, query_id, message, is_user, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, query_id, message, i32::from(is_user), created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Record an analytics event with a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized or the row cannot
    /// be inserted.
    pub async fn record_event(
        &self,
        event_type: impl Into<String>,
        event_data: &serde_json::Value,
        session_id: Option<&str>,
        user_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let id = Uuid::new_v4().to_string();
        let event_type = event_type.into();
        let event_data = serde_json::to_string(event_data)?;
        let session_id = session_id.map(ToString::to_string);
        let user_type = user_type.map(ToString::to_string);
        let created_at = Utc::now().to_rfc3339();

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO analytics_events (id, event_type, event_data, session_id, user_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, event_type, event_data, session_id, user_type, created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Store a visitor rating for a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be inserted.
    pub async fn create_feedback(
        &self,
        query_id: Uuid,
        rating: Rating,
        comment: Option<String>,
    ) -> Result<Feedback, StoreError> {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            query_id,
            rating,
            comment,
            created_at: Utc::now(),
        };

        let row = feedback.clone();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO feedback (id, query_id, rating, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id.to_string(),
                    row.query_id.to_string(),
                    row.rating.as_str(),
                    row.comment,
                    row.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)??;

        Ok(feedback)
    }

    /// Fetch the stored rating for a query, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn feedback_for_query(
        &self,
        query_id: Uuid,
    ) -> Result<Option<Feedback>, StoreError> {
        let query_id_str = query_id.to_string();

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<Feedback>, StoreError> {
            let conn = conn.blocking_lock();
            let row = conn
                .query_row(
                    "SELECT id, query_id, rating, comment, created_at
                     FROM feedback WHERE query_id = ?1 ORDER BY created_at DESC LIMIT 1",
                    params![query_id_str],
                    |row| {
                        let id: String = row.get(0)?;
                        let query_id: String = row.get(1)?;
                        let rating: String = row.get(2)?;
                        let comment: Option<String> = row.get(3)?;
                        let created_at: String = row.get(4)?;
                        Ok((id, query_id, rating, comment, created_at))
                    },
                )
                .optional()?;

            Ok(row.map(|(id, query_id, rating, comment, created_at)| Feedback {
                id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
                query_id: Uuid::parse_str(&query_id).unwrap_or_else(|_| Uuid::nil()),
                rating: Rating::parse(&rating).unwrap_or(Rating::Positive),
                comment,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
            }))
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Delete rows older than the cutoff from a retained table, returning the
    /// number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete_before(
        &self,
        table: RetainedTable,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let cutoff = cutoff.to_rfc3339();

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<u64, StoreError> {
            let conn = conn.blocking_lock();
            let sql = format!(
                "DELETE FROM {} WHERE created_at < ?1",
                table.table_name()
            );
            let deleted = conn.execute(&sql, params![cutoff])?;
            Ok(deleted as u64)
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Count rows in a retained table.
    ///
    /// # Errors
    ///
    /// Returns an error if the count fails.
    pub async fn count_rows(&self, table: RetainedTable) -> Result<u64, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<u64, StoreError> {
            let conn = conn.blocking_lock();
            let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count.unsigned_abs())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }

    /// Execute arbitrary SQL; test seam for seeding backdated rows and
    /// forcing table-level failures.
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: String) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
        .map_err(|_| StoreError::TaskCancelled)?
    }
}
