//! Daily retention cleanup over the interaction tables.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::RetentionConfig;
use crate::storage::{QueryLog, RetainedTable};

/// Rows deleted per table by one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletedCounts {
    pub chat: u64,
    pub queries: u64,
    pub analytics: u64,
    pub feedback: u64,
}

impl DeletedCounts {
    /// Total rows deleted across all tables.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.chat + self.queries + self.analytics + self.feedback
    }
}

/// Time remaining until the next occurrence of the given UTC hour, scheduling
/// to tomorrow if that hour has already passed today.
#[must_use]
pub fn duration_until_hour(now: DateTime<Utc>, hour: u32) -> Duration {
    let mut target = now
        .date_naive()
        .and_hms_opt(hour.min(23), 0, 0)
        .unwrap_or_else(|| now.naive_utc())
        .and_utc();
    if target <= now {
        target += chrono::Duration::days(1);
    }
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

/// Background job deleting expired rows per category.
///
/// Runs on its own timer, independent of request handling.
pub struct RetentionScheduler {
    log: QueryLog,
    policy: RetentionConfig,
}

impl RetentionScheduler {
    #[must_use]
    pub fn new(log: QueryLog, policy: RetentionConfig) -> Self {
        Self { log, policy }
    }

    /// Delete expired rows from every retained table.
    ///
    /// Each table is handled independently: a failing delete is logged and
    /// does not stop the remaining tables from being cleaned.
    pub async fn run_once(&self) -> DeletedCounts {
        let now = Utc::now();
        let mut counts = DeletedCounts::default();

        for table in RetainedTable::ALL {
            let window_days = self.window_days(table);
            let cutoff = now - chrono::Duration::days(window_days);
            match self.log.delete_before(table, cutoff).await {
                Ok(deleted) => {
                    tracing::info!(
                        table = table.table_name(),
                        deleted,
                        window_days,
                        "Retention cleanup pass"
                    );
                    match table {
                        RetainedTable::ChatHistory => counts.chat = deleted,
                        RetainedTable::Queries => counts.queries = deleted,
                        RetainedTable::AnalyticsEvents => counts.analytics = deleted,
                        RetainedTable::Feedback => counts.feedback = deleted,
                    }
                }
                Err(error) => {
                    tracing::error!(
                        table = table.table_name(),
                        %error,
                        "Retention cleanup failed for table; continuing with the rest"
                    );
                }
            }
        }

        counts
    }

    fn window_days(&self, table: RetainedTable) -> i64 {
        let days = match table {
            RetainedTable::ChatHistory => self.policy.chat_days,
            RetainedTable::Queries => self.policy.query_days,
            RetainedTable::AnalyticsEvents => self.policy.analytics_days,
            RetainedTable::Feedback => self.policy.feedback_days,
        };
        i64::from(days)
    }

    /// Spawn the daily cleanup task: sleep until the configured hour, run a
    /// pass, then re-arm on a fixed 24-hour interval.
    pub fn spawn_daily(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let initial = duration_until_hour(Utc::now(), self.policy.cleanup_hour);
            tracing::info!(
                first_run_in_secs = initial.as_secs(),
                at_hour = self.policy.cleanup_hour,
                "Scheduled daily retention cleanup"
            );
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(initial) => {}
            }
            loop {
                let counts = self.run_once().await;
                tracing::info!(total = counts.total(), "Retention cleanup finished");
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(Duration::from_secs(24 * 60 * 60)) => {}
                }
            }
        })
    }
}
