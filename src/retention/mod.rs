//! Scheduled deletion of aged interaction data.

mod scheduler;

pub use scheduler::{duration_until_hour, DeletedCounts, RetentionScheduler};
