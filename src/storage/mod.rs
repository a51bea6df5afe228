//! Persistent interaction storage.
//!
//! Holds the query log plus the retention-governed chat, analytics and
//! feedback tables. The admin layer reads these; this pipeline writes them
//! and the retention scheduler deletes from them.

mod error;
mod log;
mod schema;
mod types;

pub use error::StoreError;
pub use log::{default_store_path, QueryLog};
pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use types::{Feedback, NewQuery, Query, Rating, RetainedTable};
