//! Knowledge base record types and read access.
//!
//! The records themselves are owned and mutated by the external admin/CRUD
//! layer; this pipeline only reads them.

mod store;
mod types;

pub use store::{KnowledgeSnapshot, KnowledgeStore, MemoryKnowledgeStore};
pub use types::{Event, Facility, Faq, Person};
