//! Bounded TTL cache for completed answers.

mod response;

pub use response::{CacheStats, CachedAnswer, ResponseCache, DEFAULT_CAPACITY, DEFAULT_TTL};
