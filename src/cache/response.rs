//! In-memory response cache keyed by normalized question.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 100;

/// A cached answer handed back on a hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnswer {
    pub answer: String,
    pub speech_text: String,
    pub hit_count: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    answer: String,
    speech_text: String,
    created_at: Instant,
    hit_count: u64,
}

/// Aggregate cache counters for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub total_hits: u64,
    /// Up to five (question, hits) pairs, most popular first.
    pub most_popular: Vec<(String, u64)>,
}

/// Answer cache shared across concurrent requests.
///
/// Callers must bypass it entirely when a request carries conversation
/// history; such answers are context-dependent and must not be reused.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl ResponseCache {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Normalize a question into a cache key: lowercase, punctuation
    /// stripped, whitespace collapsed.
    #[must_use]
    pub fn normalize_key(question: &str) -> String {
        question
            .to_lowercase()
            .replace(['?', '!', '.', ','], "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Look up a question, deleting the entry if it has expired.
    ///
    /// A hit increments the entry's hit count.
    pub fn get(&self, question: &str) -> Option<CachedAnswer> {
        let key = Self::normalize_key(question);
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        let expired = entries
            .get(&key)
            .is_some_and(|entry| entry.created_at.elapsed() > self.ttl);
        if expired {
            entries.remove(&key);
            return None;
        }

        entries.get_mut(&key).map(|entry| {
            entry.hit_count += 1;
            CachedAnswer {
                answer: entry.answer.clone(),
                speech_text: entry.speech_text.clone(),
                hit_count: entry.hit_count,
            }
        })
    }

    /// Insert or refresh an entry, evicting the single oldest-by-insertion
    /// entry when at capacity.
    pub fn set(&self, question: &str, answer: &str, speech_text: &str) {
        let key = Self::normalize_key(question);
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest_key) = oldest {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            key,
            Entry {
                answer: answer.to_string(),
                speech_text: speech_text.to_string(),
                created_at: Instant::now(),
                hit_count: 0,
            },
        );
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    /// Aggregate counters, most popular entries first.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let total_hits = entries.values().map(|entry| entry.hit_count).sum();
        let mut popular: Vec<(String, u64)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.hit_count))
            .collect();
        popular.sort_by(|a, b| b.1.cmp(&a.1));
        popular.truncate(5);
        CacheStats {
            size: entries.len(),
            total_hits,
            most_popular: popular,
        }
    }
}
