//! Integration tests for the retrieval engine and response cache.

use std::time::Duration;

use campus_kiosk::cache::ResponseCache;
use campus_kiosk::knowledge::{Faq, KnowledgeSnapshot, MemoryKnowledgeStore};
use campus_kiosk::retrieval::{
    normalize_question, DirectSource, Language, RetrievalEngine, RetrievalOutcome,
};
use uuid::Uuid;

fn faq(question: &str, answer: &str, priority: i32) -> Faq {
    Faq {
        id: Uuid::new_v4(),
        question: question.to_string(),
        answer: answer.to_string(),
        category: "admissions".to_string(),
        priority,
        is_active: true,
    }
}

fn engine(faqs: Vec<Faq>) -> RetrievalEngine {
    RetrievalEngine::new(MemoryKnowledgeStore::from_snapshot(KnowledgeSnapshot {
        faqs,
        ..Default::default()
    }))
}

/// Normalization must be a fixpoint so repeated application cannot change a
/// cache key or match result.
#[test]
fn test_normalization_idempotent() {
    let questions = [
        "How do I apply?",
        "What is the tuition fee?",
        "Can you tell me what are the library hours?",
        "  MIXED   Case \t Input  ",
        "hello",
        "zzxcvqq",
        "",
        "what is",
    ];
    for question in questions {
        let once = normalize_question(question);
        let twice = normalize_question(&once);
        assert_eq!(once, twice, "normalization not idempotent for {question:?}");
    }
}

/// A question that is a substring of a stored FAQ question (or contains it)
/// must return the stored answer byte-for-byte.
#[tokio::test]
async fn test_exact_match_fidelity() {
    let stored_answer = "Submit Form A at the registrar's office.\nBring two valid IDs.";
    let engine = engine(vec![faq("How do I apply?", stored_answer, 0)]);

    for question in ["How do I apply?", "how do i apply", "HOW DO I APPLY?!"] {
        match engine.retrieve(question, Language::Primary).await {
            RetrievalOutcome::Direct { answer, source } => {
                assert_eq!(source, DirectSource::Faq);
                assert_eq!(answer.as_bytes(), stored_answer.as_bytes());
            }
            other => panic!("expected direct answer for {question:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_greeting_answered_per_language_without_knowledge() {
    let engine = engine(Vec::new());

    match engine.retrieve("hello", Language::Primary).await {
        RetrievalOutcome::Direct { answer, source } => {
            assert_eq!(source, DirectSource::Greeting);
            assert!(answer.starts_with("Hello!"));
        }
        other => panic!("expected greeting, got {other:?}"),
    }
    match engine.retrieve("hello", Language::Secondary).await {
        RetrievalOutcome::Direct { answer, .. } => assert!(answer.starts_with("Halo!")),
        other => panic!("expected greeting, got {other:?}"),
    }
}

#[tokio::test]
async fn test_highest_priority_faq_wins_keyword_tie() {
    let engine = engine(vec![
        faq("Scholarship application period", "First answer.", 0),
        faq("Scholarship application checklist", "Preferred answer.", 10),
    ]);

    match engine
        .retrieve("scholarship application details please", Language::Primary)
        .await
    {
        RetrievalOutcome::Direct { answer, .. } => assert_eq!(answer, "Preferred answer."),
        other => panic!("expected direct answer, got {other:?}"),
    }
}

#[test]
fn test_cache_roundtrip_and_hit_count() {
    let cache = ResponseCache::default();
    cache.set("What are the fees?", "See the cashier.", "See the cashier.");

    let first = cache.get("what are the fees").expect("hit expected");
    assert_eq!(first.answer, "See the cashier.");
    assert_eq!(first.speech_text, "See the cashier.");
    assert_eq!(first.hit_count, 1);

    let second = cache.get("What are the fees?!").expect("hit expected");
    assert_eq!(second.hit_count, 2);
}

#[test]
fn test_cache_ttl_expiry_removes_entry() {
    let cache = ResponseCache::new(10, Duration::from_millis(10));
    cache.set("q", "a", "s");
    assert!(cache.get("q").is_some());

    std::thread::sleep(Duration::from_millis(25));
    assert!(cache.get("q").is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_cache_eviction_keeps_newest_capacity_entries() {
    let capacity = 5;
    let cache = ResponseCache::new(capacity, Duration::from_secs(3600));

    for i in 0..=capacity {
        cache.set(&format!("question {i}"), &format!("answer {i}"), "s");
        std::thread::sleep(Duration::from_millis(2));
    }

    assert_eq!(cache.len(), capacity);
    assert!(cache.get("question 0").is_none(), "oldest entry must be gone");
    for i in 1..=capacity {
        assert!(
            cache.get(&format!("question {i}")).is_some(),
            "entry {i} should survive"
        );
    }
}
