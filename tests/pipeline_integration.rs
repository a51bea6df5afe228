//! End-to-end tests of the generation coordinator pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use campus_kiosk::cache::ResponseCache;
use campus_kiosk::coordinator::{AnswerEvent, ChatRequest, Coordinator};
use campus_kiosk::hub::{FanoutHub, SubscriberRole, WireEvent};
use campus_kiosk::inference::{ChatMessage, InferenceError, InferenceProvider, TokenStream};
use campus_kiosk::knowledge::{
    Event, Facility, Faq, KnowledgeSnapshot, KnowledgeStore, MemoryKnowledgeStore, Person,
};
use campus_kiosk::retrieval::{fallback_answer, Language};
use campus_kiosk::storage::{QueryLog, RetainedTable};

/// Provider that replays scripted tokens with a per-token delay.
struct ScriptedProvider {
    tokens: Vec<&'static str>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(tokens: Vec<&'static str>) -> Self {
        Self {
            tokens,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    async fn chat_stream(
        &self,
        _messages: Vec<ChatMessage>,
        _max_tokens: u32,
    ) -> Result<TokenStream, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        let items: Vec<Result<String, InferenceError>> = self
            .tokens
            .iter()
            .map(|token| Ok((*token).to_string()))
            .collect();
        Ok(Box::pin(stream::iter(items).then(move |item| async move {
            tokio::time::sleep(delay).await;
            item
        })))
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Knowledge store that fails the test if the pipeline touches it.
struct UntouchableStore;

#[async_trait]
impl KnowledgeStore for UntouchableStore {
    async fn list_active_faqs(&self) -> Vec<Faq> {
        panic!("knowledge store must not be accessed");
    }

    async fn list_people(&self) -> Vec<Person> {
        panic!("knowledge store must not be accessed");
    }

    async fn list_facilities(&self) -> Vec<Facility> {
        panic!("knowledge store must not be accessed");
    }

    async fn list_upcoming_events(&self) -> Vec<Event> {
        panic!("knowledge store must not be accessed");
    }
}

async fn build(
    knowledge: Arc<dyn KnowledgeStore>,
    provider: Arc<dyn InferenceProvider>,
) -> (Coordinator, Arc<FanoutHub>, QueryLog, Arc<ResponseCache>) {
    let hub = Arc::new(FanoutHub::new());
    let log = QueryLog::open_in_memory().await.unwrap();
    let cache = Arc::new(ResponseCache::default());
    let coordinator = Coordinator::new(knowledge, provider, cache.clone(), hub.clone(), log.clone());
    (coordinator, hub, log, cache)
}

fn request(question: &str, session: &str) -> ChatRequest {
    ChatRequest {
        question: question.to_string(),
        history: Vec::new(),
        language: Language::Primary,
        user_type: "visitor".to_string(),
        client_session_id: session.to_string(),
    }
}

async fn collect(mut rx: mpsc::Receiver<AnswerEvent>) -> Vec<AnswerEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn final_answer(events: &[AnswerEvent]) -> (String, Option<String>) {
    events
        .iter()
        .find_map(|event| match event {
            AnswerEvent::Done(done) => Some((done.answer.clone(), done.category.clone())),
            _ => None,
        })
        .expect("expected a done event")
}

#[tokio::test]
async fn test_exact_faq_question_answered_verbatim_with_admissions_category() {
    let snapshot = KnowledgeSnapshot {
        faqs: vec![Faq {
            id: Uuid::new_v4(),
            question: "How do I apply?".to_string(),
            answer: "Complete the online form and submit your transcript.".to_string(),
            category: "admissions".to_string(),
            priority: 1,
            is_active: true,
        }],
        ..Default::default()
    };
    let provider = Arc::new(ScriptedProvider::new(vec!["model text that must not be used"]));
    let (coordinator, _hub, log, _cache) =
        build(MemoryKnowledgeStore::from_snapshot(snapshot), provider.clone()).await;

    let events = collect(coordinator.handle(request("How do I apply?", "kiosk-1"))).await;

    let (answer, category) = final_answer(&events);
    assert_eq!(answer, "Complete the online form and submit your transcript.");
    assert_eq!(category.as_deref(), Some("admissions"));
    assert_eq!(provider.calls(), 0, "direct answers bypass the model");
    assert_eq!(log.count_rows(RetainedTable::Queries).await.unwrap(), 1);
}

#[tokio::test]
async fn test_gibberish_answered_with_fallback_and_null_category() {
    let provider = Arc::new(ScriptedProvider::new(vec!["hallucinated nonsense"]));
    let (coordinator, _hub, _log, _cache) = build(
        MemoryKnowledgeStore::from_snapshot(KnowledgeSnapshot::default()),
        provider.clone(),
    )
    .await;

    let events = collect(coordinator.handle(request("zzxcvqq", "kiosk-1"))).await;

    let (answer, category) = final_answer(&events);
    assert_eq!(answer, fallback_answer());
    assert!(category.is_none());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_greeting_never_touches_knowledge_store() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let (coordinator, _hub, _log, _cache) = build(Arc::new(UntouchableStore), provider).await;

    let events = collect(coordinator.handle(request("hello", "kiosk-1"))).await;
    let (answer, category) = final_answer(&events);
    assert!(answer.starts_with("Hello!"));
    assert_eq!(category.as_deref(), Some("greeting"));
}

/// Grounding guarantee: when no topic and no FAQ matches, the final answer is
/// the canonical fallback no matter what the model would say.
#[tokio::test]
async fn test_unmatched_topic_never_reaches_the_model() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        "Paris is the capital of France.",
    ]));
    let (coordinator, _hub, _log, _cache) = build(
        MemoryKnowledgeStore::from_snapshot(KnowledgeSnapshot::default()),
        provider.clone(),
    )
    .await;

    let events = collect(coordinator.handle(request(
        "please recommend a good mystery novel",
        "kiosk-1",
    )))
    .await;

    let (answer, _) = final_answer(&events);
    assert_eq!(answer, fallback_answer());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_single_flight_preemption_suppresses_superseded_side_effects() {
    let snapshot = KnowledgeSnapshot {
        people: vec![Person {
            id: Uuid::new_v4(),
            full_name: "Maria Santos".to_string(),
            position: "Dean".to_string(),
            department: "Engineering".to_string(),
            email: None,
            phone: None,
            description: None,
        }],
        ..Default::default()
    };
    let provider = Arc::new(
        ScriptedProvider::new(vec!["a ", "slow ", "answer ", "still ", "going"])
            .with_delay(Duration::from_millis(100)),
    );
    let (coordinator, _hub, log, cache) =
        build(MemoryKnowledgeStore::from_snapshot(snapshot), provider.clone()).await;

    let first_rx = coordinator.handle(request("who is the dean of the faculty?", "kiosk-1"));
    let first_task = tokio::spawn(collect(first_rx));
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Same client session: question B supersedes question A mid-stream
    let second = collect(coordinator.handle(request("tell me about faculty staff", "kiosk-1"))).await;
    let first = first_task.await.unwrap();

    assert!(
        first.iter().all(|event| matches!(event, AnswerEvent::Token(_))),
        "superseded request must not complete"
    );
    let (_, second_category) = final_answer(&second);
    assert!(second_category.is_some());

    // Exactly one query row (B's) and only B's cache key; keys carry the
    // language tag prefix
    assert_eq!(log.count_rows(RetainedTable::Queries).await.unwrap(), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.get("primary:who is the dean of the faculty").is_none());
    assert!(cache.get("primary:tell me about faculty staff").is_some());
}

#[tokio::test]
async fn test_display_and_admin_fanout_on_completion() {
    let snapshot = KnowledgeSnapshot {
        people: vec![Person {
            id: Uuid::new_v4(),
            full_name: "Maria Santos".to_string(),
            position: "Dean".to_string(),
            department: "Engineering".to_string(),
            email: None,
            phone: None,
            description: None,
        }],
        ..Default::default()
    };
    let provider = Arc::new(ScriptedProvider::new(vec!["Maria Santos is the dean."]));
    let (coordinator, hub, _log, _cache) =
        build(MemoryKnowledgeStore::from_snapshot(snapshot), provider).await;

    let (_display, mut display_rx) = hub.subscribe(SubscriberRole::Display);
    let (_other_display, mut other_rx) = hub.subscribe(SubscriberRole::Display);
    let (_admin, mut admin_rx) = hub.subscribe(SubscriberRole::Admin);

    collect(coordinator.handle(request("who is the dean of the faculty?", "kiosk-1"))).await;

    // Both displays got the speaking event, the admin got the new query
    for rx in [&mut display_rx, &mut other_rx] {
        match rx.recv().await.unwrap() {
            WireEvent::Speaking { is_speaking, text } => {
                assert!(is_speaking);
                assert_eq!(text, "Maria Santos is the dean.");
            }
            other => panic!("unexpected display event {other:?}"),
        }
    }
    match admin_rx.recv().await.unwrap() {
        WireEvent::NewQuery { query } => {
            assert_eq!(query.answer, "Maria Santos is the dean.");
            assert_eq!(query.category.as_deref(), Some("faculty"));
        }
        other => panic!("unexpected admin event {other:?}"),
    }
}

/// The cache key is language-prefixed, so the same question in the secondary
/// language is a distinct entry.
#[tokio::test]
async fn test_language_scoped_cache_keys() {
    let snapshot = KnowledgeSnapshot {
        people: vec![Person {
            id: Uuid::new_v4(),
            full_name: "Maria Santos".to_string(),
            position: "Dean".to_string(),
            department: "Engineering".to_string(),
            email: None,
            phone: None,
            description: None,
        }],
        ..Default::default()
    };
    let provider = Arc::new(ScriptedProvider::new(vec!["Answer."]));
    let (coordinator, _hub, _log, _cache) =
        build(MemoryKnowledgeStore::from_snapshot(snapshot), provider.clone()).await;

    collect(coordinator.handle(request("who is the dean of the faculty?", "kiosk-1"))).await;

    let mut secondary = request("who is the dean of the faculty?", "kiosk-1");
    secondary.language = Language::Secondary;
    let events = collect(coordinator.handle(secondary)).await;

    let done = events
        .iter()
        .find_map(|event| match event {
            AnswerEvent::Done(done) => Some(done),
            _ => None,
        })
        .unwrap();
    assert!(!done.cached, "secondary-language request must miss the cache");
    assert_eq!(provider.calls(), 2);
}
