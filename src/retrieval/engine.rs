//! The retrieval engine: matches a question against the knowledge base.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::knowledge::{Event, Facility, Faq, KnowledgeStore, Person};

use super::blocklist::IntentBlocklist;
use super::category::Topic;
use super::normalize::{normalize_question, tokenize_keywords};
use super::phrases::{greeting_reply, gratitude_reply, Language};

/// Minimum keyword-overlap fraction for a FAQ to count as a match.
const KEYWORD_MATCH_THRESHOLD: f64 = 0.5;

/// Questions shorter than this without any topic keyword are rejected.
const MIN_FREEFORM_LEN: usize = 10;

/// Questions at most this short are let through as conversational fragments.
const SHORT_FRAGMENT_LEN: usize = 5;

/// Where a direct answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectSource {
    Greeting,
    Gratitude,
    Faq,
}

/// Why a question was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Matched the unsafe-intent blocklist.
    BlockedIntent,
    /// Too short and no recognizable topic keywords.
    OffTopic,
    /// Topic classification produced no evidence records.
    NoEvidence,
}

/// Structured excerpt of knowledge records assembled for the model.
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    /// Rendered record blocks, delimited per section.
    pub context: String,
    /// Topics whose records were included.
    pub topics: Vec<Topic>,
}

/// Result of matching a question against the knowledge base.
#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    /// Answer verbatim from a stored record or canned string; no model call.
    Direct {
        answer: String,
        source: DirectSource,
    },
    /// Evidence context for a grounded model call.
    Evidence(EvidenceBundle),
    /// Nothing to answer from; the caller substitutes the canonical fallback.
    Rejected { reason: RejectReason },
}

/// Matches free-text questions to knowledge records.
///
/// Every returned string is either verbatim record content or one of the
/// fixed canned replies; the engine performs no generation.
pub struct RetrievalEngine {
    knowledge: Arc<dyn KnowledgeStore>,
    blocklist: IntentBlocklist,
}

impl RetrievalEngine {
    #[must_use]
    pub fn new(knowledge: Arc<dyn KnowledgeStore>) -> Self {
        Self {
            knowledge,
            blocklist: IntentBlocklist::with_default_rules(),
        }
    }

    /// Replace the default intent blocklist.
    #[must_use]
    pub fn with_blocklist(mut self, blocklist: IntentBlocklist) -> Self {
        self.blocklist = blocklist;
        self
    }

    /// Match a question against the knowledge base.
    ///
    /// Checks run in fixed order: intent blocklist, greeting/gratitude
    /// recognizers, the relevance gate, exact FAQ containment, FAQ keyword
    /// overlap, then topic-classified evidence assembly.
    pub async fn retrieve(&self, question: &str, language: Language) -> RetrievalOutcome {
        if let Some(rule) = self.blocklist.check(question) {
            tracing::info!(
                category = ?rule.category(),
                rule = rule.description(),
                "Question blocked by intent rule"
            );
            return RetrievalOutcome::Rejected {
                reason: RejectReason::BlockedIntent,
            };
        }

        if let Some(reply) = greeting_reply(question, language) {
            return RetrievalOutcome::Direct {
                answer: reply.to_string(),
                source: DirectSource::Greeting,
            };
        }
        if let Some(reply) = gratitude_reply(question, language) {
            return RetrievalOutcome::Direct {
                answer: reply.to_string(),
                source: DirectSource::Gratitude,
            };
        }

        let lower = question.to_lowercase();
        let normalized = normalize_question(question);

        if !self.is_relevant(question, &lower) {
            tracing::debug!(question = %question, "Question failed relevance gate");
            return RetrievalOutcome::Rejected {
                reason: RejectReason::OffTopic,
            };
        }

        let faqs = self.knowledge.list_active_faqs().await;

        if let Some(faq) = exact_faq_match(&normalized, &faqs) {
            tracing::debug!(faq = %faq.question, "Exact FAQ match");
            return RetrievalOutcome::Direct {
                answer: faq.answer.clone(),
                source: DirectSource::Faq,
            };
        }

        if let Some(faq) = keyword_faq_match(&normalized, &faqs) {
            tracing::debug!(faq = %faq.question, "Keyword FAQ match");
            return RetrievalOutcome::Direct {
                answer: faq.answer.clone(),
                source: DirectSource::Faq,
            };
        }

        self.assemble_evidence(&lower, &normalized, &faqs).await
    }

    /// Relevance gate: topic keywords let a question through, as do very
    /// short conversational fragments and anything long enough to be a real
    /// sentence.
    fn is_relevant(&self, question: &str, lower: &str) -> bool {
        let trimmed = question.trim();
        if trimmed.len() <= SHORT_FRAGMENT_LEN || trimmed.len() >= MIN_FREEFORM_LEN {
            return true;
        }
        !Topic::matching(lower).is_empty()
    }

    async fn assemble_evidence(
        &self,
        lower: &str,
        normalized: &str,
        faqs: &[Faq],
    ) -> RetrievalOutcome {
        let matched = Topic::matching(lower);
        // A specific topic match takes precedence over the vague-question
        // override; the override only widens questions that matched nothing.
        let topics = if matched.is_empty() {
            if is_vague_question(lower) {
                Topic::ALL.to_vec()
            } else {
                Vec::new()
            }
        } else {
            matched
        };

        if topics.is_empty() {
            return RetrievalOutcome::Rejected {
                reason: RejectReason::NoEvidence,
            };
        }

        let mut context = String::new();
        if topics.contains(&Topic::People) {
            let people = self.knowledge.list_people().await;
            render_people(&mut context, &people);
        }
        if topics.contains(&Topic::Facilities) {
            let facilities = self.knowledge.list_facilities().await;
            render_facilities(&mut context, &facilities);
        }
        if topics.contains(&Topic::Events) {
            let events = self.knowledge.list_upcoming_events().await;
            render_events(&mut context, &events);
        }
        let relevant_faqs = select_relevant_faqs(normalized, &topics, faqs);
        render_faqs(&mut context, &relevant_faqs);

        if context.is_empty() {
            tracing::debug!("Topic matched but no records to assemble");
            return RetrievalOutcome::Rejected {
                reason: RejectReason::NoEvidence,
            };
        }

        RetrievalOutcome::Evidence(EvidenceBundle { context, topics })
    }
}

/// Exact or substring FAQ match, either direction of containment.
fn exact_faq_match<'a>(normalized: &str, faqs: &'a [Faq]) -> Option<&'a Faq> {
    if normalized.len() < 3 {
        return None;
    }
    faqs.iter().find(|faq| {
        let faq_question = faq.question.to_lowercase();
        faq_question.contains(normalized) || normalized.contains(&faq_question)
    })
}

/// Best FAQ by keyword-overlap fraction; ties broken by priority.
fn keyword_faq_match<'a>(normalized: &str, faqs: &'a [Faq]) -> Option<&'a Faq> {
    let tokens = tokenize_keywords(normalized);
    if tokens.is_empty() {
        return None;
    }

    let scored = faqs.iter().filter_map(|faq| {
        let text = faq.search_text();
        let hits = tokens.iter().filter(|token| text.contains(*token)).count();
        #[allow(clippy::cast_precision_loss)]
        let score = hits as f64 / tokens.len() as f64;
        (score >= KEYWORD_MATCH_THRESHOLD).then_some((faq, score))
    });

    scored
        .max_by(|(a, score_a), (b, score_b)| {
            score_a
                .partial_cmp(score_b)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.priority.cmp(&b.priority))
        })
        .map(|(faq, _)| faq)
}

/// Very short questions asking broadly about the school pull in everything.
fn is_vague_question(lower: &str) -> bool {
    let word_count = lower.split_whitespace().count();
    word_count <= 5
        && (lower.contains("tell me about") || lower.contains("about the school")
            || lower.contains("about this school")
            || lower.contains("about your school"))
}

/// FAQs worth including in the evidence: any question keyword appears in the
/// FAQ text, or the FAQ's own text matches a probed topic.
fn select_relevant_faqs<'a>(normalized: &str, topics: &[Topic], faqs: &'a [Faq]) -> Vec<&'a Faq> {
    let tokens = tokenize_keywords(normalized);
    faqs.iter()
        .filter(|faq| {
            let text = faq.search_text();
            tokens.iter().any(|token| text.contains(token))
                || topics.iter().any(|topic| {
                    topic_probe_words(*topic)
                        .iter()
                        .any(|probe| text.contains(probe))
                })
        })
        .collect()
}

/// Words that mark a FAQ as belonging to a topic's subject matter.
fn topic_probe_words(topic: Topic) -> &'static [&'static str] {
    match topic {
        Topic::Admissions => &["admission", "enroll", "apply"],
        Topic::Programs => &["program", "course", "offer", "scholarship", "tuition"],
        Topic::Academics => &["academic", "curriculum", "class"],
        Topic::People | Topic::Facilities | Topic::Events => &[],
    }
}

fn render_people(context: &mut String, people: &[Person]) {
    if people.is_empty() {
        return;
    }
    context.push_str("=== FACULTY AND STAFF (COMPLETE LIST) ===\n");
    context.push_str(&format!("Total staff on record: {}\n\n", people.len()));
    for (i, person) in people.iter().enumerate() {
        context.push_str(&format!("[{}] {}\n", i + 1, person.full_name));
        context.push_str(&format!("   Position: {}\n", person.position));
        context.push_str(&format!("   Department: {}\n", person.department));
        if let Some(email) = &person.email {
            context.push_str(&format!("   Email: {email}\n"));
        }
        if let Some(phone) = &person.phone {
            context.push_str(&format!("   Phone: {phone}\n"));
        }
        if let Some(description) = &person.description {
            context.push_str(&format!("   Bio: {description}\n"));
        }
        context.push('\n');
    }
}

fn render_facilities(context: &mut String, facilities: &[Facility]) {
    if facilities.is_empty() {
        return;
    }
    context.push_str("=== CAMPUS FACILITIES (COMPLETE LIST) ===\n");
    context.push_str(&format!("Total facilities on record: {}\n\n", facilities.len()));
    for (i, facility) in facilities.iter().enumerate() {
        context.push_str(&format!("[{}] {}\n", i + 1, facility.name));
        context.push_str(&format!("   Type: {}\n", facility.kind));
        context.push_str(&format!("   Location: {}\n", facility.location));
        if let Some(capacity) = facility.capacity {
            context.push_str(&format!("   Capacity: {capacity}\n"));
        }
        context.push_str(&format!("   Status: {}\n", facility.status));
        if let Some(description) = &facility.description {
            context.push_str(&format!("   Description: {description}\n"));
        }
        context.push('\n');
    }
}

fn render_events(context: &mut String, events: &[Event]) {
    if events.is_empty() {
        return;
    }
    context.push_str("=== UPCOMING EVENTS (COMPLETE LIST) ===\n");
    context.push_str(&format!("Total events on record: {}\n\n", events.len()));
    for (i, event) in events.iter().enumerate() {
        context.push_str(&format!("[{}] {}\n", i + 1, event.title));
        context.push_str(&format!(
            "   Date: {}\n",
            event.starts_at.format("%A, %B %-d, %Y %H:%M")
        ));
        context.push_str(&format!("   Location: {}\n", event.location));
        context.push_str(&format!("   Type: {}\n", event.kind));
        if let Some(department) = &event.department {
            context.push_str(&format!("   Organized by: {department}\n"));
        }
        context.push_str(&format!("   Description: {}\n", event.description));
        context.push('\n');
    }
}

fn render_faqs(context: &mut String, faqs: &[&Faq]) {
    if faqs.is_empty() {
        return;
    }
    context.push_str("=== FREQUENTLY ASKED QUESTIONS ===\n");
    context.push_str(&format!("Relevant FAQs found: {}\n\n", faqs.len()));
    for (i, faq) in faqs.iter().enumerate() {
        context.push_str(&format!("[FAQ {}]\n", i + 1));
        context.push_str(&format!("Q: {}\n", faq.question));
        context.push_str(&format!("A: {}\n\n", faq.answer));
    }
}
