//! The grounded instruction frame and the post-generation hedging scan.

use crate::retrieval::Language;

use super::client::ChatMessage;

/// Fixed token budget for grounded answers.
pub const ANSWER_TOKEN_BUDGET: u32 = 300;

/// Base rules for grounded generation: the model may only restate the
/// enclosed records, must use the fixed fallback when the answer is absent,
/// and may not hedge.
const GROUNDED_RULES: &str = "You are a database lookup tool for a school information kiosk. You \
can only read and repeat the knowledge base content provided below.

RULES:
1. Use ONLY information from the KNOWLEDGE BASE CONTENT section. You cannot use any knowledge \
from your training, make assumptions, or add details not explicitly stated there.
2. If the answer is present, state it directly using only the stored text. You may rephrase or \
combine stored sentences. Keep answers short and factual, with no preamble.
3. If the answer is NOT present, respond exactly: \"I don't have that information available \
right now. I can help you with questions about our programs, faculty, facilities, events, \
admissions, and scholarships.\"
4. Never invent contact details, dates, names, or procedures. Never describe what schools \
typically do. Never use the words \"I think\", \"probably\", \"maybe\", or \"might\".";

const EVIDENCE_HEADER: &str =
    "==================== KNOWLEDGE BASE CONTENT (YOUR ONLY SOURCE) ====================";
const EVIDENCE_FOOTER: &str =
    "==================== END OF KNOWLEDGE BASE CONTENT ====================";

const EMPTY_EVIDENCE_MARKER: &str = "NO RELEVANT ENTRIES FOUND";

const SECONDARY_LANGUAGE_NOTE: &str = "\nLANGUAGE: Respond in Tagalog (Filipino). Keep school \
names, acronyms, and proper nouns in English.";

/// Hedging phrases that mark a generated answer as ungrounded.
const HEDGING_PHRASES: &[&str] = &[
    "i think",
    "probably",
    "maybe",
    "might be",
    "could be",
    "likely",
    "according to my knowledge",
    "based on my understanding",
    "in general",
    "typically",
    "usually",
    "normally",
];

/// Build the system prompt embedding the evidence between fixed delimiters.
#[must_use]
pub fn build_system_prompt(evidence: &str, language: Language) -> String {
    let body = if evidence.trim().is_empty() {
        EMPTY_EVIDENCE_MARKER
    } else {
        evidence
    };
    let language_note = match language {
        Language::Primary => "",
        Language::Secondary => SECONDARY_LANGUAGE_NOTE,
    };
    format!("{GROUNDED_RULES}\n\n{EVIDENCE_HEADER}\n\n{body}\n\n{EVIDENCE_FOOTER}{language_note}")
}

/// Build the full message list: framed system prompt, the rolling
/// conversation window, then the user's question.
#[must_use]
pub fn build_messages(
    evidence: &str,
    history: &[ChatMessage],
    question: &str,
    language: Language,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(build_system_prompt(evidence, language)));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(question));
    messages
}

/// Scan a finished answer for hedging language; returns the first phrase
/// found. Any hit means the whole answer is discarded for the fallback.
#[must_use]
pub fn find_hedging(answer: &str) -> Option<&'static str> {
    let lower = answer.to_lowercase();
    HEDGING_PHRASES
        .iter()
        .find(|phrase| lower.contains(*phrase))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_embeds_evidence_between_delimiters() {
        let prompt = build_system_prompt("[1] Maria Santos\n", Language::Primary);
        let header = prompt.find(EVIDENCE_HEADER).unwrap();
        let evidence = prompt.find("Maria Santos").unwrap();
        let footer = prompt.find(EVIDENCE_FOOTER).unwrap();
        assert!(header < evidence && evidence < footer);
    }

    #[test]
    fn test_system_prompt_marks_empty_evidence() {
        let prompt = build_system_prompt("  ", Language::Primary);
        assert!(prompt.contains(EMPTY_EVIDENCE_MARKER));
    }

    #[test]
    fn test_secondary_language_note_appended() {
        let primary = build_system_prompt("x", Language::Primary);
        let secondary = build_system_prompt("x", Language::Secondary);
        assert!(!primary.contains("Tagalog"));
        assert!(secondary.contains("Tagalog"));
    }

    #[test]
    fn test_build_messages_order() {
        let history = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ];
        let messages = build_messages("evidence", &history, "new question", Language::Primary);
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0].role, crate::inference::Role::System));
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].content, "earlier answer");
        assert_eq!(messages[3].content, "new question");
    }

    #[test]
    fn test_find_hedging_case_insensitive() {
        assert_eq!(find_hedging("It is Probably on Monday."), Some("probably"));
        assert_eq!(
            find_hedging("Schools TYPICALLY require exams."),
            Some("typically")
        );
    }

    #[test]
    fn test_find_hedging_clean_answer() {
        assert!(find_hedging("The library is open 8am to 6pm.").is_none());
    }
}
