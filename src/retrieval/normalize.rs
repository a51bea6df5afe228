//! Question normalization and keyword tokenization.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Leading politeness/question-word prefixes stripped before matching.
fn prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(can i|could i|can you|could you|do you|is there|are there|what is|what are|tell me|how|when|where|why)\s+",
        )
        .expect("prefix pattern is valid")
    })
}

/// Words too common to count as matching keywords.
fn stopwords() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        [
            "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
            "is", "are", "was", "were", "be", "have", "has", "had", "do", "does", "did", "can",
            "could", "would", "should", "may", "might", "must", "will", "shall", "what", "which",
            "who", "when", "where", "why", "how", "that", "this", "these", "those", "i", "you",
            "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your",
            "his", "its", "our", "their", "about", "by", "from", "into", "as", "if", "not",
        ]
        .into_iter()
        .collect()
    })
}

/// Lowercase, trim, collapse whitespace, and strip leading politeness or
/// question-word prefixes.
///
/// Prefix stripping repeats until no prefix remains, so the function is a
/// fixpoint: `normalize_question(normalize_question(q)) == normalize_question(q)`.
#[must_use]
pub fn normalize_question(question: &str) -> String {
    let lowered = question.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut current = collapsed.trim().to_string();
    loop {
        let stripped = prefix_pattern().replace(&current, "").trim().to_string();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Split a normalized question into matchable keywords: words longer than
/// three characters with edge punctuation removed, excluding stopwords.
#[must_use]
pub fn tokenize_keywords(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| word.len() > 3 && !is_stopword(word))
        .map(ToString::to_string)
        .collect()
}

/// Check if a word is a common stopword.
#[must_use]
pub fn is_stopword(word: &str) -> bool {
    stopwords().contains(word)
}
