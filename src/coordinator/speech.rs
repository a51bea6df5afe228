//! Preparation of answer text for speech synthesis.

use std::sync::OnceLock;

use regex::Regex;

fn acronym_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[A-Z]{2,5}\b").expect("acronym pattern is valid"))
}

/// Flatten an answer into a single line and space out short all-caps
/// acronyms so speech synthesizers spell them instead of mispronouncing
/// them ("CITCS" becomes "C I T C S").
#[must_use]
pub fn prepare_speech_text(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    acronym_pattern()
        .replace_all(&flattened, |caps: &regex::Captures<'_>| {
            caps[0]
                .chars()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .into_owned()
}
