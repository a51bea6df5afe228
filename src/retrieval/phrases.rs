//! Canned replies and the fixed-pattern greeting/gratitude recognizers.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Reply language selected by the caller.
///
/// Primary is English; secondary is Tagalog for walk-up visitors who switch
/// the kiosk language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Primary,
    Secondary,
}

impl Language {
    /// Stable tag used in cache keys and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Primary => "primary",
            Language::Secondary => "secondary",
        }
    }
}

const GREETING_PRIMARY: &str = "Hello! Welcome to our campus information kiosk. I'm here to help \
you with information about our programs, faculty, facilities, and events. What would you like to \
know?";

const GREETING_SECONDARY: &str = "Halo! Maligayang pagdating sa aming campus information kiosk. \
Nandito ako upang tumulong sa inyo tungkol sa aming mga programa, faculty, facilities, at events. \
Ano ang gusto ninyong malaman?";

const GRATITUDE_PRIMARY: &str = "You're welcome! Feel free to ask if you have any more questions \
about our school.";

const GRATITUDE_SECONDARY: &str = "Walang anuman! Huwag mag-atubiling magtanong kung mayroon pa \
kayong mga tanong tungkol sa aming paaralan.";

const FALLBACK: &str = "I'm specifically designed to assist with questions about our school. \
Please ask me about our programs, faculty, facilities, events, admissions, and scholarships. How \
can I help you?";

fn greeting_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(hi|hello|hey|good morning|good afternoon|good evening|welcome|greetings)\s*[.,!?]*$",
        )
        .expect("greeting pattern is valid")
    })
}

fn gratitude_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(thank you|thankyou|thanks|thank|salamat|maraming salamat)\s*[.,!?]*$")
            .expect("gratitude pattern is valid")
    })
}

/// Return the canned greeting if the question is a bare greeting.
#[must_use]
pub fn greeting_reply(question: &str, language: Language) -> Option<&'static str> {
    if greeting_pattern().is_match(question.trim()) {
        Some(match language {
            Language::Primary => GREETING_PRIMARY,
            Language::Secondary => GREETING_SECONDARY,
        })
    } else {
        None
    }
}

/// Return the canned reply if the question is a bare expression of thanks.
#[must_use]
pub fn gratitude_reply(question: &str, language: Language) -> Option<&'static str> {
    if gratitude_pattern().is_match(question.trim()) {
        Some(match language {
            Language::Primary => GRATITUDE_PRIMARY,
            Language::Secondary => GRATITUDE_SECONDARY,
        })
    } else {
        None
    }
}

/// The canonical reply for questions the knowledge base cannot answer.
#[must_use]
pub fn fallback_answer() -> &'static str {
    FALLBACK
}
