//! Pattern rules for unsafe or off-topic question intents.
//!
//! Matching questions are routed to the canned off-topic reply before any
//! knowledge base access or model call.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category of blocked intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Attempts to control the kiosk process (shutdown, restart, kill).
    Operational,
    /// Intrusion or credential probing (hack, exploit, breach).
    Intrusion,
    /// Requests to run code or commands.
    CodeExecution,
    /// Attempts to tamper with stored data.
    DataTampering,
    /// Probing the assistant's identity or instructions.
    PromptProbe,
    /// Explicit or adult content.
    Explicit,
}

/// Error type for blocklist pattern compilation.
#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    /// Invalid regex pattern.
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A single intent rule with category and pattern.
#[derive(Debug, Clone)]
pub struct IntentRule {
    category: IntentCategory,
    pattern: Regex,
    description: String,
}

impl IntentRule {
    /// Create a new rule. Patterns are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::InvalidPattern` if the regex is invalid.
    pub fn new(
        category: IntentCategory,
        pattern: &str,
        description: impl Into<String>,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            category,
            pattern: Regex::new(&format!("(?i){pattern}"))?,
            description: description.into(),
        })
    }

    /// Check if the question matches this rule.
    #[must_use]
    pub fn matches(&self, question: &str) -> bool {
        self.pattern.is_match(question)
    }

    /// Get the rule category.
    #[must_use]
    pub fn category(&self) -> IntentCategory {
        self.category
    }

    /// Get the rule description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A collection of intent rules checked against incoming questions.
#[derive(Debug, Clone, Default)]
pub struct IntentBlocklist {
    rules: Vec<IntentRule>,
}

impl IntentBlocklist {
    /// Create an empty blocklist.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a blocklist with the default kiosk rules.
    #[must_use]
    pub fn with_default_rules() -> Self {
        let rules = Self::default_rules()
            .into_iter()
            .filter_map(|result| match result {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to compile default intent rule");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Add a rule to the blocklist.
    pub fn add_rule(&mut self, rule: IntentRule) {
        self.rules.push(rule);
    }

    /// Check a question against all rules, returning the first match.
    #[must_use]
    pub fn check(&self, question: &str) -> Option<&IntentRule> {
        self.rules.iter().find(|rule| rule.matches(question))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    fn default_rules() -> Vec<Result<IntentRule, PatternError>> {
        vec![
            IntentRule::new(
                IntentCategory::Operational,
                r"^\s*(exit|quit|shutdown|close|restart|kill|terminate)\b",
                "Kiosk process control",
            ),
            IntentRule::new(
                IntentCategory::Intrusion,
                r"^\s*(hack|crack|exploit|vulnerability|breach)\b",
                "Intrusion or credential probing",
            ),
            IntentRule::new(
                IntentCategory::Explicit,
                r"^\s*(inappropriate|adult|nsfw|explicit|sexual)\b",
                "Explicit content",
            ),
            IntentRule::new(
                IntentCategory::DataTampering,
                r"(delete|remove|drop)\s+(database|tables|data)\b",
                "Stored data tampering",
            ),
            IntentRule::new(
                IntentCategory::CodeExecution,
                r"\b(execute|run)\s+(code|script|command)s?\b",
                "Code or command execution",
            ),
            IntentRule::new(
                IntentCategory::PromptProbe,
                r"^\s*(who are you|what is your name|tell me about yourself)\b",
                "Assistant identity probing",
            ),
            IntentRule::new(
                IntentCategory::PromptProbe,
                r"^\s*(instruction|prompt|system)\b",
                "Instruction probing",
            ),
        ]
    }
}
