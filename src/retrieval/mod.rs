//! Question matching against the knowledge base.
//!
//! The engine either answers verbatim from stored records, assembles an
//! evidence context for the model, or rejects the question with a canned
//! reply. It never generates text of its own and never calls a model.

mod blocklist;
mod category;
mod engine;
mod normalize;
mod phrases;

pub use blocklist::{IntentBlocklist, IntentCategory, IntentRule, PatternError};
pub use category::{QueryCategory, Topic};
pub use engine::{DirectSource, EvidenceBundle, RejectReason, RetrievalEngine, RetrievalOutcome};
pub use normalize::{normalize_question, tokenize_keywords};
pub use phrases::{fallback_answer, greeting_reply, gratitude_reply, Language};
