//! Streaming client for the local inference service and the grounded
//! instruction frame it is invoked with.

mod client;
mod prompt;

pub use client::{
    ChatMessage, InferenceError, InferenceProvider, OllamaClient, Role, TokenStream,
};
pub use prompt::{build_messages, build_system_prompt, find_hedging, ANSWER_TOKEN_BUDGET};
