//! HTTP surface: the streaming chat endpoint, feedback, health, and the
//! display/admin subscription channel.

mod api;
mod handlers;
mod server;

pub use api::{ChatRequestBody, DonePayload, FeedbackBody, FeedbackResponse, HealthResponse};
pub use handlers::AppState;
pub use server::KioskServer;
