//! Chat endpoint integration for conversations and report generation.
//!
//! Provides the chat backend abstraction, the Gemini `generateContent`
//! client, and the fixed prompts the orchestrator sends.

pub(crate) mod gemini;
pub mod prompts;
pub(crate) mod provider;

pub use gemini::GeminiChatClient;
pub use provider::{ChatBackend, ChatRequest};
