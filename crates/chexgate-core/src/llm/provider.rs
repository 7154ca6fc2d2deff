//! Chat backend trait and request types.
//!
//! Defines the interface the orchestrator uses to talk to the chat endpoint,
//! plus the flattening of a conversation into ordered content parts.

use super::prompts::SYSTEM_INSTRUCTION;
use crate::error::Result;
use crate::types::{ChatAnswer, ConversationTurn};
use async_trait::async_trait;
use std::time::Duration;

/// A request for one assistant reply.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// What this call is for, used in logs and error context
    /// (e.g. "chat", "summary", or a condition name)
    pub label: String,
    /// Fixed instruction sent ahead of the conversation
    pub system_instruction: String,
    /// Chat history, oldest first
    pub turns: Vec<ConversationTurn>,
}

impl ChatRequest {
    /// A request continuing a client conversation under the default instruction.
    pub fn conversation(turns: Vec<ConversationTurn>) -> Self {
        Self {
            label: "chat".to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            turns,
        }
    }

    /// A single-question request under the default instruction.
    pub fn single(label: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            turns: vec![ConversationTurn::ask(prompt)],
        }
    }

    /// Flatten into the ordered text parts sent upstream.
    ///
    /// The system instruction comes first, then each turn's user text
    /// followed by its assistant text. Absent or blank assistant text is
    /// skipped rather than sent as an empty part.
    pub fn parts(&self) -> Vec<&str> {
        let mut parts = Vec::with_capacity(1 + self.turns.len() * 2);
        parts.push(self.system_instruction.as_str());
        for turn in &self.turns {
            parts.push(turn.user.as_str());
            if let Some(assistant) = turn.assistant.as_deref() {
                if !assistant.trim().is_empty() {
                    parts.push(assistant);
                }
            }
        }
        parts
    }
}

/// Trait that all chat backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Arc<dyn ChatBackend>` for dynamic dispatch).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Send the conversation and return the assistant's reply.
    async fn converse(&self, request: &ChatRequest) -> Result<ChatAnswer>;

    /// Per-request timeout for this backend.
    fn timeout(&self) -> Duration;
}
