//! Schema-aware query agent
//!
//! The conductor only sees the [`QueryAgent`] trait. [`SqlAgent`] is the
//! production implementation: a bounded tool loop over the LLM router with
//! the SQL tools from [`crate::tools`].

pub mod core;

pub use core::SqlAgent;

use async_trait::async_trait;
use sdk::errors::EngineError;

use crate::llm::{Message, MessageRole};

/// A tool-using agent that answers one question from the database.
#[async_trait]
pub trait QueryAgent: Send + Sync {
    /// Tables the agent can see
    async fn usable_table_names(&self) -> Result<Vec<String>, EngineError>;

    /// Schema and sample rows for every usable table
    async fn table_info(&self) -> Result<String, EngineError>;

    /// Run the agent over a conversation and return the full transcript.
    ///
    /// The answer is the last assistant message in the returned sequence.
    async fn invoke(&self, messages: Vec<Message>) -> Result<Vec<Message>, EngineError>;
}

/// Content of the last assistant-authored message, if any.
pub fn last_assistant_message(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.content.as_str())
}
