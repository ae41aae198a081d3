//! # Domain Traits
//!
//! Abstract interfaces for the collaborators of the conversation loop.
//! Allows for pluggable implementations in the Infrastructure and Interface layers
//! (and scripted fakes in tests).

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::ToolError;
use crate::domain::types::{ContentBlock, Conversation, ToolSpec};

/// The remote text-completion engine, treated as a black box.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Generate the next assistant response for the conversation so far.
    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> anyhow::Result<Vec<ContentBlock>>;
}

/// Source of user text. `None` signals end of input.
#[async_trait]
pub trait UserInput: Send {
    async fn next_line(&mut self) -> Option<String>;
}

/// Where user-facing output goes (console, test recorder, ...).
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Show the prompt before waiting for user input
    async fn prompt_user(&self);

    /// Emit assistant text to the user
    async fn send_message(&self, content: &str);

    /// Emit an operator-visible notice (errors, limits)
    async fn send_notification(&self, content: &str);
}

/// Implementation behind one registered tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: Value) -> Result<String, ToolError>;
}
