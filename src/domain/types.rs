//! # Domain Types
//!
//! The conversation model shared by the orchestrator, the dispatcher and the
//! completion-engine client. Serde names match the tool protocol on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit inside an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(rename = "text")]
        value: String,
    },
    #[serde(rename = "tool_use")]
    ToolInvocation {
        id: String,
        name: String,
        input: Value,
    },
}

impl ContentBlock {
    pub fn text(value: impl Into<String>) -> Self {
        ContentBlock::Text {
            value: value.into(),
        }
    }

    pub fn tool_invocation(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolInvocation {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn is_tool_invocation(&self) -> bool {
        matches!(self, ContentBlock::ToolInvocation { .. })
    }

    /// True when at least one block asks for a tool.
    pub fn has_tool_invocations(blocks: &[ContentBlock]) -> bool {
        blocks.iter().any(ContentBlock::is_tool_invocation)
    }
}

/// Outcome of one tool invocation, echoed back under the invocation's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    #[serde(rename = "tool_use_id")]
    pub id: String,
    #[serde(rename = "content")]
    pub payload: String,
    pub is_error: bool,
}

impl ToolResultBlock {
    pub fn success(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            is_error: false,
        }
    }

    pub fn error(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            is_error: true,
        }
    }
}

/// One atomic addition to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Turn {
    UserText(String),
    AssistantContent(Vec<ContentBlock>),
    ToolResults(Vec<ToolResultBlock>),
}

/// Append-only sequence of turns. Turns cannot be edited or removed once pushed.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Outbound tool declaration sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}
