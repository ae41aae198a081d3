//! Anthropic (Claude) Messages API client with tool use.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Error;
use crate::domain::config::AgentConfig;
use crate::domain::traits::CompletionEngine;
use crate::domain::types::{ContentBlock, Conversation, ToolSpec, Turn};

const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// HTTP client reused across requests
fn http_client() -> &'static Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client")
    })
}

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSpec],
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseContent>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unsupported,
}

/// Map the conversation to API messages. Consecutive turns that land on the
/// same role are merged into one message, since the API requires roles to
/// alternate. Empty text is dropped.
fn to_messages(conversation: &Conversation) -> Vec<AnthropicMessage> {
    let mut messages: Vec<AnthropicMessage> = Vec::new();

    for turn in conversation.turns() {
        let (role, blocks) = match turn {
            Turn::UserText(text) => (
                "user",
                vec![AnthropicContentBlock::Text { text: text.clone() }],
            ),
            Turn::AssistantContent(content) => (
                "assistant",
                content
                    .iter()
                    .map(|block| match block {
                        ContentBlock::Text { value } => AnthropicContentBlock::Text {
                            text: value.clone(),
                        },
                        ContentBlock::ToolInvocation { id, name, input } => {
                            AnthropicContentBlock::ToolUse {
                                id: id.clone(),
                                name: name.clone(),
                                input: input.clone(),
                            }
                        }
                    })
                    .collect(),
            ),
            Turn::ToolResults(results) => (
                "user",
                results
                    .iter()
                    .map(|result| AnthropicContentBlock::ToolResult {
                        tool_use_id: result.id.clone(),
                        content: result.payload.clone(),
                        is_error: result.is_error,
                    })
                    .collect(),
            ),
        };

        let blocks: Vec<AnthropicContentBlock> = blocks
            .into_iter()
            .filter(|block| !matches!(block, AnthropicContentBlock::Text { text } if text.trim().is_empty()))
            .collect();
        if blocks.is_empty() {
            continue;
        }

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(AnthropicMessage {
                role,
                content: blocks,
            }),
        }
    }

    messages
}

fn from_response(response: AnthropicResponse) -> Vec<ContentBlock> {
    response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicResponseContent::Text { text } => Some(ContentBlock::text(text)),
            AnthropicResponseContent::ToolUse { id, name, input } => {
                Some(ContentBlock::tool_invocation(id, name, input))
            }
            AnthropicResponseContent::Unsupported => None,
        })
        .collect()
}

/// Turn a non-2xx body into a message, preferring the API's `error.type: error.message`.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(error_json) = serde_json::from_str::<Value>(body)
        && let Some(error) = error_json.get("error")
        && let (Some(error_type), Some(error_msg)) = (
            error.get("type").and_then(Value::as_str),
            error.get("message").and_then(Value::as_str),
        )
    {
        return format!("{}: {}", error_type, error_msg);
    }
    format!("HTTP {}: {}", status, body)
}

pub struct AnthropicClient {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    timeout: Option<u64>,
}

impl AnthropicClient {
    pub fn new(config: &AgentConfig) -> Result<Self, Error> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::new(PROVIDER, "API key is not configured"))?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: config.timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Execute a messages request and return the response content blocks.
    pub async fn send(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> Result<Vec<ContentBlock>, Error> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: to_messages(conversation),
            tools,
        };

        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = tools.len(),
            "Sending completion request"
        );

        let mut request_builder = http_client()
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(timeout_secs) = self.timeout {
            request_builder = request_builder.timeout(std::time::Duration::from_secs(timeout_secs));
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| Error::new(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::new(PROVIDER, error_message(status, &error_text)));
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| Error::new(PROVIDER, format!("Failed to parse response: {}", e)))?;

        tracing::debug!(
            stop_reason = anthropic_response.stop_reason.as_deref().unwrap_or("unknown"),
            blocks = anthropic_response.content.len(),
            "Completion received"
        );

        Ok(from_response(anthropic_response))
    }
}

#[async_trait]
impl CompletionEngine for AnthropicClient {
    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> anyhow::Result<Vec<ContentBlock>> {
        Ok(self.send(conversation, tools).await?)
    }
}
