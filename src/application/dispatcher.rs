//! # Tool Dispatcher
//!
//! Resolves a tool by name and runs its handler, turning every outcome into a
//! [`ToolResultBlock`]. Nothing raised by a handler escapes as an error: unknown
//! tools, bad input, I/O failures and timeouts all come back as data so the
//! completion engine can see and correct its own mistakes.

use serde_json::Value;
use std::time::Duration;

use crate::application::registry::ToolRegistry;
use crate::domain::errors::ToolError;
use crate::domain::types::{ToolResultBlock, ToolSpec};

pub struct Dispatcher {
    registry: ToolRegistry,
    handler_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            handler_timeout: None,
        }
    }

    /// Bound each handler call; `None` lets handlers block indefinitely.
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.registry.specs()
    }

    pub async fn dispatch(&self, id: &str, name: &str, input: &Value) -> ToolResultBlock {
        match self.run(name, input).await {
            Ok(payload) => ToolResultBlock::success(id, payload),
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "Tool returned an error");
                ToolResultBlock::error(id, err.to_string())
            }
        }
    }

    async fn run(&self, name: &str, input: &Value) -> Result<String, ToolError> {
        let Some(tool) = self.registry.get(name) else {
            tracing::error!(tool = name, "Tool not found");
            return Err(ToolError::NotFound(name.to_string()));
        };

        tracing::info!(tool = name, input = %input, "Executing tool");

        let call = tool.handler.call(input.clone());
        match self.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ToolError::Timeout {
                    tool: name.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => call.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::ToolDefinition;
    use crate::domain::traits::ToolHandler;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct Upper;

    #[async_trait]
    impl ToolHandler for Upper {
        async fn call(&self, input: Value) -> Result<String, ToolError> {
            let text = input
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::invalid("text is required"))?;
            Ok(text.to_uppercase())
        }
    }

    struct Stall;

    #[async_trait]
    impl ToolHandler for Stall {
        async fn call(&self, _input: Value) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("late".into())
        }
    }

    fn dispatcher() -> Dispatcher {
        let registry = ToolRegistry::from_definitions(vec![
            ToolDefinition::new("upper", "uppercase", json!({}), Arc::new(Upper)),
            ToolDefinition::new("stall", "never returns in time", json!({}), Arc::new(Stall)),
        ])
        .unwrap();
        Dispatcher::new(registry).with_handler_timeout(Some(Duration::from_millis(50)))
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let result = dispatcher().dispatch("id1", "upper", &json!({"text": "abc"})).await;
        assert_eq!(result, ToolResultBlock::success("id1", "ABC"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let result = dispatcher().dispatch("id2", "nope", &json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.id, "id2");
        assert_eq!(result.payload, "tool not found: nope");
    }

    #[tokio::test]
    async fn test_handler_error_is_captured() {
        let result = dispatcher().dispatch("id3", "upper", &json!({})).await;
        assert!(result.is_error);
        assert!(result.payload.contains("text is required"));
    }

    #[tokio::test]
    async fn test_handler_timeout_is_error_result() {
        let result = dispatcher().dispatch("id4", "stall", &json!({})).await;
        assert!(result.is_error);
        assert!(result.payload.contains("timed out"));
    }
}
