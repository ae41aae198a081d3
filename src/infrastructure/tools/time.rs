use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::errors::ToolError;
use crate::domain::traits::ToolHandler;

#[derive(Debug, Default, Deserialize)]
struct TimeInput {
    #[serde(default)]
    format: String,
}

/// Render `now` as RFC 3339, or with a strftime-style format when one is given.
pub fn format_time(now: DateTime<Local>, format: &str) -> Result<String, ToolError> {
    if format.is_empty() {
        return Ok(now.to_rfc3339());
    }
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ToolError::invalid(format!("invalid time format: {}", format)));
    }
    Ok(now.format_with_items(items.into_iter()).to_string())
}

pub struct TimeProvider;

impl TimeProvider {
    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "Optional strftime-style format, for example '%Y-%m-%d %H:%M'. RFC 3339 is used if not provided."
                }
            }
        })
    }
}

#[async_trait]
impl ToolHandler for TimeProvider {
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let input: TimeInput = if input.is_null() {
            TimeInput::default()
        } else {
            serde_json::from_value(input)?
        };
        format_time(Local::now(), &input.format)
    }
}
