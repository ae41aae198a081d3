//! # Action Limiter
//!
//! Advisory limiter the model can consult about its own activity. It records
//! named actions against targets and reports when a limit has been crossed.
//! Crossing a limit is a notice, not a tool error. Statistics belong to the
//! tool instance.

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::errors::ToolError;
use crate::domain::traits::ToolHandler;

#[derive(Debug, Clone)]
pub struct ActionLimits {
    pub max_total: u32,
    pub max_per_target: u32,
    pub max_consecutive_same: u32,
    /// More than `burst_actions` within `burst_window` of the start trips.
    pub burst_actions: u32,
    pub burst_window: Duration,
    pub max_session: Duration,
}

impl Default for ActionLimits {
    fn default() -> Self {
        Self {
            max_total: 50,
            max_per_target: 10,
            max_consecutive_same: 5,
            burst_actions: 10,
            burst_window: Duration::from_secs(5),
            max_session: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ActionInput {
    #[serde(default)]
    action: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    check_only: bool,
    #[serde(default)]
    reset_state: bool,
}

#[derive(Debug, Serialize)]
struct ActionStats {
    total_actions: u32,
    actions_by_type: BTreeMap<String, u32>,
    actions_by_target: BTreeMap<String, u32>,
    actions_by_type_path: BTreeMap<String, BTreeMap<String, u32>>,
    start_time: String,
    last_action_time: String,
    consecutive_same: u32,
    last_action: String,
    last_target: String,
    #[serde(skip)]
    started: Instant,
}

impl ActionStats {
    fn new(now: Instant) -> Self {
        let stamp = Local::now().to_rfc3339();
        Self {
            total_actions: 0,
            actions_by_type: BTreeMap::new(),
            actions_by_target: BTreeMap::new(),
            actions_by_type_path: BTreeMap::new(),
            start_time: stamp.clone(),
            last_action_time: stamp,
            consecutive_same: 0,
            last_action: String::new(),
            last_target: String::new(),
            started: now,
        }
    }

    fn record(&mut self, action: &str, target: &str) {
        self.total_actions += 1;
        *self.actions_by_type.entry(action.to_string()).or_default() += 1;
        *self.actions_by_target.entry(target.to_string()).or_default() += 1;
        *self
            .actions_by_type_path
            .entry(action.to_string())
            .or_default()
            .entry(target.to_string())
            .or_default() += 1;

        if action == self.last_action && target == self.last_target {
            self.consecutive_same += 1;
        } else {
            self.consecutive_same = 1;
        }
        self.last_action = action.to_string();
        self.last_target = target.to_string();
        self.last_action_time = Local::now().to_rfc3339();
    }
}

fn exceeded(limits: &ActionLimits, stats: &ActionStats, now: Instant) -> Option<String> {
    if stats.total_actions >= limits.max_total {
        return Some(format!(
            "Total action limit exceeded ({} actions)",
            limits.max_total
        ));
    }

    if let Some((target, count)) = stats
        .actions_by_target
        .iter()
        .find(|(_, count)| **count >= limits.max_per_target)
    {
        return Some(format!(
            "Too many actions ({}) on the same target: {}",
            count, target
        ));
    }

    if stats.consecutive_same >= limits.max_consecutive_same {
        return Some(format!(
            "Too many consecutive identical actions ({}): {} on {}",
            stats.consecutive_same, stats.last_action, stats.last_target
        ));
    }

    let elapsed = now.saturating_duration_since(stats.started);
    if stats.total_actions > limits.burst_actions && elapsed < limits.burst_window {
        return Some(format!(
            "Too many actions ({}) in a short time ({:.1} seconds)",
            stats.total_actions,
            elapsed.as_secs_f64()
        ));
    }

    if elapsed > limits.max_session {
        return Some(format!(
            "Session time limit exceeded ({:.1} minutes)",
            elapsed.as_secs_f64() / 60.0
        ));
    }

    None
}

pub struct ActionLimiter {
    limits: ActionLimits,
    stats: Mutex<Option<ActionStats>>,
}

impl ActionLimiter {
    pub fn new(limits: ActionLimits) -> Self {
        Self {
            limits,
            stats: Mutex::new(None),
        }
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "The action being performed (e.g., 'edit_file', 'create_file')"
                },
                "target": {
                    "type": "string",
                    "description": "The target of the action (e.g., file path)"
                },
                "check_only": {
                    "type": "boolean",
                    "description": "If true, only check limits without recording the action"
                },
                "reset_state": {
                    "type": "boolean",
                    "description": "If true, reset all counters and state"
                }
            },
            "required": ["action"]
        })
    }

    async fn evaluate(&self, input: ActionInput, now: Instant) -> Result<String, ToolError> {
        let mut guard = self.stats.lock().await;

        if input.reset_state {
            *guard = Some(ActionStats::new(now));
            return Ok("Action stats reset successfully".to_string());
        }

        let stats = guard.get_or_insert_with(|| ActionStats::new(now));

        if let Some(reason) = exceeded(&self.limits, stats, now) {
            tracing::warn!(reason = %reason, "Action limit exceeded");
            return Ok(format!("Action limit exceeded: {}", reason));
        }

        if !input.check_only && !input.action.is_empty() {
            stats.record(&input.action, &input.target);
        }

        serde_json::to_string_pretty(stats).map_err(|e| ToolError::execution(e.to_string()))
    }
}

impl Default for ActionLimiter {
    fn default() -> Self {
        Self::new(ActionLimits::default())
    }
}

#[async_trait]
impl ToolHandler for ActionLimiter {
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let input: ActionInput = serde_json::from_value(input)?;
        self.evaluate(input, Instant::now()).await
    }
}
