//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration.
//! Built-in defaults are overlaid by an optional `config.yaml`, then by the
//! process environment (credential, model, token budget, debug flag).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::errors::ConfigError;

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const MODEL_ENV: &str = "CLAUDE_MODEL";
pub const MAX_TOKENS_ENV: &str = "MAX_TOKENS";
pub const DEBUG_ENV: &str = "DEBUG";

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub governor: GovernorConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

/// Completion engine settings.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            endpoint: None,
            timeout: None,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    1024
}

/// Limits enforced by the safety governor.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GovernorConfig {
    pub max_consecutive_tool_uses: u32,
    pub max_tool_uses_per_minute: u32,
    pub max_same_tool_calls: u32,
    pub max_session_secs: u64,
}

impl GovernorConfig {
    /// Interactive sessions: 15 consecutive, 30/min, 5 same-tool, 30 minutes.
    pub fn standard() -> Self {
        Self {
            max_consecutive_tool_uses: 15,
            max_tool_uses_per_minute: 30,
            max_same_tool_calls: 5,
            max_session_secs: 30 * 60,
        }
    }

    /// Long-running unattended sessions.
    pub fn unattended() -> Self {
        Self {
            max_consecutive_tool_uses: 100,
            max_tool_uses_per_minute: 20,
            max_same_tool_calls: 100,
            max_session_secs: 15 * 60,
        }
    }

    pub fn max_session_duration(&self) -> Duration {
        Duration::from_secs(self.max_session_secs)
    }

    /// Reject limits that would deny every tool call, or every repeat.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("governor.max_consecutive_tool_uses", self.max_consecutive_tool_uses as u64, 1),
            ("governor.max_tool_uses_per_minute", self.max_tool_uses_per_minute as u64, 1),
            ("governor.max_same_tool_calls", self.max_same_tool_calls as u64, 2),
            ("governor.max_session_secs", self.max_session_secs, 1),
        ];
        for (var, value, min) in checks {
            if value < min {
                return Err(ConfigError::InvalidNumber {
                    var: var.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Named governor presets selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Standard,
    Unattended,
}

impl Profile {
    pub fn governor(&self) -> GovernorConfig {
        match self {
            Profile::Standard => GovernorConfig::standard(),
            Profile::Unattended => GovernorConfig::unattended(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ToolsConfig {
    /// Upper bound on a single handler call; 0 disables the bound.
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_secs: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Programs `run_command` may start, matched by exact name.
    #[serde(default = "default_allowed_commands")]
    pub allowed_commands: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            handler_timeout_secs: default_handler_timeout(),
            command_timeout_secs: default_command_timeout(),
            max_output_bytes: default_max_output_bytes(),
            allowed_commands: default_allowed_commands(),
        }
    }
}

impl ToolsConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_secs > 0).then(|| Duration::from_secs(self.handler_timeout_secs))
    }
}

fn default_handler_timeout() -> u64 {
    120
}
fn default_command_timeout() -> u64 {
    120
}
fn default_max_output_bytes() -> usize {
    100 * 1024
}
fn default_allowed_commands() -> Vec<String> {
    ["cargo", "go", "npm", "yarn", "pnpm", "make", "gradle", "mvn"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// System-level settings.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct SystemConfig {
    /// Working directory the file tools are rooted at (defaults to cwd)
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

impl SystemConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("data"))
    }
}

impl AppConfig {
    /// Parse a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// First existing config file: explicit path, `./data/config.yaml`,
    /// then the per-user config directory.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from("data/config.yaml");
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("tether").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.agent.api_key = Some(key);
        }
        if let Some(model) = non_empty(MODEL_ENV) {
            self.agent.model = model;
        }
        if let Some(raw) = non_empty(MAX_TOKENS_ENV) {
            self.agent.max_tokens = parse_max_tokens(&raw)?;
        }
        if let Some(debug) = non_empty(DEBUG_ENV) {
            self.system.debug = debug == "true";
        }
        Ok(())
    }

    /// Final checks before the session starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.agent.api_key.as_deref() {
            Some(key) if !key.is_empty() => {}
            _ => return Err(ConfigError::MissingCredential(API_KEY_ENV.to_string())),
        }
        if self.agent.max_tokens == 0 {
            return Err(ConfigError::InvalidNumber {
                var: MAX_TOKENS_ENV.to_string(),
                value: "0".to_string(),
            });
        }
        self.governor.validate()
    }
}

fn parse_max_tokens(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var: MAX_TOKENS_ENV.to_string(),
            value: raw.to_string(),
        }),
    }
}
