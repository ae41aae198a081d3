//! # Error Taxonomy
//!
//! Typed failures for the dispatch path, the safety governor, the tool registry
//! and configuration loading. Everything in the dispatch path is turned into
//! data (a tool result) before it reaches the orchestrator; only
//! `ConfigError` is ever fatal.

use thiserror::Error;

/// Failure reported while resolving or running a tool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Malformed structured input (missing fields, wrong types, bad mode).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Execution(String),

    #[error("tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        ToolError::Execution(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidInput(message.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::InvalidInput(format!("failed to parse input: {}", err))
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Execution(err.to_string())
    }
}

/// Which governor limit tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Consecutive,
    Rate,
    SameTool,
}

/// Raised by the safety governor. Ends the current dispatch batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoopViolation {
    #[error("loop protection: too many consecutive tool uses without user input ({current}/{max})")]
    Consecutive { current: u32, max: u32 },

    #[error("loop protection: tool use rate limit reached ({count}/{max} in {elapsed_secs:.1}s)")]
    Rate {
        count: u32,
        max: u32,
        elapsed_secs: f64,
    },

    #[error("loop protection: too many consecutive calls to the same tool: {tool} ({count}/{max})")]
    SameTool { tool: String, count: u32, max: u32 },
}

impl LoopViolation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            LoopViolation::Consecutive { .. } => ViolationKind::Consecutive,
            LoopViolation::Rate { .. } => ViolationKind::Rate,
            LoopViolation::SameTool { .. } => ViolationKind::SameTool,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate tool registration: {0}")]
    Duplicate(String),

    #[error("tool name cannot be empty")]
    EmptyName,

    #[error("invalid working directory {path}: {reason}")]
    Workdir { path: String, reason: String },
}

/// Startup-time configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingCredential(String),

    #[error("invalid {var} value: {value:?}")]
    InvalidNumber { var: String, value: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
