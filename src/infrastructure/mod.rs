//! # Infrastructure Layer
//!
//! Handles interactions with external systems: the completion engine over
//! HTTP, the local filesystem and child processes. Implements the traits
//! defined in the Domain layer (`CompletionEngine`, `ToolHandler`).

pub mod llm;
pub mod tools;
