//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! Includes console labels, notices, and error templates.

use crate::domain::errors::LoopViolation;

pub const USER_LABEL: &str = "You";
pub const ASSISTANT_LABEL: &str = "Claude";

pub const SESSION_BANNER: &str = "Chat with Claude (use 'ctrl-c' to interrupt, 'ctrl-d' to quit)";
pub const GENERATION_CANCELLED: &str = "🛑 Generation cancelled. Waiting for your next message.";
pub const PRESS_AGAIN_TO_QUIT: &str = "Press ctrl-c again to quit.";

/// Tool result payload for invocations abandoned after a governor denial.
pub const SKIPPED_AFTER_VIOLATION: &str = "skipped: loop protection stopped this batch";

pub fn loop_protection(violation: &LoopViolation) -> String {
    format!("⚠️ {violation}. Waiting for user input before using more tools.")
}

pub fn session_expired(limit_minutes: u64) -> String {
    format!("⏱️ Session time limit reached ({limit_minutes} min). Please restart the agent if needed.")
}

pub fn fatal_error(err: &str) -> String {
    format!("❌ {err}")
}

// File editor results
pub fn file_exists(path: &str) -> String {
    format!("File {path} already exists. Use append, prepend, or replace modes to modify it.")
}

pub fn file_created(path: &str) -> String {
    format!("Successfully created file {path}")
}

pub const NO_CHANGES_IDENTICAL: &str = "No changes needed - old_str and new_str are identical";

pub fn replaced(count: usize, path: &str) -> String {
    format!("Successfully replaced {count} occurrence(s) in {path}")
}

pub fn appended(path: &str) -> String {
    format!("Successfully appended content to {path}")
}

pub fn prepended(path: &str) -> String {
    format!("Successfully prepended content to {path}")
}

pub fn inserted(line: usize, path: &str) -> String {
    format!("Successfully inserted content at line {line} in {path}")
}

pub fn file_operation_done(operation: &str, source: &str, destination: &str) -> String {
    format!("Successfully performed {operation} operation from '{source}' to '{destination}'")
}
