//! # Strings Module
//!
//! Centralizes user-facing strings and tool descriptions.
//! Ensures consistency in messaging and easier updates.

pub mod messages;
pub mod tools;
