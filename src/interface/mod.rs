//! # Interface Layer
//!
//! The terminal the session is driven from.

pub mod console;
