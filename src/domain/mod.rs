//! # Domain Layer
//!
//! Core definitions, types, and traits that define the conversation domain.
//! Independent of specific frameworks, serving as the contract for other layers.

pub mod config;
pub mod errors;
pub mod traits;
pub mod types;
