//! # Tether
//!
//! Interactive terminal agent: a completion engine converses with the user
//! and may call local tools, bounded by a safety governor.
//!
//! - Domain: configuration, conversation types, seams
//! - Application: orchestrator, governor, registry, dispatcher, logging
//! - Infrastructure: Anthropic client, tool handlers
//! - Interface: console

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod strings;
