//! # Application Layer
//!
//! Contains the core logic of a session: the conversation orchestrator, the
//! safety governor that bounds unattended tool use, the tool registry and the
//! dispatcher, plus logging setup.

pub mod dispatcher;
pub mod governor;
pub mod logging;
pub mod orchestrator;
pub mod registry;
