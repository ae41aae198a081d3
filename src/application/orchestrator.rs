//! # Conversation Orchestrator
//!
//! The core loop that drives the session: read user text, ask the completion
//! engine for a response, run any requested tools through the safety governor and
//! the dispatcher, and feed the results back without waiting for the user.
//!
//! States: `AwaitingUserInput` -> `Generating` -> (`DispatchingTools` -> `Generating`)*
//! -> `AwaitingUserInput`. Tool invocations in one response are processed strictly
//! in order; a governor denial abandons the rest of the batch.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::application::dispatcher::Dispatcher;
use crate::application::governor::{Governor, GovernorState};
use crate::domain::errors::LoopViolation;
use crate::domain::traits::{ChatSink, CompletionEngine, UserInput};
use crate::domain::types::{ContentBlock, Conversation, ToolResultBlock, ToolSpec, Turn};
use crate::strings::messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingUserInput,
    Generating,
    DispatchingTools,
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    InputClosed,
    DurationExceeded,
}

pub struct Orchestrator {
    engine: Arc<dyn CompletionEngine>,
    dispatcher: Dispatcher,
    tool_specs: Vec<ToolSpec>,
    governor: Governor,
    governor_state: GovernorState,
    input: Box<dyn UserInput>,
    chat: Arc<dyn ChatSink>,
    conversation: Conversation,
    state: SessionState,
    pending: Vec<ContentBlock>,
    abort_signal: Option<watch::Receiver<bool>>,
    session_start: Option<Instant>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn CompletionEngine>,
        dispatcher: Dispatcher,
        governor: Governor,
        input: Box<dyn UserInput>,
        chat: Arc<dyn ChatSink>,
    ) -> Self {
        let tool_specs = dispatcher.specs();
        Self {
            engine,
            dispatcher,
            tool_specs,
            governor,
            governor_state: GovernorState::default(),
            input,
            chat,
            conversation: Conversation::new(),
            state: SessionState::AwaitingUserInput,
            pending: Vec::new(),
            abort_signal: None,
            session_start: None,
        }
    }

    /// Cancel in-flight generations when the signal flips to `true`.
    pub fn with_abort_signal(mut self, signal: watch::Receiver<bool>) -> Self {
        self.abort_signal = Some(signal);
        self
    }

    /// Override the session start (defaults to the moment `run` is called).
    pub fn with_session_start(mut self, start: Instant) -> Self {
        self.session_start = Some(start);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn governor_state(&self) -> &GovernorState {
        &self.governor_state
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run until input ends or the session-duration limit fires.
    /// Returns `Err` only when the completion engine cannot be reached.
    pub async fn run(&mut self) -> Result<SessionEnd> {
        let start = self.session_start.unwrap_or_else(Instant::now);
        self.governor_state = GovernorState::new(start);
        tracing::info!(tools = self.tool_specs.len(), "Starting session");

        loop {
            if self.governor.session_expired(&self.governor_state, Instant::now()) {
                let limit = self.governor.config().max_session_duration();
                tracing::warn!(
                    session_secs = start.elapsed().as_secs(),
                    limit_secs = limit.as_secs(),
                    "Session time limit reached"
                );
                self.chat
                    .send_notification(&messages::session_expired(limit.as_secs() / 60))
                    .await;
                return Ok(SessionEnd::DurationExceeded);
            }

            match self.state {
                SessionState::AwaitingUserInput => {
                    self.chat.prompt_user().await;
                    let Some(line) = self.input.next_line().await else {
                        tracing::info!("User input closed, ending session");
                        return Ok(SessionEnd::InputClosed);
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.governor.reset_for_user_input(&mut self.governor_state);
                    self.conversation.push(Turn::UserText(line));
                    self.state = SessionState::Generating;
                }
                SessionState::Generating => {
                    self.generate_step().await?;
                }
                SessionState::DispatchingTools => {
                    let blocks = std::mem::take(&mut self.pending);
                    if let Some(violation) = self.dispatch_batch(&blocks).await {
                        self.chat
                            .send_notification(&messages::loop_protection(&violation))
                            .await;
                        self.state = SessionState::AwaitingUserInput;
                    } else {
                        self.state = SessionState::Generating;
                    }
                }
            }
        }
    }

    async fn generate_step(&mut self) -> Result<()> {
        let Some(blocks) = self.generate().await? else {
            tracing::info!("Generation cancelled by user");
            self.chat.send_notification(messages::GENERATION_CANCELLED).await;
            self.state = SessionState::AwaitingUserInput;
            return Ok(());
        };

        for block in &blocks {
            if let ContentBlock::Text { value } = block {
                self.chat.send_message(value).await;
            }
        }

        if blocks.is_empty() {
            tracing::warn!("Completion engine returned an empty response");
            self.state = SessionState::AwaitingUserInput;
            return Ok(());
        }

        let has_tools = ContentBlock::has_tool_invocations(&blocks);
        self.conversation.push(Turn::AssistantContent(blocks.clone()));

        if has_tools {
            self.pending = blocks;
            self.state = SessionState::DispatchingTools;
        } else {
            self.state = SessionState::AwaitingUserInput;
        }
        Ok(())
    }

    /// `Ok(None)` when the abort signal fired first.
    async fn generate(&mut self) -> Result<Option<Vec<ContentBlock>>> {
        let call = self.engine.complete(&self.conversation, &self.tool_specs);

        let result = match self.abort_signal.as_mut() {
            Some(signal) => {
                // Presses that arrived while idle must not cancel this request.
                signal.borrow_and_update();
                tokio::select! {
                    result = call => Some(result),
                    _ = wait_for_abort(signal) => None,
                }
            }
            None => Some(call.await),
        };

        match result {
            Some(response) => {
                let blocks = response.context("completion request failed")?;
                Ok(Some(blocks))
            }
            None => Ok(None),
        }
    }

    /// Process every invocation in order and append one `ToolResults` turn.
    /// Each invocation id gets exactly one result; after a denial the remaining
    /// invocations are answered as skipped without running.
    async fn dispatch_batch(&mut self, blocks: &[ContentBlock]) -> Option<LoopViolation> {
        let mut results = Vec::new();
        let mut violation: Option<LoopViolation> = None;

        for block in blocks {
            let ContentBlock::ToolInvocation { id, name, input } = block else {
                continue;
            };

            if violation.is_some() {
                results.push(ToolResultBlock::error(id, messages::SKIPPED_AFTER_VIOLATION));
                continue;
            }

            match self
                .governor
                .check_and_record(&mut self.governor_state, name, Instant::now())
            {
                Ok(()) => results.push(self.dispatcher.dispatch(id, name, input).await),
                Err(denied) => {
                    tracing::error!(tool = %name, error = %denied, "Error processing tool usage");
                    results.push(ToolResultBlock::error(id, denied.to_string()));
                    violation = Some(denied);
                }
            }
        }

        self.conversation.push(Turn::ToolResults(results));
        violation
    }
}

async fn wait_for_abort(signal: &mut watch::Receiver<bool>) {
    loop {
        if signal.changed().await.is_err() {
            // Sender gone: nothing can abort any more.
            std::future::pending::<()>().await;
        }
        if *signal.borrow_and_update() {
            return;
        }
    }
}
