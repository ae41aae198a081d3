//! # Console Interface
//!
//! Terminal front end: reads user lines from stdin, prints role-labelled
//! output on stdout and notices on stderr, and turns Ctrl-C into an abort
//! signal for the running generation.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::traits::{ChatSink, UserInput};
use crate::strings::messages;

const BLUE: &str = "\x1b[94m";
const YELLOW: &str = "\x1b[93m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

/// A second Ctrl-C inside this window exits the process.
const DOUBLE_PRESS_WINDOW: Duration = Duration::from_secs(2);

pub struct StdinInput {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserInput for StdinInput {
    async fn next_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read from stdin");
                None
            }
        }
    }
}

pub struct ConsoleSink {
    color: bool,
}

impl ConsoleSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    pub fn user_prompt(&self) -> String {
        format!("{}: ", self.paint(BLUE, messages::USER_LABEL))
    }

    pub fn assistant_line(&self, content: &str) -> String {
        format!("{}: {}\n", self.paint(YELLOW, messages::ASSISTANT_LABEL), content)
    }

    pub fn notice_line(&self, content: &str) -> String {
        format!("{}\n", self.paint(RED, content))
    }
}

async fn write_out(text: &str) {
    let mut out = tokio::io::stdout();
    if let Err(e) = out.write_all(text.as_bytes()).await {
        tracing::warn!(error = %e, "Failed to write to stdout");
    }
    let _ = out.flush().await;
}

#[async_trait]
impl ChatSink for ConsoleSink {
    async fn prompt_user(&self) {
        write_out(&self.user_prompt()).await;
    }

    async fn send_message(&self, content: &str) {
        write_out(&self.assistant_line(content)).await;
    }

    async fn send_notification(&self, content: &str) {
        let mut err = tokio::io::stderr();
        let _ = err.write_all(self.notice_line(content).as_bytes()).await;
        let _ = err.flush().await;
    }
}

/// Listen for Ctrl-C. The first press flips `abort` and tells the user how to
/// quit; a second press within two seconds exits with status 130.
pub fn spawn_interrupt_handler(
    abort: watch::Sender<bool>,
    chat: Arc<dyn ChatSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_press: Option<Instant> = None;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Unable to listen for ctrl-c");
                return;
            }

            let now = Instant::now();
            if last_press.is_some_and(|prev| now.duration_since(prev) < DOUBLE_PRESS_WINDOW) {
                tracing::info!("Interrupted twice, exiting");
                std::process::exit(130);
            }
            last_press = Some(now);

            tracing::info!("Interrupt received");
            let _ = abort.send(true);
            chat.send_notification(messages::PRESS_AGAIN_TO_QUIT).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_without_color() {
        let sink = ConsoleSink::new(false);
        assert_eq!(sink.user_prompt(), "You: ");
        assert_eq!(sink.assistant_line("hi"), "Claude: hi\n");
        assert_eq!(sink.notice_line("careful"), "careful\n");
    }

    #[test]
    fn test_labels_with_color() {
        let sink = ConsoleSink::new(true);
        assert_eq!(sink.user_prompt(), "\x1b[94mYou\x1b[0m: ");
        assert!(sink.assistant_line("hi").starts_with("\x1b[93mClaude\x1b[0m: hi"));
    }
}
