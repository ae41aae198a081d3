//! # Main Entry Point
//!
//! Loads configuration, sets up logging, wires the tool registry, the
//! completion engine and the console, then runs one session.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use tether::application::dispatcher::Dispatcher;
use tether::application::governor::Governor;
use tether::application::logging;
use tether::application::orchestrator::{Orchestrator, SessionEnd};
use tether::application::registry::builtin_registry;
use tether::domain::config::{AppConfig, Profile};
use tether::domain::traits::ChatSink;
use tether::infrastructure::llm::AnthropicClient;
use tether::interface::console::{self, ConsoleSink, StdinInput};
use tether::strings::messages;

/// Chat with Claude from the terminal, with local tools.
#[derive(Parser, Debug)]
#[command(name = "tether", version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Governor limits preset
    #[arg(long, value_enum)]
    profile: Option<CliProfile>,

    /// Directory the file and process tools operate in
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Enable debug logging (also on stderr)
    #[arg(long)]
    debug: bool,

    /// Model id
    #[arg(long)]
    model: Option<String>,

    /// Maximum tokens per response
    #[arg(long)]
    max_tokens: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliProfile {
    /// 15 consecutive, 30 per minute, 5 same-tool, 30 minutes
    Standard,
    /// 100 consecutive, 20 per minute, 100 same-tool, 15 minutes
    Unattended,
}

impl From<CliProfile> for Profile {
    fn from(profile: CliProfile) -> Self {
        match profile {
            CliProfile::Standard => Profile::Standard,
            CliProfile::Unattended => Profile::Unattended,
        }
    }
}

fn apply_cli(config: &mut AppConfig, cli: &Cli) {
    if let Some(profile) = cli.profile {
        config.governor = Profile::from(profile).governor();
    }
    if let Some(workdir) = &cli.workdir {
        config.system.workdir = Some(workdir.display().to_string());
    }
    if cli.debug {
        config.system.debug = true;
    }
    if let Some(model) = &cli.model {
        config.agent.model = model.clone();
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.agent.max_tokens = max_tokens;
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match AppConfig::locate(cli.config.as_deref()) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    apply_cli(&mut config, cli);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let config = load_config(&cli).context("Failed to load configuration")?;

    // 2. Logging Setup
    let _guard = logging::init(&config.system)?;
    tracing::info!(model = %config.agent.model, "Starting tether...");

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e).context("Invalid configuration");
    }

    // 3. Tools
    let workdir = match &config.system.workdir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let registry = builtin_registry(&config.tools, &workdir)?;
    tracing::info!(workdir = %workdir.display(), tools = ?registry.names(), "Tools registered");
    let dispatcher = Dispatcher::new(registry).with_handler_timeout(config.tools.handler_timeout());

    // 4. Completion engine
    let engine = Arc::new(AnthropicClient::new(&config.agent)?);

    // 5. Console
    let chat = Arc::new(ConsoleSink::new(std::io::stdout().is_terminal()));
    let (abort_tx, abort_rx) = watch::channel(false);
    let _interrupts = console::spawn_interrupt_handler(abort_tx, chat.clone());

    println!("{}", messages::SESSION_BANNER);

    // 6. Session
    let mut orchestrator = Orchestrator::new(
        engine,
        dispatcher,
        Governor::new(config.governor.clone()),
        Box::new(StdinInput::new()),
        chat.clone(),
    )
    .with_abort_signal(abort_rx);

    match orchestrator.run().await {
        Ok(SessionEnd::InputClosed) => tracing::info!("Session ended: input closed"),
        Ok(SessionEnd::DurationExceeded) => tracing::info!("Session ended: time limit"),
        Err(e) => {
            tracing::error!(error = ?e, "Session failed");
            chat.send_notification(&messages::fatal_error(&format!("{:#}", e)))
                .await;
            return Err(e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "tether",
            "--profile",
            "unattended",
            "--model",
            "claude-test",
            "--max-tokens",
            "4096",
            "--debug",
        ]);
        let mut config = AppConfig::default();
        apply_cli(&mut config, &cli);

        assert_eq!(config.governor, Profile::Unattended.governor());
        assert_eq!(config.agent.model, "claude-test");
        assert_eq!(config.agent.max_tokens, 4096);
        assert!(config.system.debug);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["tether"]);
        let mut config = AppConfig::default();
        config.governor.max_same_tool_calls = 9;
        apply_cli(&mut config, &cli);
        assert_eq!(config.governor.max_same_tool_calls, 9);
    }
}
