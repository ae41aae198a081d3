//! # Logging Setup
//!
//! Installs the global `tracing` subscriber: a non-blocking file layer that is
//! always on, plus a stderr layer when debug logging is enabled. The console
//! itself belongs to the conversation, so nothing is logged to stdout.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::SystemConfig;

pub const LOG_FILE: &str = "session.log";

/// Default filter directives when `RUST_LOG` is not set.
pub fn default_directives(debug: bool) -> &'static str {
    if debug {
        "debug,hyper=warn,reqwest=warn"
    } else {
        "info,hyper=warn,reqwest=warn"
    }
}

/// Initialize logging. The returned guard must be held until exit so buffered
/// lines reach the log file.
pub fn init(system: &SystemConfig) -> Result<WorkerGuard> {
    let data_dir = system.data_dir();
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
    }

    // Clear previous session log
    clear_previous_log(&data_dir);

    let file_appender = tracing_appender::rolling::never(&data_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(system.debug)));

    // Layer for file (Always active)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let console_layer = if system.debug {
        Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn clear_previous_log(data_dir: &Path) {
    let log_path = data_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = fs::remove_file(log_path);
    }
}
