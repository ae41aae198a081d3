//! # Tools Module
//!
//! Built-in tool handlers. File tools are sandboxed to the working directory
//! through [`fs::LocalFs`]; process tools run programs directly, never through
//! a shell.

pub mod editor;
pub mod files;
pub mod fs;
pub mod limiter;
pub mod process;
pub mod time;

use std::sync::Arc;
use std::time::Duration;

use crate::application::registry::ToolDefinition;
use crate::domain::config::ToolsConfig;
use crate::strings::tools as descriptions;

use editor::FileEditor;
use files::{FileOperations, ListFiles, ReadFile};
use fs::LocalFs;
use limiter::ActionLimiter;
use process::{GitTool, ProcessRunner, RunCommand};
use time::TimeProvider;

/// Every built-in tool, in the order they are declared to the engine.
pub fn builtin_definitions(config: &ToolsConfig, fs: Arc<LocalFs>) -> Vec<ToolDefinition> {
    let runner = ProcessRunner::new(
        Duration::from_secs(config.command_timeout_secs),
        config.max_output_bytes,
    );

    vec![
        ToolDefinition::new(
            "read_file",
            descriptions::READ_FILE,
            ReadFile::input_schema(),
            Arc::new(ReadFile::new(fs.clone())),
        ),
        ToolDefinition::new(
            "list_files",
            descriptions::LIST_FILES,
            ListFiles::input_schema(),
            Arc::new(ListFiles::new(fs.clone())),
        ),
        ToolDefinition::new(
            "file_editor",
            descriptions::FILE_EDITOR,
            editor::input_schema(),
            Arc::new(FileEditor::new(fs.clone())),
        ),
        ToolDefinition::new(
            "file_operations",
            descriptions::FILE_OPERATIONS,
            FileOperations::input_schema(),
            Arc::new(FileOperations::new(fs.clone())),
        ),
        ToolDefinition::new(
            "time_provider",
            descriptions::TIME_PROVIDER,
            TimeProvider::input_schema(),
            Arc::new(TimeProvider),
        ),
        ToolDefinition::new(
            "git",
            descriptions::GIT,
            GitTool::input_schema(),
            Arc::new(GitTool::new(fs.clone(), runner.clone())),
        ),
        ToolDefinition::new(
            "run_command",
            descriptions::RUN_COMMAND,
            RunCommand::input_schema(&config.allowed_commands),
            Arc::new(RunCommand::new(fs, runner, config.allowed_commands.clone())),
        ),
        ToolDefinition::new(
            "action_limiter",
            descriptions::ACTION_LIMITER,
            ActionLimiter::input_schema(),
            Arc::new(ActionLimiter::default()),
        ),
    ]
}
