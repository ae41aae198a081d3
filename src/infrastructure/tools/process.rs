//! # Process Tools
//!
//! `git` and `run_command`. Both launch a program directly (never through a
//! shell) inside the working directory, bounded by the command timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use super::fs::LocalFs;
use crate::domain::errors::ToolError;
use crate::domain::traits::ToolHandler;

#[derive(Debug)]
pub struct ProcessOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stdout and stderr in one block, with the exit code appended on failure.
    pub fn combined(&self) -> String {
        let mut result = String::new();
        if !self.stdout.is_empty() {
            result.push_str(&self.stdout);
        }
        if !self.stderr.is_empty() {
            if !result.is_empty() {
                result.push_str("\n--- STDERR ---\n");
            }
            result.push_str(&self.stderr);
        }
        if !self.success {
            if !result.is_empty() {
                result.push('\n');
            }
            match self.exit_code {
                Some(code) => result.push_str(&format!("[Exit Code: {}]", code)),
                None => result.push_str("[Terminated by signal]"),
            }
        }
        result
    }
}

/// Cut `text` to at most `max` bytes on a char boundary.
pub fn truncate_output(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... [truncated {} bytes]", &text[..end], text.len() - end)
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }

    pub async fn run(
        &self,
        tool: &str,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ProcessOutput, ToolError> {
        tracing::debug!(tool, program, ?args, cwd = %cwd.display(), "Spawning process");

        let child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::execution(format!("failed to start {}: {}", program, e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout {
                tool: tool.to_string(),
                secs: self.timeout.as_secs(),
            })??;

        Ok(ProcessOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: truncate_output(&String::from_utf8_lossy(&output.stdout), self.max_output_bytes),
            stderr: truncate_output(&String::from_utf8_lossy(&output.stderr), self.max_output_bytes),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GitInput {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub branch_name: String,
}

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Argument lists for each git invocation the request expands to, in order.
pub fn git_invocations(input: &GitInput) -> Result<Vec<Vec<String>>, ToolError> {
    if input.command.is_empty() {
        return Err(ToolError::invalid("git command is required"));
    }

    let command = input.command.to_lowercase();
    let mut args = Vec::new();
    match command.as_str() {
        "status" => args.push("status".to_string()),
        "add" => {
            args.push("add".to_string());
            if input.files.is_empty() {
                args.push(".".to_string());
            } else {
                args.extend(input.files.iter().cloned());
            }
        }
        "commit" => {
            if input.message.is_empty() {
                return Err(ToolError::invalid("commit message is required for 'commit' command"));
            }
            args = strings(&["commit", "-m", &input.message]);
        }
        "push" => {
            args.push("push".to_string());
            if !input.branch_name.is_empty() {
                args.push("origin".to_string());
                args.push(input.branch_name.clone());
            }
            args.extend(input.args.iter().cloned());
        }
        "pull" => {
            args.push("pull".to_string());
            args.extend(input.args.iter().cloned());
        }
        "log" => {
            args.push("log".to_string());
            if input.args.is_empty() {
                args.extend(strings(&["--oneline", "--graph", "--decorate", "-n", "10"]));
            } else {
                args.extend(input.args.iter().cloned());
            }
        }
        "branch" => {
            args.push("branch".to_string());
            if !input.branch_name.is_empty() {
                args.push(input.branch_name.clone());
            }
            args.extend(input.args.iter().cloned());
        }
        "checkout" => {
            if input.branch_name.is_empty() && input.files.is_empty() && input.args.is_empty() {
                return Err(ToolError::invalid(
                    "either branch_name, files, or args are required for 'checkout' command",
                ));
            }
            args.push("checkout".to_string());
            if !input.branch_name.is_empty() {
                args.push(input.branch_name.clone());
            }
            args.extend(input.files.iter().cloned());
            args.extend(input.args.iter().cloned());
        }
        "stage_and_commit" => {
            if input.message.is_empty() {
                return Err(ToolError::invalid(
                    "commit message is required for 'stage_and_commit' command",
                ));
            }
            return Ok(vec![
                strings(&["add", "."]),
                strings(&["commit", "-m", &input.message]),
            ]);
        }
        _ => {
            args.push(input.command.clone());
            args.extend(input.args.iter().cloned());
        }
    }
    Ok(vec![args])
}

pub struct GitTool {
    fs: Arc<LocalFs>,
    runner: ProcessRunner,
}

impl GitTool {
    pub fn new(fs: Arc<LocalFs>, runner: ProcessRunner) -> Self {
        Self { fs, runner }
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The Git command to execute (status, add, commit, push, pull, log, branch, checkout, stage_and_commit, etc.)."
                },
                "args": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Optional additional arguments for the Git command."
                },
                "message": {
                    "type": "string",
                    "description": "Commit message when using the 'commit' command."
                },
                "files": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Specific files to operate on (for add, checkout, etc.). Use ['.'] for all files."
                },
                "branch_name": {
                    "type": "string",
                    "description": "Branch name when using branch-related commands."
                }
            },
            "required": ["command"]
        })
    }
}

#[async_trait]
impl ToolHandler for GitTool {
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let input: GitInput = serde_json::from_value(input)?;
        let invocations = git_invocations(&input)?;

        let mut last = String::new();
        for args in invocations {
            let output = self.runner.run("git", "git", &args, self.fs.root()).await?;
            let combined = output.combined();
            if !output.success {
                return Err(ToolError::execution(format!("git command failed: {}", combined)));
            }
            last = combined;
        }
        Ok(last)
    }
}

#[derive(Debug, Deserialize)]
struct RunCommandInput {
    #[serde(default)]
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    working_dir: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunCommandReport {
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    command: String,
}

/// Runs one of a fixed set of build tools; any other program is refused
/// before spawning.
pub struct RunCommand {
    fs: Arc<LocalFs>,
    runner: ProcessRunner,
    allowed: Vec<String>,
}

impl RunCommand {
    pub fn new(fs: Arc<LocalFs>, runner: ProcessRunner, allowed: Vec<String>) -> Self {
        Self { fs, runner, allowed }
    }

    pub fn input_schema(allowed: &[String]) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Program to run. Only the listed build tools are available.",
                    "enum": allowed
                },
                "args": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Arguments passed to the program."
                },
                "working_dir": {
                    "type": "string",
                    "description": "Directory to run in, relative to the working directory."
                }
            },
            "required": ["command"]
        })
    }

    fn working_dir(&self, requested: Option<&str>) -> Result<PathBuf, ToolError> {
        match requested.filter(|dir| !dir.is_empty()) {
            Some(dir) => {
                let path = self.fs.resolve(dir)?;
                if !path.is_dir() {
                    return Err(ToolError::execution(format!(
                        "working directory does not exist: {}",
                        dir
                    )));
                }
                Ok(path)
            }
            None => Ok(self.fs.root().to_path_buf()),
        }
    }
}

#[async_trait]
impl ToolHandler for RunCommand {
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let input: RunCommandInput = serde_json::from_value(input)?;
        if input.command.trim().is_empty() {
            return Err(ToolError::invalid("command cannot be empty"));
        }
        if !self.allowed.iter().any(|name| *name == input.command) {
            return Err(ToolError::invalid(format!(
                "command '{}' is not allowed. Allowed commands: {}",
                input.command,
                self.allowed.join(", ")
            )));
        }
        let cwd = self.working_dir(input.working_dir.as_deref())?;

        let output = self
            .runner
            .run("run_command", &input.command, &input.args, &cwd)
            .await?;

        let mut command = input.command.clone();
        for arg in &input.args {
            command.push(' ');
            command.push_str(arg);
        }
        let report = RunCommandReport {
            success: output.success,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            command,
        };
        serde_json::to_string_pretty(&report).map_err(|e| ToolError::execution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_command(dir: &TempDir, timeout: Duration, allowed: &[&str]) -> RunCommand {
        let fs = Arc::new(LocalFs::new(dir.path()).unwrap());
        let allowed = allowed.iter().map(|s| s.to_string()).collect();
        RunCommand::new(fs, ProcessRunner::new(timeout, 1024), allowed)
    }

    fn git(value: Value) -> Result<Vec<Vec<String>>, ToolError> {
        let input: GitInput = serde_json::from_value(value).unwrap();
        git_invocations(&input)
    }

    #[test]
    fn test_git_marshaling() {
        assert_eq!(git(json!({"command": "status"})).unwrap(), vec![vec!["status"]]);
        assert_eq!(git(json!({"command": "add"})).unwrap(), vec![vec!["add", "."]]);
        assert_eq!(
            git(json!({"command": "ADD", "files": ["a.rs", "b.rs"]})).unwrap(),
            vec![vec!["add", "a.rs", "b.rs"]]
        );
        assert_eq!(
            git(json!({"command": "log"})).unwrap(),
            vec![vec!["log", "--oneline", "--graph", "--decorate", "-n", "10"]]
        );
        assert_eq!(
            git(json!({"command": "push", "branch_name": "main", "args": ["--tags"]})).unwrap(),
            vec![vec!["push", "origin", "main", "--tags"]]
        );
        assert_eq!(
            git(json!({"command": "diff", "args": ["--stat"]})).unwrap(),
            vec![vec!["diff", "--stat"]]
        );
    }

    #[test]
    fn test_git_requirements() {
        assert!(git(json!({})).is_err());
        assert!(git(json!({"command": "commit"})).is_err());
        assert!(git(json!({"command": "checkout"})).is_err());
        assert!(git(json!({"command": "stage_and_commit"})).is_err());
        assert_eq!(
            git(json!({"command": "stage_and_commit", "message": "wip"})).unwrap(),
            vec![vec!["add", "."], vec!["commit", "-m", "wip"]]
        );
    }

    #[test]
    fn test_truncate_output_respects_char_boundary() {
        assert_eq!(truncate_output("short", 10), "short");
        let truncated = truncate_output("ééé", 3);
        assert!(truncated.starts_with("é"));
        assert!(truncated.contains("truncated 4 bytes"));
    }

    #[test]
    fn test_combined_output_marks_failure() {
        let output = ProcessOutput {
            success: false,
            exit_code: Some(2),
            stdout: "out".into(),
            stderr: "err".into(),
        };
        assert_eq!(output.combined(), "out\n--- STDERR ---\nerr\n[Exit Code: 2]");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_reports_output() {
        let dir = TempDir::new().unwrap();
        let tool = run_command(&dir, Duration::from_secs(10), &["echo"]);

        let output = tool
            .call(json!({"command": "echo", "args": ["hello", "world"]}))
            .await
            .unwrap();
        let report: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["success"], true);
        assert_eq!(report["stdout"], "hello world\n");
        assert_eq!(report["command"], "echo hello world");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_timeout() {
        let dir = TempDir::new().unwrap();
        let tool = run_command(&dir, Duration::from_millis(100), &["sleep"]);

        let err = tool
            .call(json!({"command": "sleep", "args": ["5"]}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_run_command_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let tool = run_command(
            &dir,
            Duration::from_secs(1),
            &["ls", "definitely-not-a-real-program-xyz"],
        );

        assert!(tool.call(json!({"command": ""})).await.is_err());
        assert!(
            tool.call(json!({"command": "ls", "working_dir": "../.."}))
                .await
                .is_err()
        );
        assert!(
            tool.call(json!({"command": "definitely-not-a-real-program-xyz"}))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_run_command_refuses_unlisted_program() {
        let dir = TempDir::new().unwrap();
        let tool = run_command(&dir, Duration::from_secs(1), &["cargo", "go"]);

        for program in ["cat", "sh", "/bin/cat", "./cargo"] {
            let err = tool
                .call(json!({"command": program, "args": ["/etc/hostname"]}))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidInput(_)), "{program}");
            assert!(err.to_string().contains("not allowed"));
        }
    }

    #[test]
    fn test_run_command_schema_lists_allowed() {
        let allowed = vec!["cargo".to_string(), "make".to_string()];
        let schema = RunCommand::input_schema(&allowed);
        assert_eq!(schema["properties"]["command"]["enum"], json!(["cargo", "make"]));
    }
}
