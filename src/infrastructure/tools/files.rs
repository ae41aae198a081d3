//! Read-only and whole-file tools: `read_file`, `list_files` and
//! `file_operations` (copy, move, rename).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use super::fs::{FileSystem, LocalFs};
use crate::domain::errors::ToolError;
use crate::domain::traits::ToolHandler;
use crate::strings::messages;

#[derive(Debug, Deserialize)]
struct ReadFileInput {
    #[serde(default)]
    path: String,
}

pub struct ReadFile {
    fs: Arc<LocalFs>,
}

impl ReadFile {
    pub fn new(fs: Arc<LocalFs>) -> Self {
        Self { fs }
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The relative path of a file in the working directory."
                }
            },
            "required": ["path"]
        })
    }
}

#[async_trait]
impl ToolHandler for ReadFile {
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let input: ReadFileInput = serde_json::from_value(input)?;
        if input.path.is_empty() {
            return Err(ToolError::invalid("path parameter is required"));
        }
        self.fs.read_to_string(&input.path).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListFilesInput {
    #[serde(default)]
    path: Option<String>,
}

pub struct ListFiles {
    fs: Arc<LocalFs>,
}

impl ListFiles {
    pub fn new(fs: Arc<LocalFs>) -> Self {
        Self { fs }
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Optional relative path to list files from. Defaults to current directory if not provided."
                }
            }
        })
    }
}

/// Every entry below `dir`, relative to it, directories suffixed with `/`.
fn walk_entries(dir: &Path) -> Result<Vec<String>, ToolError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| ToolError::execution(format!("failed to list files: {}", e)))?;
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if entry.file_type().is_dir() {
            entries.push(format!("{}/", relative));
        } else {
            entries.push(relative);
        }
    }
    Ok(entries)
}

#[async_trait]
impl ToolHandler for ListFiles {
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let input: ListFilesInput = if input.is_null() {
            ListFilesInput::default()
        } else {
            serde_json::from_value(input)?
        };
        let path = input.path.filter(|p| !p.is_empty()).unwrap_or_else(|| ".".to_string());
        let dir = self.fs.resolve(&path)?;

        let entries = tokio::task::spawn_blocking(move || walk_entries(&dir))
            .await
            .map_err(|e| ToolError::execution(format!("listing task failed: {}", e)))??;

        serde_json::to_string(&entries).map_err(|e| ToolError::execution(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct FileOperationInput {
    operation: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    destination: String,
    #[serde(default)]
    recursive: bool,
    #[serde(default)]
    create_dirs: bool,
}

pub struct FileOperations {
    fs: Arc<LocalFs>,
}

impl FileOperations {
    pub fn new(fs: Arc<LocalFs>) -> Self {
        Self { fs }
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "description": "The operation to perform: 'copy', 'move', or 'rename'.",
                    "enum": ["copy", "move", "rename"]
                },
                "source": {
                    "type": "string",
                    "description": "Source file or directory path."
                },
                "destination": {
                    "type": "string",
                    "description": "Destination file or directory path."
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Whether to recursively copy directories (only applicable for 'copy' operation)."
                },
                "create_dirs": {
                    "type": "boolean",
                    "description": "Whether to create parent directories if they don't exist."
                }
            },
            "required": ["operation", "source", "destination"]
        })
    }
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), ToolError> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| ToolError::execution(format!("error reading source directory: {}", e)))?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

async fn copy_path(src: PathBuf, dst: PathBuf, recursive: bool) -> Result<(), ToolError> {
    let metadata = tokio::fs::metadata(&src)
        .await
        .map_err(|e| ToolError::execution(format!("error getting source info: {}", e)))?;

    if metadata.is_dir() {
        if !recursive {
            return Err(ToolError::execution(
                "source is a directory but recursive flag is not set",
            ));
        }
        return tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
            .await
            .map_err(|e| ToolError::execution(format!("copy task failed: {}", e)))?;
    }

    tokio::fs::copy(&src, &dst).await?;
    Ok(())
}

#[async_trait]
impl ToolHandler for FileOperations {
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let input: FileOperationInput = serde_json::from_value(input)?;
        if input.source.is_empty() {
            return Err(ToolError::invalid("source path is required"));
        }
        if input.destination.is_empty() {
            return Err(ToolError::invalid("destination path is required"));
        }
        if !matches!(input.operation.as_str(), "copy" | "move" | "rename") {
            return Err(ToolError::invalid(format!(
                "invalid operation: {}. Must be 'copy', 'move', or 'rename'",
                input.operation
            )));
        }

        let src = self.fs.resolve(&input.source)?;
        let dst = self.fs.resolve(&input.destination)?;

        if input.create_dirs
            && let Some(parent) = dst.parent()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::execution(format!("failed to create parent directories: {}", e))
            })?;
        }

        let result = match input.operation.as_str() {
            "copy" => copy_path(src, dst, input.recursive).await,
            _ => tokio::fs::rename(&src, &dst).await.map_err(ToolError::from),
        };
        result.map_err(|e| ToolError::execution(format!("file operation failed: {}", e)))?;

        Ok(messages::file_operation_done(
            &input.operation,
            &input.source,
            &input.destination,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, Arc<LocalFs>) {
        let dir = TempDir::new().unwrap();
        let fs = Arc::new(LocalFs::new(dir.path()).unwrap());
        (dir, fs)
    }

    #[tokio::test]
    async fn test_read_file() {
        let (_dir, fs) = sandbox();
        fs.write("hello.txt", "hi there").await.unwrap();

        let tool = ReadFile::new(fs);
        assert_eq!(tool.call(json!({"path": "hello.txt"})).await.unwrap(), "hi there");
        assert!(tool.call(json!({"path": "missing.txt"})).await.is_err());
        assert!(tool.call(json!({"path": ""})).await.is_err());
        assert!(tool.call(json!({"path": "../escape.txt"})).await.is_err());
    }

    #[tokio::test]
    async fn test_list_files_marks_directories() {
        let (_dir, fs) = sandbox();
        fs.write("b.txt", "b").await.unwrap();
        fs.write("src/a.rs", "a").await.unwrap();

        let tool = ListFiles::new(fs);
        let output = tool.call(json!({})).await.unwrap();
        let entries: Vec<String> = serde_json::from_str(&output).unwrap();
        assert_eq!(entries, vec!["b.txt", "src/", "src/a.rs"]);

        let output = tool.call(json!({"path": "src"})).await.unwrap();
        let entries: Vec<String> = serde_json::from_str(&output).unwrap();
        assert_eq!(entries, vec!["a.rs"]);
    }

    #[tokio::test]
    async fn test_copy_requires_recursive_for_directories() {
        let (_dir, fs) = sandbox();
        fs.write("tree/inner/leaf.txt", "leaf").await.unwrap();

        let tool = FileOperations::new(fs.clone());
        let err = tool
            .call(json!({"operation": "copy", "source": "tree", "destination": "copy"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("recursive"));

        tool.call(json!({
            "operation": "copy",
            "source": "tree",
            "destination": "copy",
            "recursive": true
        }))
        .await
        .unwrap();
        assert_eq!(fs.read_to_string("copy/inner/leaf.txt").await.unwrap(), "leaf");
    }

    #[tokio::test]
    async fn test_move_with_create_dirs() {
        let (_dir, fs) = sandbox();
        fs.write("a.txt", "payload").await.unwrap();

        let tool = FileOperations::new(fs.clone());
        let message = tool
            .call(json!({
                "operation": "move",
                "source": "a.txt",
                "destination": "deep/nested/b.txt",
                "create_dirs": true
            }))
            .await
            .unwrap();
        assert!(message.contains("move"));
        assert!(!fs.exists("a.txt").await.unwrap());
        assert_eq!(fs.read_to_string("deep/nested/b.txt").await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn test_invalid_operation() {
        let (_dir, fs) = sandbox();
        let tool = FileOperations::new(fs);
        let err = tool
            .call(json!({"operation": "delete", "source": "a", "destination": "b"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
