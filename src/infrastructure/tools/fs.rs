//! # Filesystem Access
//!
//! The [`FileSystem`] seam the file tools are written against, and the local
//! implementation rooted at the session's working directory. Every path is
//! validated against that root before it is touched.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::domain::errors::ToolError;

#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, ToolError>;

    async fn read_to_string(&self, path: &str) -> Result<String, ToolError>;

    /// Replace the full file body, creating parent directories as needed.
    async fn write(&self, path: &str, content: &str) -> Result<(), ToolError>;

    /// Append to the file, creating it (and its parents) when absent.
    async fn append(&self, path: &str, content: &str) -> Result<(), ToolError>;

    /// Create an empty file when nothing exists at `path`.
    async fn ensure_file(&self, path: &str) -> Result<(), ToolError> {
        if !self.exists(path).await? {
            self.write(path, "").await?;
        }
        Ok(())
    }

    /// Current content, or empty when the file does not exist yet.
    async fn read_or_empty(&self, path: &str) -> Result<String, ToolError> {
        if self.exists(path).await? {
            self.read_to_string(path).await
        } else {
            Ok(String::new())
        }
    }
}

/// Local disk, sandboxed to one root directory.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into().canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates that a path is safe to access (contained within the root).
    /// Returns the absolute path if safe. The path does not need to exist.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        if path.trim().is_empty() {
            return Err(ToolError::invalid("path cannot be empty"));
        }

        let joined = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.root.join(path)
        };
        let normalized = normalize(&joined);

        // Resolve symlinks on the deepest existing ancestor, then re-append the
        // parts that do not exist yet.
        let mut current = normalized.clone();
        let mut missing = Vec::new();
        let resolved = loop {
            if current.exists() {
                let mut resolved = current.canonicalize()?;
                for part in missing.iter().rev() {
                    resolved.push(part);
                }
                break resolved;
            }
            match (current.parent(), current.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_owned());
                    current = parent.to_path_buf();
                }
                _ => {
                    return Err(ToolError::execution(format!(
                        "Unable to validate path: {}",
                        path
                    )));
                }
            }
        };

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(ToolError::execution(format!(
                "Access denied: path '{}' is outside the working directory",
                path
            )))
        }
    }
}

/// Lexically fold `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

async fn create_parent(path: &Path) -> Result<(), ToolError> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ToolError::execution(format!("failed to create directory: {}", e)))?;
    }
    Ok(())
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn exists(&self, path: &str) -> Result<bool, ToolError> {
        Ok(self.resolve(path)?.exists())
    }

    async fn read_to_string(&self, path: &str) -> Result<String, ToolError> {
        let safe_path = self.resolve(path)?;
        tokio::fs::read_to_string(&safe_path)
            .await
            .map_err(|e| ToolError::execution(format!("failed to read file '{}': {}", path, e)))
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), ToolError> {
        let safe_path = self.resolve(path)?;
        create_parent(&safe_path).await?;
        tokio::fs::write(&safe_path, content)
            .await
            .map_err(|e| ToolError::execution(format!("failed to write file: {}", e)))
    }

    async fn append(&self, path: &str, content: &str) -> Result<(), ToolError> {
        let safe_path = self.resolve(path)?;
        create_parent(&safe_path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&safe_path)
            .await
            .map_err(|e| ToolError::execution(format!("failed to open file for appending: {}", e)))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| ToolError::execution(format!("failed to append to file: {}", e)))?;
        file.flush().await?;
        Ok(())
    }
}
