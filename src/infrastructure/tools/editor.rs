//! # File Editor
//!
//! Text mutation engine behind the `file_editor` tool. Six edit modes are
//! supported: `create`, `replace`, `regex_replace`, `append`, `prepend` and
//! `insert_at_line`. The string transformations are plain functions; the
//! [`FileEditor`] wraps them with reads and writes through a [`FileSystem`].

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::fs::FileSystem;
use crate::domain::errors::ToolError;
use crate::domain::traits::ToolHandler;
use crate::strings::messages;

/// Raw `file_editor` input. Fields a mode does not use are ignored, and an
/// explicit `null` reads the same as an absent field.
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub path: String,
    pub mode: String,
    pub old_str: Option<String>,
    pub new_str: Option<String>,
    pub pattern: Option<String>,
    pub content: Option<String>,
    pub line_number: Option<i64>,
    /// Zero or negative replaces every occurrence.
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode {
    Create { content: String },
    Replace { old_str: String, new_str: String, limit: usize },
    RegexReplace { pattern: String, new_str: String, limit: usize },
    Append { content: String },
    Prepend { content: String },
    InsertAtLine { line_number: i64, content: String },
}

impl EditRequest {
    pub fn into_mode(self) -> Result<EditMode, ToolError> {
        let limit = self.limit.filter(|n| *n > 0).unwrap_or(0) as usize;
        let content = self.content.unwrap_or_default();
        let new_str = self.new_str.unwrap_or_default();

        let mode = match self.mode.as_str() {
            "create" => EditMode::Create { content },
            "replace" => EditMode::Replace {
                old_str: self.old_str.unwrap_or_default(),
                new_str,
                limit,
            },
            "regex_replace" => EditMode::RegexReplace {
                pattern: self.pattern.unwrap_or_default(),
                new_str,
                limit,
            },
            "append" => EditMode::Append { content },
            "prepend" => EditMode::Prepend { content },
            "insert_at_line" => EditMode::InsertAtLine {
                line_number: self.line_number.unwrap_or_default(),
                content,
            },
            other => {
                return Err(ToolError::invalid(format!(
                    "invalid mode: {}. Must be one of: replace, regex_replace, create, append, prepend, insert_at_line",
                    other
                )));
            }
        };
        Ok(mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub message: String,
    pub replacements: usize,
}

impl EditOutcome {
    fn notice(message: String) -> Self {
        Self {
            message,
            replacements: 0,
        }
    }
}

/// Replace the first `limit` non-overlapping occurrences of `old` (all when
/// `limit` is 0). Returns the new text and how many were replaced.
pub fn replace_literal(text: &str, old: &str, new: &str, limit: usize) -> (String, usize) {
    let found = text.matches(old).count();
    let count = if limit == 0 { found } else { found.min(limit) };
    (text.replacen(old, new, count), count)
}

/// Regex flavour of [`replace_literal`]. `$1`-style group references in
/// `replacement` are expanded.
pub fn replace_regex(text: &str, re: &Regex, replacement: &str, limit: usize) -> (String, usize) {
    let take = if limit == 0 { usize::MAX } else { limit };
    let count = re.find_iter(text).take(take).count();
    let replaced = re.replacen(text, limit, replacement).into_owned();
    (replaced, count)
}

/// Insert `content` as line `line_number` (1-based) of `text`.
pub fn insert_line(text: &str, line_number: i64, content: &str) -> Result<String, ToolError> {
    if line_number < 1 {
        return Err(ToolError::invalid("line number must be at least 1"));
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    let index = (line_number - 1) as usize;
    if index > lines.len() {
        return Err(ToolError::invalid(format!(
            "line number {} exceeds file length ({} lines)",
            line_number,
            lines.len()
        )));
    }
    lines.insert(index, content);
    Ok(lines.join("\n"))
}

pub struct FileEditor {
    fs: Arc<dyn FileSystem>,
}

impl FileEditor {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub async fn apply(&self, path: &str, mode: EditMode) -> Result<EditOutcome, ToolError> {
        if path.is_empty() {
            return Err(ToolError::invalid("path is required"));
        }

        match mode {
            EditMode::Create { content } => self.create(path, &content).await,
            EditMode::Replace {
                old_str,
                new_str,
                limit,
            } => self.replace(path, &old_str, &new_str, limit).await,
            EditMode::RegexReplace {
                pattern,
                new_str,
                limit,
            } => self.regex_replace(path, &pattern, &new_str, limit).await,
            EditMode::Append { content } => {
                self.fs.append(path, &content).await?;
                Ok(EditOutcome::notice(messages::appended(path)))
            }
            EditMode::Prepend { content } => {
                let existing = self.fs.read_or_empty(path).await?;
                self.fs.write(path, &format!("{}{}", content, existing)).await?;
                Ok(EditOutcome::notice(messages::prepended(path)))
            }
            EditMode::InsertAtLine {
                line_number,
                content,
            } => {
                let existing = self.fs.read_or_empty(path).await?;
                let updated = insert_line(&existing, line_number, &content)?;
                self.fs.write(path, &updated).await?;
                Ok(EditOutcome::notice(messages::inserted(line_number as usize, path)))
            }
        }
    }

    async fn create(&self, path: &str, content: &str) -> Result<EditOutcome, ToolError> {
        if content.is_empty() {
            return Err(ToolError::invalid("content is required for create mode"));
        }
        // Never overwrite: tell the caller which modes to use instead.
        if self.fs.exists(path).await? {
            return Ok(EditOutcome::notice(messages::file_exists(path)));
        }
        self.fs.write(path, content).await?;
        Ok(EditOutcome::notice(messages::file_created(path)))
    }

    async fn replace(
        &self,
        path: &str,
        old_str: &str,
        new_str: &str,
        limit: usize,
    ) -> Result<EditOutcome, ToolError> {
        if old_str.is_empty() {
            return Err(ToolError::invalid("old_str cannot be empty for replace mode"));
        }
        if old_str == new_str {
            return Ok(EditOutcome::notice(messages::NO_CHANGES_IDENTICAL.to_string()));
        }

        self.fs.ensure_file(path).await?;
        let content = self.fs.read_to_string(path).await?;
        let (updated, count) = replace_literal(&content, old_str, new_str, limit);
        if count == 0 {
            return Err(ToolError::execution("old_str not found in file"));
        }
        self.fs.write(path, &updated).await?;

        Ok(EditOutcome {
            message: messages::replaced(count, path),
            replacements: count,
        })
    }

    async fn regex_replace(
        &self,
        path: &str,
        pattern: &str,
        new_str: &str,
        limit: usize,
    ) -> Result<EditOutcome, ToolError> {
        if pattern.is_empty() {
            return Err(ToolError::invalid("pattern cannot be empty for regex_replace mode"));
        }

        self.fs.ensure_file(path).await?;
        let re = Regex::new(pattern)
            .map_err(|e| ToolError::invalid(format!("invalid regex pattern: {}", e)))?;
        let content = self.fs.read_to_string(path).await?;
        let (updated, count) = replace_regex(&content, &re, new_str, limit);
        if count == 0 {
            return Err(ToolError::execution("pattern not found in file"));
        }
        self.fs.write(path, &updated).await?;

        Ok(EditOutcome {
            message: messages::replaced(count, path),
            replacements: count,
        })
    }
}

#[async_trait]
impl ToolHandler for FileEditor {
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let request: EditRequest = serde_json::from_value(input)?;
        let path = request.path.clone();
        let mode = request.into_mode()?;
        let outcome = self.apply(&path, mode).await?;
        Ok(outcome.message)
    }
}

pub fn input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "The path to the file"
            },
            "mode": {
                "type": "string",
                "description": "Edit mode: 'replace', 'regex_replace', 'create', 'append', 'prepend', or 'insert_at_line'",
                "enum": ["replace", "regex_replace", "create", "append", "prepend", "insert_at_line"]
            },
            "old_str": {
                "type": "string",
                "description": "Text to search for (replace mode)"
            },
            "new_str": {
                "type": "string",
                "description": "Replacement text (replace and regex_replace modes)"
            },
            "pattern": {
                "type": "string",
                "description": "Regular expression to match (regex_replace mode)"
            },
            "content": {
                "type": "string",
                "description": "Content for create, append, prepend and insert_at_line modes"
            },
            "line_number": {
                "type": "integer",
                "description": "1-based line number (insert_at_line mode)"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of replacements, 0 for all"
            }
        },
        "required": ["path", "mode"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::tools::fs::LocalFs;
    use tempfile::TempDir;

    fn editor() -> (TempDir, Arc<LocalFs>, FileEditor) {
        let dir = TempDir::new().unwrap();
        let fs = Arc::new(LocalFs::new(dir.path()).unwrap());
        let editor = FileEditor::new(fs.clone());
        (dir, fs, editor)
    }

    #[test]
    fn test_replace_literal_limit() {
        assert_eq!(replace_literal("a a a", "a", "b", 2), ("b b a".to_string(), 2));
        assert_eq!(replace_literal("a a a", "a", "b", 0), ("b b b".to_string(), 3));
        assert_eq!(replace_literal("aaaa", "aa", "x", 0), ("xx".to_string(), 2));
        assert_eq!(replace_literal("abc", "z", "y", 0), ("abc".to_string(), 0));
    }

    #[test]
    fn test_limit_zero_matches_exact_count() {
        let text = "x1 x2 x3 x4";
        let k = text.matches('x').count();
        assert_eq!(replace_literal(text, "x", "y", 0), replace_literal(text, "x", "y", k));
        assert_eq!(
            replace_literal(text, "x", "y", k + 5),
            replace_literal(text, "x", "y", 0)
        );
    }

    #[test]
    fn test_replace_regex_limit_and_groups() {
        let re = Regex::new(r"foo\d+").unwrap();
        assert_eq!(
            replace_regex("foo1 foo2 foo3", &re, "bar", 2),
            ("bar bar foo3".to_string(), 2)
        );

        let re = Regex::new(r"(\w+)@(\w+)").unwrap();
        assert_eq!(
            replace_regex("alice@home bob@work", &re, "$2:$1", 0),
            ("home:alice work:bob".to_string(), 2)
        );
    }

    #[test]
    fn test_insert_line_bounds() {
        assert_eq!(insert_line("a\nb", 1, "x").unwrap(), "x\na\nb");
        assert_eq!(insert_line("a\nb", 2, "x").unwrap(), "a\nx\nb");
        assert_eq!(insert_line("a\nb", 3, "x").unwrap(), "a\nb\nx");
        assert!(insert_line("a\nb", 4, "x").is_err());
        assert!(insert_line("a\nb", 0, "x").is_err());
        assert!(insert_line("a\nb", -3, "x").is_err());
        assert_eq!(insert_line("", 1, "x").unwrap(), "x\n");
    }

    #[test]
    fn test_insert_shifts_following_line() {
        let original = "one\ntwo\nthree";
        let updated = insert_line(original, 2, "inserted").unwrap();
        let lines: Vec<&str> = updated.split('\n').collect();
        assert_eq!(lines[1], "inserted");
        assert_eq!(lines[2], "two");
    }

    #[tokio::test]
    async fn test_create_never_overwrites() {
        let (_dir, fs, editor) = editor();
        let first = editor
            .apply("notes/a.txt", EditMode::Create { content: "hello".into() })
            .await
            .unwrap();
        assert!(first.message.contains("created"));

        let second = editor
            .apply("notes/a.txt", EditMode::Create { content: "other".into() })
            .await
            .unwrap();
        assert!(second.message.contains("already exists"));
        assert_eq!(fs.read_to_string("notes/a.txt").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_create_requires_content() {
        let (_dir, _fs, editor) = editor();
        let err = editor
            .apply("a.txt", EditMode::Create { content: String::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_replace_reports_count() {
        let (_dir, fs, editor) = editor();
        fs.write("f.txt", "foo foo foo").await.unwrap();

        let outcome = editor
            .apply(
                "f.txt",
                EditMode::Replace {
                    old_str: "foo".into(),
                    new_str: "bar".into(),
                    limit: 2,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.replacements, 2);
        assert_eq!(fs.read_to_string("f.txt").await.unwrap(), "bar bar foo");
    }

    #[tokio::test]
    async fn test_replace_identical_is_noop() {
        let (_dir, fs, editor) = editor();
        let outcome = editor
            .apply(
                "untouched.txt",
                EditMode::Replace {
                    old_str: "same".into(),
                    new_str: "same".into(),
                    limit: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.message, messages::NO_CHANGES_IDENTICAL);
        assert!(!fs.exists("untouched.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_missing_text_fails_and_creates_file() {
        let (_dir, fs, editor) = editor();
        let err = editor
            .apply(
                "new.txt",
                EditMode::Replace {
                    old_str: "needle".into(),
                    new_str: "pin".into(),
                    limit: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(fs.read_to_string("new.txt").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_regex_replace_errors() {
        let (_dir, fs, editor) = editor();
        fs.write("r.txt", "abc").await.unwrap();

        let invalid = editor
            .apply(
                "r.txt",
                EditMode::RegexReplace {
                    pattern: "(".into(),
                    new_str: "x".into(),
                    limit: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(invalid.to_string().contains("invalid regex"));

        let unmatched = editor
            .apply(
                "r.txt",
                EditMode::RegexReplace {
                    pattern: r"\d".into(),
                    new_str: "x".into(),
                    limit: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(unmatched.to_string().contains("not found"));
        assert_eq!(fs.read_to_string("r.txt").await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_append_and_prepend_create_file() {
        let (_dir, fs, editor) = editor();
        editor
            .apply("log.txt", EditMode::Append { content: "middle".into() })
            .await
            .unwrap();
        editor
            .apply("log.txt", EditMode::Prepend { content: "start ".into() })
            .await
            .unwrap();
        editor
            .apply("log.txt", EditMode::Append { content: " end".into() })
            .await
            .unwrap();
        assert_eq!(fs.read_to_string("log.txt").await.unwrap(), "start middle end");
    }

    #[tokio::test]
    async fn test_insert_out_of_range_leaves_file() {
        let (_dir, fs, editor) = editor();
        fs.write("lines.txt", "a\nb").await.unwrap();
        let err = editor
            .apply(
                "lines.txt",
                EditMode::InsertAtLine {
                    line_number: 10,
                    content: "x".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
        assert_eq!(fs.read_to_string("lines.txt").await.unwrap(), "a\nb");
    }

    #[tokio::test]
    async fn test_handler_rejects_bad_mode_and_missing_path() {
        let (_dir, _fs, editor) = editor();
        let err = editor
            .call(json!({"path": "a.txt", "mode": "truncate"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid mode"));

        let err = editor.call(json!({"mode": "append"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));

        let err = editor
            .call(json!({"path": "", "mode": "append", "content": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("path is required"));
    }

    #[tokio::test]
    async fn test_handler_accepts_nulls_and_negative_limit() {
        let (_dir, fs, editor) = editor();
        editor
            .call(json!({
                "path": "a.txt",
                "mode": "append",
                "content": "x x x",
                "old_str": null,
                "pattern": null,
                "limit": null,
                "line_number": null
            }))
            .await
            .unwrap();
        assert_eq!(fs.read_to_string("a.txt").await.unwrap(), "x x x");

        let message = editor
            .call(json!({
                "path": "a.txt",
                "mode": "replace",
                "old_str": "x",
                "new_str": "y",
                "limit": -1
            }))
            .await
            .unwrap();
        assert!(message.contains('3'));
        assert_eq!(fs.read_to_string("a.txt").await.unwrap(), "y y y");
    }

    #[tokio::test]
    async fn test_handler_edit_roundtrip() {
        let (_dir, fs, editor) = editor();
        let message = editor
            .call(json!({"path": "src/main.txt", "mode": "create", "content": "fn main() {}\n"}))
            .await
            .unwrap();
        assert!(message.contains("src/main.txt"));

        editor
            .call(json!({
                "path": "src/main.txt",
                "mode": "regex_replace",
                "pattern": r"main\(\)",
                "new_str": "start()"
            }))
            .await
            .unwrap();
        assert_eq!(fs.read_to_string("src/main.txt").await.unwrap(), "fn start() {}\n");
    }
}
