//! # Tool Descriptions
//!
//! Descriptions sent to the completion engine with every tool declaration.

pub const READ_FILE: &str = "Read the contents of a given relative file path. Use this when you want to see what's inside a file. Do not use this with directory names.";

pub const LIST_FILES: &str = "List files and directories at a given path. If no path is provided, lists files in the current directory.";

pub const FILE_EDITOR: &str = "Make sophisticated edits to a text file.
Multiple edit modes available:
1. 'replace': Replace 'old_str' with 'new_str' in the file (requires exact match)
2. 'regex_replace': Replace text matching the regex in 'pattern' with 'new_str'
3. 'create': Create a new file with 'content' (creates parent directories if needed)
4. 'append': Append 'content' to the end of the file
5. 'prepend': Prepend 'content' to the beginning of the file
6. 'insert_at_line': Insert 'content' at line number specified by 'line_number'

Use 'limit' to cap the number of replacements (0 replaces every occurrence).
If the file doesn't exist and mode is not 'create', it will be created first.";

pub const FILE_OPERATIONS: &str =
    "Perform file operations such as copying, moving, and renaming files and directories.";

pub const TIME_PROVIDER: &str = "Get the current system time. Returns the current time in RFC 3339 format unless a strftime-style 'format' is given.";

pub const GIT: &str = "Execute common Git operations such as checking status, staging files, committing changes, pulling, pushing, viewing logs, creating branches, and more.";

pub const RUN_COMMAND: &str = "Run a build or project command (for example 'cargo build', 'go test', 'npm test') and capture its exit status, stdout and stderr. The program is executed directly, not through a shell.";

pub const ACTION_LIMITER: &str = "Control and limit agent actions to prevent infinite loops and excessive operations.
This tool tracks agent actions and can enforce limits on:
- Total number of actions per session
- Number of similar actions (e.g., editing the same file)
- Rate of actions (e.g., not too many in the first seconds)
- Duration of the session

It helps prevent the agent from getting stuck in loops or making too many rapid changes.";
