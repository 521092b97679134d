use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::ErrorKind;
use tokio::io::AsyncWriteExt;

use super::{Tool, ToolResult, ensure_not_symlink, log_denial};
use crate::admission::PathAuthorizer;

#[derive(Debug, Clone, Deserialize)]
pub struct ShowFileArgs {
    pub file_path: String,
    #[serde(default)]
    pub start_line: Option<i64>,
    #[serde(default)]
    pub num_lines: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowFileResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub content: String,
    pub lines_shown: usize,
    pub total_lines: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl ShowFileResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

impl ToolResult for ShowFileResult {
    fn succeeded(&self) -> bool {
        self.success
    }
}

/// Tool for displaying a file, optionally a range of its lines
pub struct ShowFileTool {
    paths: PathAuthorizer,
}

impl ShowFileTool {
    pub fn new(paths: PathAuthorizer) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl Tool for ShowFileTool {
    type Args = ShowFileArgs;
    type Output = ShowFileResult;

    fn name(&self) -> &str {
        "show_file"
    }

    fn description(&self) -> &str {
        "Show contents of a file with options to display specific line ranges"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to display"
                },
                "start_line": {
                    "type": "integer",
                    "description": "Line number to start from (1-based indexing)"
                },
                "num_lines": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Number of lines to display (defaults to all lines)"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn run(&self, args: ShowFileArgs) -> ShowFileResult {
        let path = match self.paths.resolve(&args.file_path) {
            Ok(path) => path,
            Err(reason) => {
                log_denial(self.name(), &args.file_path, &reason);
                return ShowFileResult::failure(format!(
                    "Access to this file path is not allowed: {}",
                    reason
                ));
            }
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return ShowFileResult::failure(format!("File {} does not exist", args.file_path));
            }
            Err(e) => return ShowFileResult::failure(format!("Error checking file: {}", e)),
        };

        if metadata.is_dir() {
            return ShowFileResult::failure(format!(
                "{} is a directory, not a file",
                args.file_path
            ));
        }

        if let Err(e) = ensure_not_symlink(&path).await {
            return ShowFileResult::failure(format!("Error reading file: {}", e));
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => select_lines(&content, args.start_line, args.num_lines),
            Err(e) => ShowFileResult::failure(format!("Error reading file: {}", e)),
        }
    }
}

/// Cut `num_lines` lines out of `content`, starting at 1-based `start_line`.
fn select_lines(content: &str, start_line: Option<i64>, num_lines: Option<usize>) -> ShowFileResult {
    let lines: Vec<&str> = content.split('\n').collect();
    let total_lines = lines.len();
    let start_line = usize::try_from(start_line.unwrap_or(1).max(1)).unwrap_or(usize::MAX);

    if start_line > total_lines {
        return ShowFileResult {
            total_lines,
            ..ShowFileResult::failure(format!(
                "Start line {} is beyond the file length ({} lines)",
                start_line, total_lines
            ))
        };
    }

    let start_index = start_line - 1;
    let end_index = match num_lines {
        Some(n) => start_index.saturating_add(n).min(total_lines),
        None => total_lines,
    };
    let selected = &lines[start_index..end_index];

    ShowFileResult {
        success: true,
        error: None,
        content: selected.join("\n"),
        lines_shown: selected.len(),
        total_lines,
        start_line,
        end_line: start_index + selected.len(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileArgs {
    pub file_path: String,
    pub content: String,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteFileResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub bytes_written: usize,
}

impl WriteFileResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

impl ToolResult for WriteFileResult {
    fn succeeded(&self) -> bool {
        self.success
    }
}

/// Tool for writing files, creating parent directories if needed
pub struct WriteFileTool {
    paths: PathAuthorizer,
}

impl WriteFileTool {
    pub fn new(paths: PathAuthorizer) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    type Args = WriteFileArgs;
    type Output = WriteFileResult;

    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file with options to append or overwrite existing content"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Text content to write to the file"
                },
                "mode": {
                    "type": "string",
                    "enum": ["w", "a"],
                    "description": "Write mode to use: 'w' (overwrite) or 'a' (append)"
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn run(&self, args: WriteFileArgs) -> WriteFileResult {
        let append = match args.mode.as_deref() {
            None | Some("w") => false,
            Some("a") => true,
            Some(other) => {
                return WriteFileResult::failure(format!(
                    "Invalid mode '{}': expected 'w' or 'a'",
                    other
                ));
            }
        };

        let path = match self.paths.resolve(&args.file_path) {
            Ok(path) => path,
            Err(reason) => {
                log_denial(self.name(), &args.file_path, &reason);
                return WriteFileResult::failure(format!(
                    "Access to this file path is not allowed: {}",
                    reason
                ));
            }
        };

        // Directories are created from the canonical path, never the raw input
        if let Some(parent) = path.parent() {
            if let Err(reason) = self.paths.resolve(parent) {
                log_denial(self.name(), &parent.display().to_string(), &reason);
                return WriteFileResult::failure(format!(
                    "Access to the parent directory is not allowed: {}",
                    reason
                ));
            }
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return WriteFileResult::failure(format!("Error creating directories: {}", e));
            }
        }

        if let Err(e) = ensure_not_symlink(&path).await {
            return WriteFileResult::failure(format!("Error opening file: {}", e));
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }

        let mut file = match options.open(&path).await {
            Ok(f) => f,
            Err(e) => return WriteFileResult::failure(format!("Error opening file: {}", e)),
        };

        let written = async {
            file.write_all(args.content.as_bytes()).await?;
            file.flush().await
        };
        if let Err(e) = written.await {
            return WriteFileResult::failure(format!("Error writing to file: {}", e));
        }

        WriteFileResult {
            success: true,
            error: None,
            bytes_written: args.content.len(),
        }
    }
}
