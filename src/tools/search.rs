use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::ErrorKind;

use super::{Tool, ToolResult, ensure_not_symlink, log_denial};
use crate::admission::PathAuthorizer;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchInFileArgs {
    pub file_path: String,
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Zero or negative means unlimited
    #[serde(default)]
    pub max_matches: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub line_number: usize,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchInFileResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub matches: Vec<MatchResult>,
    pub match_count: usize,
    pub truncated: bool,
}

impl SearchInFileResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

impl ToolResult for SearchInFileResult {
    fn succeeded(&self) -> bool {
        self.success
    }
}

/// Tool for searching a single file's lines with a regex
pub struct SearchInFileTool {
    paths: PathAuthorizer,
}

impl SearchInFileTool {
    pub fn new(paths: PathAuthorizer) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl Tool for SearchInFileTool {
    type Args = SearchInFileArgs;
    type Output = SearchInFileResult;

    fn name(&self) -> &str {
        "search_in_file"
    }

    fn description(&self) -> &str {
        "Search for patterns in a file using regular expressions"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to search"
                },
                "pattern": {
                    "type": "string",
                    "description": "Regular expression pattern to search for"
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Whether the search should be case-sensitive (default: false)"
                },
                "max_matches": {
                    "type": "integer",
                    "description": "Maximum number of matches to return (0 or -1 for all matches)"
                }
            },
            "required": ["file_path", "pattern"]
        })
    }

    async fn run(&self, args: SearchInFileArgs) -> SearchInFileResult {
        let path = match self.paths.resolve(&args.file_path) {
            Ok(path) => path,
            Err(reason) => {
                log_denial(self.name(), &args.file_path, &reason);
                return SearchInFileResult::failure(format!(
                    "Access to this file path is not allowed: {}",
                    reason
                ));
            }
        };

        let regex = match RegexBuilder::new(&args.pattern)
            .case_insensitive(!args.case_sensitive)
            .build()
        {
            Ok(r) => r,
            Err(e) => {
                return SearchInFileResult::failure(format!("Invalid regular expression: {}", e));
            }
        };

        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_dir() => {
                return SearchInFileResult::failure(format!(
                    "{} is a directory, not a file",
                    args.file_path
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return SearchInFileResult::failure(format!(
                    "File {} does not exist",
                    args.file_path
                ));
            }
            Err(e) => return SearchInFileResult::failure(format!("Error checking file: {}", e)),
        }

        if let Err(e) = ensure_not_symlink(&path).await {
            return SearchInFileResult::failure(format!("Error opening file: {}", e));
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return SearchInFileResult::failure(format!("Error reading file: {}", e)),
        };

        let limit = usize::try_from(args.max_matches).ok().filter(|&n| n > 0);
        search_lines(&content, &regex, limit)
    }
}

fn search_lines(content: &str, regex: &Regex, limit: Option<usize>) -> SearchInFileResult {
    let mut matches = Vec::new();
    let mut truncated = false;

    for (index, line) in content.lines().enumerate() {
        if !regex.is_match(line) {
            continue;
        }
        if limit.is_some_and(|max| matches.len() >= max) {
            truncated = true;
            break;
        }
        matches.push(MatchResult {
            line_number: index + 1,
            content: line.to_string(),
        });
    }

    SearchInFileResult {
        success: true,
        error: None,
        match_count: matches.len(),
        matches,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdmissionConfig;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn tool(root: &Path) -> SearchInFileTool {
        let config = AdmissionConfig::builder(root)
            .allowed([root.to_path_buf()])
            .home_dir(None)
            .build();
        SearchInFileTool::new(PathAuthorizer::new(Arc::new(config)))
    }

    fn args(path: &Path, pattern: &str, case_sensitive: bool, max_matches: i64) -> SearchInFileArgs {
        SearchInFileArgs {
            file_path: path.display().to_string(),
            pattern: pattern.to_string(),
            case_sensitive,
            max_matches,
        }
    }

    #[test]
    fn search_lines_numbers_from_one() {
        let regex = Regex::new("hello").unwrap();
        let result = search_lines("hello world\nfoo bar\nhello again", &regex, None);
        assert_eq!(result.match_count, 2);
        assert_eq!(result.matches[0].line_number, 1);
        assert_eq!(result.matches[1].line_number, 3);
        assert!(!result.truncated);
    }

    #[test]
    fn search_lines_truncates_only_when_more_matches_exist() {
        let regex = Regex::new("x").unwrap();
        let capped = search_lines("x\nx\nx", &regex, Some(2));
        assert_eq!(capped.match_count, 2);
        assert!(capped.truncated);

        let exact = search_lines("x\nx", &regex, Some(2));
        assert_eq!(exact.match_count, 2);
        assert!(!exact.truncated);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_by_default() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let file = root.join("log.txt");
        fs::write(&file, "ERROR one\nerror two\nok").unwrap();

        let insensitive = tool(&root).run(args(&file, "error", false, 0)).await;
        assert_eq!(insensitive.match_count, 2);

        let sensitive = tool(&root).run(args(&file, "error", true, -1)).await;
        assert_eq!(sensitive.match_count, 1);
        assert_eq!(sensitive.matches[0].content, "error two");
    }

    #[tokio::test]
    async fn invalid_regex_is_reported() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let file = root.join("a.txt");
        fs::write(&file, "a").unwrap();

        let result = tool(&root).run(args(&file, "(unclosed", false, 0)).await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Invalid regular expression"));
    }

    #[tokio::test]
    async fn search_outside_root_is_denied() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let file = other.path().join("b.txt");
        fs::write(&file, "secret").unwrap();

        let result = tool(&root).run(args(&file, "secret", false, 0)).await;
        assert!(!result.success);
        assert!(result.matches.is_empty());
    }
}
