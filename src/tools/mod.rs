mod file;
mod registry;
mod search;
mod shell;

pub use file::{
    ShowFileArgs, ShowFileResult, ShowFileTool, WriteFileArgs, WriteFileResult, WriteFileTool,
};
pub use registry::ToolRegistry;
pub use search::{MatchResult, SearchInFileArgs, SearchInFileResult, SearchInFileTool};
pub use shell::{ExecuteShellArgs, ExecuteShellResult, ExecuteShellTool};

use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::warn;

use crate::admission::DenyReason;
use crate::error::ServerError;

/// A typed tool exposed to the client.
///
/// Arguments arrive as JSON and are deserialized into `Args` before `run` is
/// called, so each tool works with a concrete struct. Everything that can go
/// wrong after that, including authorization denials, is reported through
/// `Output` rather than as an error.
#[async_trait]
pub trait Tool: Send + Sync {
    type Args: DeserializeOwned + Send;
    type Output: ToolResult + Send;

    /// The unique name of this tool
    fn name(&self) -> &str;

    /// A description of what this tool does
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters
    fn schema(&self) -> Value;

    async fn run(&self, args: Self::Args) -> Self::Output;
}

/// Result payloads report whether the call succeeded.
pub trait ToolResult: Serialize {
    fn succeeded(&self) -> bool;
}

/// A finished tool call, ready to hand back to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub body: Value,
}

impl ToolOutput {
    pub fn from_result<R: ToolResult>(result: &R) -> Self {
        let success = result.succeeded();
        let body = serde_json::to_value(result).unwrap_or_else(|e| {
            json!({ "success": false, "error": format!("failed to serialize result: {}", e) })
        });
        Self { success, body }
    }

    /// Compact JSON text, as placed in the protocol response.
    pub fn to_text(&self) -> String {
        self.body.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// Type-erased view of a [`Tool`], stored in the registry.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn invoke(&self, params: Value) -> Result<ToolOutput, ServerError>;
}

#[async_trait]
impl<T: Tool> ToolHandler for T {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            schema: self.schema(),
        }
    }

    async fn invoke(&self, params: Value) -> Result<ToolOutput, ServerError> {
        let args: T::Args =
            serde_json::from_value(params).map_err(|e| ServerError::InvalidArguments {
                tool_name: self.name().to_string(),
                message: e.to_string(),
            })?;
        let output = self.run(args).await;
        Ok(ToolOutput::from_result(&output))
    }
}

fn log_denial(tool: &str, subject: &str, reason: &DenyReason) {
    warn!(tool, subject, reason = %reason, "request denied");
}

/// Refuse to operate on a path whose final component became a symlink after
/// it was authorized. Missing paths are fine; the caller is about to create them.
async fn ensure_not_symlink(path: &Path) -> io::Result<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_symlink() => Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "path was replaced by a symlink after authorization",
        )),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Find the largest byte index <= `index` that is a valid char boundary.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Probe {
        success: bool,
        note: &'static str,
    }

    impl ToolResult for Probe {
        fn succeeded(&self) -> bool {
            self.success
        }
    }

    #[test]
    fn output_carries_success_flag_and_json() {
        let output = ToolOutput::from_result(&Probe {
            success: false,
            note: "x",
        });
        assert!(!output.success);
        assert_eq!(output.body["note"], "x");
        let reparsed: Value = serde_json::from_str(&output.to_text()).unwrap();
        assert_eq!(reparsed, output.body);
    }

    #[test]
    fn floor_char_boundary_backs_off_multibyte() {
        let s = "aé";
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 10), s.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ensure_not_symlink_rejects_links() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::write(&target, "x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(ensure_not_symlink(&target).await.is_ok());
        assert!(ensure_not_symlink(&link).await.is_err());
        assert!(ensure_not_symlink(&dir.path().join("missing")).await.is_ok());
    }
}
