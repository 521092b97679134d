pub mod admission;
pub mod config;
pub mod error;
pub mod server;
pub mod tools;

pub use admission::{CommandAdmissionFilter, DenyReason, PathAuthorizer, Verdict};
pub use config::{AdmissionConfig, CommandWhitelist, ConfigSources, FileConfig, PathOverrides, PathRule};
pub use error::ServerError;
pub use server::McpServer;
pub use tools::{
    ExecuteShellTool, SearchInFileTool, ShowFileTool, Tool, ToolHandler, ToolOutput, ToolRegistry,
    WriteFileTool,
};
