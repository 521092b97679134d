use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{
    ExecuteShellTool, SearchInFileTool, ShowFileTool, Tool, ToolDefinition, ToolHandler,
    ToolOutput, WriteFileTool,
};
use crate::admission::{CommandAdmissionFilter, PathAuthorizer};
use crate::error::ServerError;

/// Name-to-handler map, filled once at startup.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// The four standard tools, all sharing one authorizer.
    pub fn with_default_tools(paths: PathAuthorizer) -> Self {
        let mut registry = Self::new();
        registry.register(ShowFileTool::new(paths.clone()));
        registry.register(WriteFileTool::new(paths.clone()));
        registry.register(SearchInFileTool::new(paths.clone()));
        registry.register(ExecuteShellTool::new(CommandAdmissionFilter::new(paths)));
        registry
    }

    /// Register a tool, replacing any earlier tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Definitions of every tool, ordered by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Dispatch a call by tool name.
    pub async fn invoke(&self, name: &str, params: Value) -> Result<ToolOutput, ServerError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ServerError::UnknownTool(name.to_string()))?;
        debug!(tool = name, "invoking tool");
        tool.invoke(params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
