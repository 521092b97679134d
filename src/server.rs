//! MCP front end: exposes a [`ToolRegistry`] over stdio.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool as McpTool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;
use tracing::{error, info};

use crate::error::ServerError;
use crate::tools::{ToolDefinition, ToolOutput, ToolRegistry};

/// Request handler bridging the protocol to the tool registry.
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve on stdin/stdout until the client disconnects.
    pub async fn serve_stdio(self) -> Result<()> {
        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .inspect_err(|e| error!(error = %e, "failed to initialize MCP session"))
            .context("failed to start MCP server")?;

        info!("MCP session established");
        let reason = service.waiting().await.context("MCP server task failed")?;
        info!(?reason, "MCP session ended");
        Ok(())
    }
}

fn to_mcp_tool(def: ToolDefinition) -> McpTool {
    let schema = match def.schema {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    McpTool::new(def.name, def.description, Arc::new(schema))
}

fn to_call_result(output: ToolOutput) -> CallToolResult {
    let content = vec![Content::text(output.to_text())];
    if output.success {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    }
}

fn to_error_data(err: ServerError) -> ErrorData {
    match err {
        ServerError::UnknownTool(_) | ServerError::InvalidArguments { .. } => {
            ErrorData::invalid_params(err.to_string(), None)
        }
        other => ErrorData::internal_error(other.to_string(), None),
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "File and process tools. Every path and command is checked against the \
                 server's allowed and denied locations before it is touched."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self
            .registry
            .definitions()
            .into_iter()
            .map(to_mcp_tool)
            .collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let params = Value::Object(request.arguments.unwrap_or_default());
        self.registry
            .invoke(&request.name, params)
            .await
            .map(to_call_result)
            .map_err(to_error_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_output_is_flagged_as_error() {
        let result = to_call_result(ToolOutput {
            success: false,
            body: json!({ "success": false, "error": "denied" }),
        });
        assert_eq!(result.is_error, Some(true));

        let result = to_call_result(ToolOutput {
            success: true,
            body: json!({ "success": true }),
        });
        assert_eq!(result.is_error, Some(false));
    }

    #[test]
    fn definitions_convert_to_protocol_tools() {
        let tool = to_mcp_tool(ToolDefinition {
            name: "show_file".into(),
            description: "show".into(),
            schema: json!({ "type": "object", "properties": {} }),
        });
        assert_eq!(tool.name, "show_file");
        assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
    }

    #[test]
    fn argument_errors_map_to_invalid_params() {
        let data = to_error_data(ServerError::UnknownTool("x".into()));
        assert_eq!(data.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }
}
