#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid arguments for {tool_name}: {message}")]
    InvalidArguments { tool_name: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
