
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution error in '{name}': {source}")]
    Execution {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ToolError {
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::NotFound(name) | ToolError::Execution { name, .. } => name,
        }
    }
}
