use std::time::Duration;

use crate::error::ValidationError;
use crate::tools::error::ToolError;
use crate::llm::error::LLMError;

/// Failure of a single `chat` exchange. None of these are fatal to the agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Completion service error: {0}")]
    Service(#[from] LLMError),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution error: {0}")]
    ToolExecution(ToolError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Maximum iterations exceeded: {0}")]
    MaxIterationsExceeded(usize)
}

impl From<ToolError> for AgentError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(name) => AgentError::ToolNotFound(name),
            other => AgentError::ToolExecution(other),
        }
    }
}

impl AgentError {
    /// Whether resending the same message may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Service(e) => e.is_retryable(),
            AgentError::TimedOut(_) => true,
            _ => false,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, AgentError::Cancelled | AgentError::TimedOut(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_is_lifted() {
        let err: AgentError = ToolError::NotFound("weather".into()).into();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "weather"));
    }

    #[test]
    fn classification() {
        assert!(AgentError::TimedOut(Duration::from_secs(1)).is_cancellation());
        assert!(AgentError::TimedOut(Duration::from_secs(1)).is_retryable());
        assert!(!AgentError::Validation(ValidationError::EmptyMessage).is_retryable());
        assert!(AgentError::Service(LLMError::Status { status: 502, body: String::new() }).is_retryable());
    }
}
