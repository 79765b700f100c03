use super::ollama::OllamaError;
use super::openai::OpenAIError;


#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Ollama error: {0}")]
    OllamaError(#[from] OllamaError),

    #[error("OpenAI error: {0}")]
    OpenAIError(#[from] OpenAIError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Streaming not supported")]
    StreamNotSupported,

    #[error("JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LLMError {
    /// Whether the same request may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LLMError::Status { status, .. } => *status == 429 || *status >= 500,
            LLMError::RateLimitExceeded(_) => true,
            LLMError::OllamaError(_) | LLMError::OpenAIError(_) => true,
            LLMError::StreamNotSupported
            | LLMError::SerdeJsonError(_)
            | LLMError::InvalidResponse(_) => false,
        }
    }
}
