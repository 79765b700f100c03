pub mod traits;
pub mod openai;
pub mod ollama;
pub mod http;
pub mod tokens;
pub mod stream;
pub mod error;


use serde::{Serialize, Deserialize};
use tokens::TokenUsage;

/// Result of a text generation from an LLM.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GenerateResult {
    pub tokens: TokenUsage,
    pub generation: String,
}

impl GenerateResult {
    pub fn new(generation: impl Into<String>) -> Self {
        Self {
            tokens: TokenUsage::default(),
            generation: generation.into(),
        }
    }

    pub fn with_tokens(mut self, tokens: TokenUsage) -> Self {
        self.tokens = tokens;
        self
    }
}

/// Result type for LLM operations.
pub type LLMResult<T> = std::result::Result<T, error::LLMError>;
