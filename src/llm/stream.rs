use serde::{Serialize, Deserialize};
use serde_json::Value;

use super::tokens::TokenUsage;

/// One chunk of a streamed generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamData {
    /// Raw backend payload for this chunk.
    pub value: Value,
    /// Usage, usually only on the final chunk.
    pub tokens: Option<TokenUsage>,
    /// Text delta carried by this chunk.
    pub content: String,
    /// Set on the answer that follows a tool round trip: this chunk is the
    /// whole reply and the text streamed before it was a tool-call directive.
    #[serde(default)]
    pub replaces_previous: bool,
}

impl StreamData {
    pub fn new(value: Value, tokens: Option<TokenUsage>, content: impl Into<String>) -> Self {
        Self {
            value,
            tokens,
            content: content.into(),
            replaces_previous: false,
        }
    }

    pub fn replacing_previous(mut self) -> Self {
        self.replaces_previous = true;
        self
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(Value::Null, None, content)
    }
}
