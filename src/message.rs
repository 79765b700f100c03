
use std::fmt;

use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,           // System message
    User,             // User input
    Assistant,        // AI response
    Tool,             // Tool execution result fed back to the model
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversation turn. Turns are never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,  // Tool name for tool result turns
}


impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            name: None,
        }
    }

    /// Successful tool output, phrased so the model can read it back.
    pub fn tool_res(name: impl Into<String>, output: impl AsRef<str>) -> Self {
        let name = name.into();
        Self {
            role: MessageRole::Tool,
            content: format!("Tool {} returned: {}", name, output.as_ref()),
            name: Some(name),
        }
    }

    /// Tool failure summary.
    pub fn tool_err(name: impl Into<String>, cause: impl fmt::Display) -> Self {
        let name = name.into();
        Self {
            role: MessageRole::Tool,
            content: format!("Tool {} failed: {}", name, cause),
            name: Some(name),
        }
    }
}
