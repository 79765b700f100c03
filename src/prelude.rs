//! Common imports: `use mini_chat_agent::prelude::*;`

pub use crate::agent::{
    error::AgentError,
    traits::AgentRunner,
    types::{Agent, AgentResult},
};
pub use crate::config::{AppConfig, BackendConfig};
pub use crate::error::{Error, ValidationError};
pub use crate::llm::{
    GenerateResult,
    error::LLMError,
    http::HttpCompletion,
    ollama::Ollama,
    openai::OpenAI,
    stream::StreamData,
    traits::{LLM, llm_to_arc_dyn},
};
pub use crate::memory::History;
pub use crate::message::{Message, MessageRole};
pub use crate::tools::{DuplicatePolicy, FnTool, Tool, ToolError, ToolRegistry};
pub use crate::CancellationToken;
pub use crate::tool;
