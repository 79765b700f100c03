use crate::llm::traits::LLM;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use crate::memory::History;
use crate::tools::{CallInfo, ToolRegistry};
use super::error::AgentError;
use crate::llm::tokens::TokenUsage;
use serde::{Serialize, Deserialize};

/// Default cap on completion calls per exchange.
pub const DEFAULT_MAX_ITERATIONS: usize = 4;

/// Conversational agent: one completion backend, one tool registry and one
/// bounded history, none of them shared with other agents.
pub struct Agent {
    /// A short, human-friendly name for the agent instance.
    pub name: String,

    /// The completion service used to generate responses.
    pub llm: Arc<dyn LLM>,

    /// Registered tools the model may call by name.
    pub(crate) tools: RwLock<ToolRegistry>,

    /// Recent turns, fed back into the system prompt.
    pub(crate) history: Mutex<History>,

    /// Optional instructions placed at the top of the system prompt.
    pub system_prompt: Option<String>,

    /// Maximum completion calls per exchange, tool round-trips included.
    pub max_iterations: usize,

    /// Applied by `chat` and `chat_with_cancel` when set.
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AgentResult {
    pub tokens: TokenUsage,
    pub generation: String,
    /// Completion calls made for this exchange.
    pub iterations: usize,
    /// Tools that ran successfully, in call order.
    pub tool_calls: Vec<CallInfo>,
}

pub type AgentExecuteResult = Result<AgentResult, AgentError>;
