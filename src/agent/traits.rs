
use tokio_util::sync::CancellationToken;

use super::types::AgentExecuteResult;

/// Trait describing runtime operations an agent can perform.
#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run one exchange for `prompt` and return the final generation with usage.
    async fn call_llm(&self, prompt: &str, cancel: &CancellationToken) -> AgentExecuteResult;
}
