use std::collections::HashMap;
use std::sync::Arc;

use serde::{Serialize, Deserialize};
use tokio_util::sync::CancellationToken;

use crate::error::ValidationError;
use super::error::ToolError;
use super::traits::Tool;

/// What `register` does when a tool name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Swap in the new tool, keeping the original registration slot.
    #[default]
    Replace,
    /// Refuse with `ValidationError::DuplicateTool`.
    Reject,
}

/// Tools keyed by name, listed in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    policy: DuplicatePolicy,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ValidationError> {
        let name = tool.name().trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyToolName);
        }
        if tool.description().trim().is_empty() {
            return Err(ValidationError::EmptyToolDescription(name.to_string()));
        }

        match self.index.get(name).copied() {
            Some(slot) => match self.policy {
                DuplicatePolicy::Replace => {
                    tracing::debug!(tool = name, "replacing registered tool");
                    self.tools[slot] = tool;
                }
                DuplicatePolicy::Reject => {
                    return Err(ValidationError::DuplicateTool(name.to_string()));
                }
            },
            None => {
                self.index.insert(name.to_string(), self.tools.len());
                self.tools.push(tool);
            }
        }
        Ok(())
    }

    /// Registered tools in registration order.
    pub fn list(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name().trim()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| self.tools[slot].clone())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn invoke(&self, name: &str, input: &str, cancel: CancellationToken) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.run(input, cancel)
            .await
            .map_err(|source| ToolError::Execution { name: name.to_string(), source })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("policy", &self.policy)
            .finish()
    }
}
