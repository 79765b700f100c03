use std::sync::Arc;
use std::time::Duration;

use async_stream::stream as async_stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::ValidationError;
use crate::llm::traits::LLM;
use crate::llm::tokens::TokenUsage;
use crate::llm::stream::StreamData;
use crate::llm::GenerateResult;
use crate::memory::History;
use crate::message::Message;
use crate::tools::{directive, Tool, ToolError, ToolRegistry};


pub mod types;
pub mod error;
pub mod traits;
pub mod prompt;

use traits::AgentRunner;
use types::{Agent, AgentResult, AgentExecuteResult, DEFAULT_MAX_ITERATIONS};
use error::AgentError;

fn validate_message(message: &str) -> Result<&str, ValidationError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    Ok(trimmed)
}


impl Agent {
    /// Create a new Agent with the provided name and LLM. Tools start empty.
    pub fn new(name: impl Into<String>, llm: Arc<dyn LLM>) -> Self {
        Self {
            name: name.into(),
            llm,
            tools: RwLock::new(ToolRegistry::new()),
            history: Mutex::new(History::default()),
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            request_timeout: None,
        }
    }

    /// Build an agent and its backend from configuration.
    pub fn from_config(config: &AppConfig) -> crate::error::Result<Self> {
        config.validate()?;
        let llm = config.backend.build()?;
        let settings = &config.agent;

        let mut agent = Agent::new(settings.name.clone(), llm)
            .with_history_capacity(settings.history_capacity)
            .with_max_iterations(settings.max_iterations)
            .with_registry(ToolRegistry::with_policy(settings.on_duplicate_tool));
        if let Some(prompt) = &settings.system_prompt {
            agent = agent.with_system_prompt(prompt.clone());
        }
        if let Some(limit) = settings.request_timeout() {
            agent = agent.with_timeout(limit);
        }
        Ok(agent)
    }

    /// Set or replace the agent's system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Replace the history store with an empty one of the given capacity.
    pub fn with_history_capacity(self, capacity: usize) -> Self {
        self.with_history(History::new(capacity))
    }

    pub fn with_history(mut self, history: History) -> Self {
        self.history = Mutex::new(history);
        self
    }

    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.tools = RwLock::new(registry);
        self
    }

    /// Change the maximum completion calls per exchange. At least one call is always allowed.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builder-style registration, for agents not yet shared.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, ValidationError> {
        self.tools.get_mut().register(tool)?;
        Ok(self)
    }

    /// Register a tool; the duplicate policy of the registry decides what a
    /// repeated name does.
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), ValidationError> {
        self.tools.write().await.register(tool)
    }

    pub async fn tool_names(&self) -> Vec<String> {
        self.tools.read().await.names().into_iter().map(String::from).collect()
    }

    /// Current history window, oldest first.
    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.snapshot()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// The system prompt the next exchange would send.
    pub async fn current_system_prompt(&self) -> String {
        self.prepare().await.1
    }

    /// Send one user message and return the assistant's reply.
    pub async fn chat(&self, message: &str) -> Result<String, AgentError> {
        let cancel = CancellationToken::new();
        self.chat_with_cancel(message, &cancel).await
    }

    /// Like [`Agent::chat`], but abandoned as soon as `cancel` fires. History is
    /// left untouched by a cancelled exchange.
    #[tracing::instrument(skip_all, fields(agent = %self.name))]
    pub async fn chat_with_cancel(&self, message: &str, cancel: &CancellationToken) -> Result<String, AgentError> {
        self.run_bounded(message, cancel, self.request_timeout)
            .await
            .map(|result| result.generation)
    }

    /// Like [`Agent::chat`] with an explicit deadline instead of the configured one.
    pub async fn chat_with_timeout(&self, message: &str, timeout: Duration) -> Result<String, AgentError> {
        let cancel = CancellationToken::new();
        self.run_bounded(message, &cancel, Some(timeout))
            .await
            .map(|result| result.generation)
    }

    /// Streaming variant of [`Agent::chat`].
    ///
    /// Chunks are forwarded as the backend produces them and history is
    /// committed once the stream ends. A failure ends the stream with a single
    /// `Err` item.
    ///
    /// When the streamed reply turns out to be a tool-call directive, the
    /// chunks already forwarded are that directive's JSON, not answer text.
    /// The round-trip then continues without streaming and the follow-up
    /// answer arrives as one final chunk with
    /// [`StreamData::replaces_previous`] set; display it in place of
    /// everything received before.
    pub fn chat_stream<'a>(
        &'a self,
        message: &'a str,
        cancel: &'a CancellationToken,
    ) -> BoxStream<'a, Result<StreamData, AgentError>> {
        let s = async_stream! {
            let message = match validate_message(message) {
                Ok(message) => message,
                Err(e) => {
                    yield Err(AgentError::from(e));
                    return;
                }
            };
            let (registry, system) = self.prepare().await;
            let user = Message::user(message);
            let msgs = vec![Message::system(system), user.clone()];

            let mut generation = String::new();
            let mut tokens = TokenUsage::default();
            let mut failure = None;
            {
                let mut upstream = self.llm.stream(&msgs);
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(AgentError::Cancelled),
                        item = upstream.next() => Ok(item),
                    };
                    match next {
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                        Ok(None) => break,
                        Ok(Some(Err(e))) => {
                            failure = Some(AgentError::Service(e));
                            break;
                        }
                        Ok(Some(Ok(chunk))) => {
                            generation.push_str(&chunk.content);
                            if let Some(usage) = chunk.tokens {
                                tokens += usage;
                            }
                            yield Ok(chunk);
                        }
                    }
                }
            }
            if let Some(e) = failure {
                warn!(agent = %self.name, error = %e, "streamed exchange failed");
                yield Err(e);
                return;
            }

            let streamed = GenerateResult { tokens, generation };
            match self.drive(user, msgs, Some(streamed), &registry, cancel).await {
                Ok(result) if result.iterations > 1 => {
                    yield Ok(StreamData::new(Value::Null, Some(result.tokens), result.generation).replacing_previous());
                }
                Ok(_) => {}
                Err(e) => {
                    yield Err(e);
                }
            }
        };

        Box::pin(s)
    }

    async fn run_bounded(
        &self,
        message: &str,
        cancel: &CancellationToken,
        limit: Option<Duration>,
    ) -> AgentExecuteResult {
        let Some(limit) = limit else {
            return self.call_llm(message, cancel).await;
        };
        // tool handlers holding a clone of this token learn about the deadline too
        let scoped = cancel.child_token();
        match tokio::time::timeout(limit, self.call_llm(message, &scoped)).await {
            Ok(result) => result,
            Err(_) => {
                scoped.cancel();
                warn!(agent = %self.name, ?limit, "exchange timed out");
                Err(AgentError::TimedOut(limit))
            }
        }
    }

    /// Snapshot the registry and assemble the system prompt from the current history.
    async fn prepare(&self) -> (ToolRegistry, String) {
        let registry = self.tools.read().await.clone();
        let history = self.history.lock().await.snapshot();
        let system = prompt::build_system_prompt(self.system_prompt.as_deref(), registry.list(), &history);
        (registry, system)
    }

    async fn complete(&self, msgs: &[Message], cancel: &CancellationToken) -> Result<GenerateResult, AgentError> {
        debug!(agent = %self.name, model = self.llm.model(), messages = msgs.len(), "requesting completion");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            res = self.llm.generate(msgs) => res.map_err(|e| {
                warn!(agent = %self.name, error = %e, "completion failed");
                AgentError::Service(e)
            }),
        }
    }

    /// Tool round-trip loop. `pending` is a completion already obtained for
    /// `msgs` (the streaming path); otherwise the first call is made here.
    async fn drive(
        &self,
        user: Message,
        mut msgs: Vec<Message>,
        mut pending: Option<GenerateResult>,
        registry: &ToolRegistry,
        cancel: &CancellationToken,
    ) -> AgentExecuteResult {
        let mut result = AgentResult::default();
        loop {
            let res = match pending.take() {
                Some(res) => res,
                None => {
                    if result.iterations >= self.max_iterations {
                        warn!(agent = %self.name, max = self.max_iterations, "tool loop did not settle");
                        return Err(AgentError::MaxIterationsExceeded(self.max_iterations));
                    }
                    self.complete(&msgs, cancel).await?
                }
            };
            result.iterations += 1;
            result.tokens += res.tokens;

            let Some(calls) = directive::parse(&res.generation) else {
                self.history
                    .lock()
                    .await
                    .record_exchange(user, Message::assistant(res.generation.clone()));
                result.generation = res.generation;
                info!(
                    agent = %self.name,
                    iterations = result.iterations,
                    total_tokens = result.tokens.total_tokens,
                    "exchange completed"
                );
                return Ok(result);
            };

            if let Some(unknown) = calls.iter().find(|call| registry.get(&call.name).is_none()) {
                warn!(agent = %self.name, tool = %unknown.name, "model requested an unregistered tool");
                return Err(AgentError::ToolNotFound(unknown.name.clone()));
            }

            msgs.push(Message::assistant(res.generation));
            for call in calls {
                debug!(agent = %self.name, tool = %call.name, "invoking tool");
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                    outcome = registry.invoke(&call.name, &call.input, cancel.clone()) => outcome,
                };
                match outcome {
                    Ok(output) => {
                        msgs.push(Message::tool_res(call.name.clone(), output));
                        result.tool_calls.push(call);
                    }
                    Err(err) => {
                        let cause = match &err {
                            ToolError::Execution { source, .. } => source.to_string(),
                            other => other.to_string(),
                        };
                        warn!(agent = %self.name, tool = %call.name, error = %cause, "tool failed");
                        self.history
                            .lock()
                            .await
                            .record_exchange(user, Message::tool_err(call.name, cause));
                        return Err(AgentError::from(err));
                    }
                }
            }
        }
    }
}



#[async_trait::async_trait]
impl AgentRunner for Agent {
    async fn call_llm(&self, prompt: &str, cancel: &CancellationToken) -> AgentExecuteResult {
        let message = validate_message(prompt)?;
        let (registry, system) = self.prepare().await;
        let user = Message::user(message);
        let msgs = vec![Message::system(system), user.clone()];
        self.drive(user, msgs, None, &registry, cancel).await
    }
}
