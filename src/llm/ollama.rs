
use std::sync::Arc;
use async_stream::stream as async_stream;
use futures::{
    FutureExt,
    future::BoxFuture,
    stream::BoxStream
};
#[cfg(feature = "ollama_stream")]
use futures::StreamExt;


use crate::message::Message;
use crate::message::MessageRole as MsgRole;

use crate::llm::{
    traits::LLM,
    tokens::TokenUsage,
    stream::StreamData,
    error::LLMError,
    GenerateResult,
    LLMResult,
};

/// Default model name used when no model is specified.
/// Adjust this to match the model name you have installed in your local Ollama.
/// Common names: "llama3.2", "llama3", "llama2", or custom names from `ollama list`.
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_HOST: &str = "http://localhost";
pub const DEFAULT_PORT: u16 = 11434;

pub use ollama_rs::{
    error::OllamaError,
    Ollama as OllamaClient,
    models::ModelOptions,
    generation::chat::{request::ChatMessageRequest, ChatMessage, MessageRole},
};


#[derive(Debug, Clone)]
pub struct Ollama {
    pub(crate) client: Arc<OllamaClient>,
    pub(crate) model: String,
    pub(crate) options: Option<ModelOptions>,
}
impl Ollama {
    /// Create an `Ollama` wrapper using the provided client and the default model.
    ///
    /// If your local Ollama uses a different default model name, change
    /// `DEFAULT_MODEL` or call `Ollama::with_model`.
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            options: None,
        }
    }

    /// Connect to an Ollama server at `host:port`, e.g. `("http://10.0.0.2", 11434)`.
    pub fn connect(host: impl Into<String>, port: u16) -> Self {
        let client = Arc::new(OllamaClient::builder().host(host.into()).port(port).build());
        Self::new(client)
    }

    /// Create an `Ollama` wrapper with an explicit model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Create an `Ollama` wrapper with additional generation options.
    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = Some(options);
        self
    }

    fn generate_request(&self, messages: &[Message]) -> ChatMessageRequest {
        let mapped_messages = messages.iter().map(|message| message.into()).collect();
        let request = ChatMessageRequest::new(self.model.clone(), mapped_messages);
        match &self.options {
            Some(options) => request.options(options.clone()),
            None => request,
        }
    }
}

impl Default for Ollama {
    fn default() -> Self {
        let client = Arc::new(OllamaClient::default());
        Ollama::new(client)
    }
}


impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            MsgRole::System => MessageRole::System,
            MsgRole::User => MessageRole::User,
            MsgRole::Assistant => MessageRole::Assistant,
            MsgRole::Tool => MessageRole::Tool,
        };
        ChatMessage::new(role, message.content.clone())
    }
}


impl LLM for Ollama {
    fn model(&self) -> &str {
        &self.model
    }

    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        async move {
            let request = self.generate_request(messages);

            let response = self
                .client
                .send_chat_messages(request)
                .await
                .map_err(LLMError::from)?;
            let generation = response.message.content.clone();

            let tokens = response
                .final_data
                .map(|final_data| {
                    TokenUsage::from_counts(final_data.prompt_eval_count, final_data.eval_count)
                })
                .unwrap_or_default();

            Ok(GenerateResult { tokens, generation })
        }
        .boxed()
    }

    fn stream<'a>(&'a self, messages: &'a [Message]) -> BoxStream<'a, LLMResult<StreamData>> {
        // Keep borrowed references `self` and `messages` in scope for the async generator.
        let this = self;
        let msgs = messages;

        let s = async_stream! {
            // Prefer upstream streaming if feature enabled
            #[cfg(feature = "ollama_stream")]
            {
                let request = this.generate_request(msgs);
                let upstream = match this.client.send_chat_messages_stream(request).await {
                    Ok(s) => s,
                    Err(e) => {
                        yield Err(LLMError::from(e));
                        return;
                    }
                };

                futures::pin_mut!(upstream);
                while let Some(item_res) = upstream.next().await {
                    match item_res {
                        Ok(item) => {
                            let value = serde_json::to_value(&item.message).unwrap_or_default();
                            let content = item.message.content.clone();
                            let tokens = item.final_data.map(|final_data| {
                                TokenUsage::from_counts(final_data.prompt_eval_count, final_data.eval_count)
                            });
                            yield Ok(StreamData::new(value, tokens, content));
                        }
                        Err(e) => {
                            yield Err(LLMError::InvalidResponse(format!("{:?}", e)));
                            return;
                        }
                    }
                }
            }

            // Fallback: call non-streaming endpoint and yield single item
            #[cfg(not(feature = "ollama_stream"))]
            {
                let request = this.generate_request(msgs);
                match this.client.send_chat_messages(request).await {
                    Ok(response) => {
                        let content = response.message.content.clone();
                        let value = serde_json::to_value(&response.message).unwrap_or_default();

                        let tokens = response.final_data.map(|final_data| {
                            TokenUsage::from_counts(final_data.prompt_eval_count, final_data.eval_count)
                        });

                        yield Ok(StreamData::new(value, tokens, content));
                    }
                    Err(e) => {
                        yield Err(LLMError::from(e));
                    }
                }
            }
        };

        Box::pin(s)
    }
}
