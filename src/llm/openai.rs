// Any OpenAI-compatible chat completions server (OpenAI, vLLM, LM Studio, llama.cpp server...).
pub use async_openai::{
    Client, config::OpenAIConfig, error::OpenAIError,
};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use serde::{Serialize, Deserialize};
use serde_json::json;
use async_stream::stream as async_stream;
use futures::{
    FutureExt,
    StreamExt,
    future::BoxFuture,
    stream::BoxStream
};

use crate::message::{Message, MessageRole};
use crate::llm::{
    traits::LLM,
    tokens::TokenUsage,
    stream::StreamData,
    error::LLMError,
    GenerateResult,
    LLMResult,
};


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAI {
    pub client: Client<OpenAIConfig>,
    pub options: CompletionOptions,
}

impl OpenAI {
    /// Uses `OPENAI_API_KEY` / `OPENAI_BASE_URL` from the environment.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            options: CompletionOptions::new(model),
        }
    }

    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            options: CompletionOptions::new(model),
        }
    }

    /// Point at a self-hosted server, e.g. `http://localhost:8000/v1`.
    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        let mut config = OpenAIConfig::new().with_api_base(base_url);
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        Self::with_config(config, model)
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    fn build_request(&self, messages: &[Message]) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let mut mapped = Vec::with_capacity(messages.len());
        for message in messages {
            mapped.push(to_openai_message(message)?);
        }
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.options.model.clone()).messages(mapped);
        if let Some(temperature) = self.options.temperature {
            args.temperature(temperature);
        }
        if let Some(max_tokens) = self.options.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        args.build()
    }
}

// Tool results travel as plain user turns: the directive protocol is carried in
// text, so there is no native `tool_call_id` to attach them to.
fn to_openai_message(message: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.clone();
    let mapped: ChatCompletionRequestMessage = match message.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::User | MessageRole::Tool => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(mapped)
}

impl LLM for OpenAI {
    fn model(&self) -> &str {
        &self.options.model
    }

    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        async move {
            let request = self.build_request(messages)?;
            let response = self.client.chat().create(request).await?;

            let generation = response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| LLMError::InvalidResponse("completion returned no content".into()))?;
            let tokens = response
                .usage
                .map(|usage| TokenUsage::new(usage.prompt_tokens, usage.completion_tokens))
                .unwrap_or_default();

            Ok(GenerateResult { tokens, generation })
        }
        .boxed()
    }

    fn stream<'a>(&'a self, messages: &'a [Message]) -> BoxStream<'a, LLMResult<StreamData>> {
        let s = async_stream! {
            let request = match self.build_request(messages) {
                Ok(request) => request,
                Err(e) => {
                    yield Err(LLMError::from(e));
                    return;
                }
            };
            let mut upstream = match self.client.chat().create_stream(request).await {
                Ok(s) => s,
                Err(e) => {
                    yield Err(LLMError::from(e));
                    return;
                }
            };

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        let content: String = chunk
                            .choices
                            .iter()
                            .filter_map(|choice| choice.delta.content.as_deref())
                            .collect();
                        let tokens = chunk
                            .usage
                            .map(|usage| TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
                        if content.is_empty() && tokens.is_none() {
                            continue;
                        }
                        yield Ok(StreamData::new(json!({ "id": chunk.id, "content": content }), tokens, content));
                    }
                    Err(e) => {
                        yield Err(LLMError::from(e));
                        return;
                    }
                }
            }
        };

        Box::pin(s)
    }
}
