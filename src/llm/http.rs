//! Generic completion backend speaking the minimal wire shape
//!
//! request:  `{"model": "...", "messages": [{"role": "...", "content": "..."}], "stream": false}`
//! response: `{"content": "..."}`
//!
//! Ollama (`{"message": {"content": ...}}`) and OpenAI
//! (`{"choices": [{"message": {"content": ...}}]}`) response bodies are accepted
//! as well, so the same client can be pointed at either server directly.

use std::time::Duration;

use async_stream::stream as async_stream;
use futures::{
    FutureExt,
    StreamExt,
    future::BoxFuture,
    stream::BoxStream
};
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::message::{Message, MessageRole};
use crate::llm::{
    traits::LLM,
    tokens::TokenUsage,
    stream::StreamData,
    error::LLMError,
    GenerateResult,
    LLMResult,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

/// Only system, user and assistant exist on the wire; tool results ride as
/// user turns since there is no `tool_call_id` to pair them with.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User | MessageRole::Tool => "user",
            MessageRole::Assistant => "assistant",
        };
        Self { role, content: &message.content }
    }
}

#[derive(Debug, Deserialize)]
struct ContentOnly {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    #[serde(default)]
    message: Option<ContentOnly>,
    #[serde(default)]
    delta: Option<ContentOnly>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    message: Option<ContentOnly>,
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    // Ollama counters
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

impl CompletionResponse {
    fn text(&self) -> Option<&str> {
        if let Some(content) = self.content.as_deref() {
            return Some(content);
        }
        if let Some(content) = self.message.as_ref().and_then(|m| m.content.as_deref()) {
            return Some(content);
        }
        self.choices.iter().find_map(|choice| {
            choice
                .message
                .as_ref()
                .or(choice.delta.as_ref())
                .and_then(|m| m.content.as_deref())
        })
    }

    fn tokens(&self) -> Option<TokenUsage> {
        if let Some(usage) = &self.usage {
            return Some(TokenUsage::from_counts(usage.prompt_tokens, usage.completion_tokens));
        }
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(TokenUsage::from_counts(prompt.unwrap_or(0), completion.unwrap_or(0))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpCompletion {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpCompletion {
    /// `endpoint` is the full URL requests are POSTed to, e.g. `http://localhost:11434/api/chat`.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> LLMResult<Self> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_client(client, endpoint, model))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, messages: &[Message], stream: bool) -> LLMResult<reqwest::Response> {
        let body = CompletionRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            stream,
        };
        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LLMError::RateLimitExceeded(body));
        }
        Err(LLMError::Status { status: status.as_u16(), body })
    }
}

/// Parse one line of a streamed body: NDJSON, or SSE `data: ...` lines.
/// Returns `None` for keep-alives, comments and the `[DONE]` marker.
fn parse_stream_line(line: &str) -> Option<LLMResult<StreamData>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = match line.strip_prefix("data:") {
        Some(rest) => rest.trim(),
        None if line.starts_with('{') => line,
        None => return None,
    };
    if data == "[DONE]" {
        return None;
    }
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => return Some(Err(LLMError::from(e))),
    };
    let parsed: CompletionResponse = match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(e) => return Some(Err(LLMError::from(e))),
    };
    let content = parsed.text().unwrap_or_default().to_string();
    let tokens = parsed.tokens();
    Some(Ok(StreamData::new(value, tokens, content)))
}

/// Decode one complete line of raw body bytes. Lines are split on `\n`
/// before decoding so a character spanning two network chunks stays intact.
fn decode_stream_line(raw: &[u8]) -> Option<LLMResult<StreamData>> {
    match std::str::from_utf8(raw) {
        Ok(line) => parse_stream_line(line),
        Err(e) => Some(Err(LLMError::InvalidResponse(format!("stream line is not UTF-8: {e}")))),
    }
}

impl LLM for HttpCompletion {
    fn model(&self) -> &str {
        &self.model
    }

    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        async move {
            let resp = self.send(messages, false).await?;
            let raw = resp.text().await?;
            let parsed: CompletionResponse = serde_json::from_str(&raw)
                .map_err(|e| LLMError::InvalidResponse(format!("{e}: {raw}")))?;
            let generation = parsed
                .text()
                .ok_or_else(|| LLMError::InvalidResponse(format!("no content in response: {raw}")))?
                .to_string();
            let tokens = parsed.tokens().unwrap_or_default();
            Ok(GenerateResult { tokens, generation })
        }
        .boxed()
    }

    fn stream<'a>(&'a self, messages: &'a [Message]) -> BoxStream<'a, LLMResult<StreamData>> {
        let s = async_stream! {
            let resp = match self.send(messages, true).await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut body = resp.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LLMError::from(e));
                        return;
                    }
                };
                buffer.extend_from_slice(&chunk);
                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    if let Some(item) = decode_stream_line(&line) {
                        let failed = item.is_err();
                        yield item;
                        if failed {
                            return;
                        }
                    }
                }
            }
            if let Some(item) = decode_stream_line(&buffer) {
                yield item;
            }
        };

        Box::pin(s)
    }
}
