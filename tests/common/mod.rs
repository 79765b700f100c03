#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use mini_chat_agent::llm::error::LLMError;
use mini_chat_agent::llm::stream::StreamData;
use mini_chat_agent::llm::tokens::TokenUsage;
use mini_chat_agent::llm::traits::LLM;
use mini_chat_agent::llm::{GenerateResult, LLMResult};
use mini_chat_agent::message::Message;

/// One scripted completion outcome.
pub enum Reply {
    Text(String),
    Fail(LLMError),
    /// Never resolves; used to exercise cancellation and timeouts.
    Hang,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn unavailable() -> Self {
        Reply::Fail(LLMError::Status { status: 503, body: "model loading".into() })
    }
}

/// Completion service double: replays scripted replies in order, counts
/// calls and records every request. Falls back to echoing the last user
/// message once the script is exhausted.
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedLlm {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Vec<Message> {
        self.requests().pop().expect("no request recorded")
    }

    fn next_reply(&self, messages: &[Message]) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Reply::Text(format!("echo: {last}"))
        })
    }
}

impl LLM for ScriptedLlm {
    fn model(&self) -> &str {
        "scripted"
    }

    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        async move {
            match self.next_reply(messages) {
                Reply::Text(text) => Ok(GenerateResult::new(text).with_tokens(TokenUsage::new(10, 5))),
                Reply::Fail(err) => Err(err),
                Reply::Hang => future::pending().await,
            }
        }
        .boxed()
    }

    fn stream<'a>(&'a self, messages: &'a [Message]) -> BoxStream<'a, LLMResult<StreamData>> {
        async move {
            match self.next_reply(messages) {
                Reply::Text(text) => {
                    // split into word-ish chunks so callers see several items
                    let chunks: Vec<LLMResult<StreamData>> = text
                        .split_inclusive(' ')
                        .map(|piece| Ok(StreamData::text(piece)))
                        .collect();
                    stream::iter(chunks).boxed()
                }
                Reply::Fail(err) => stream::iter(vec![Err(err)]).boxed(),
                Reply::Hang => stream::pending().boxed(),
            }
        }
        .flatten_stream()
        .boxed()
    }
}
