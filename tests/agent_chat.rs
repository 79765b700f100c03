mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{Reply, ScriptedLlm};
use futures::StreamExt;
use mini_chat_agent::agent::error::AgentError;
use mini_chat_agent::agent::traits::AgentRunner;
use mini_chat_agent::agent::types::Agent;
use mini_chat_agent::error::ValidationError;
use mini_chat_agent::message::{Message, MessageRole};
use mini_chat_agent::tools::{FnTool, Tool, ToolError};
use mini_chat_agent::CancellationToken;

const WEATHER_CALL: &str = r#"{"tool_calls":[{"name":"weather","input":"NYC"}]}"#;

fn weather_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new("weather", "Get current weather for a city", |city: String, _| async move {
        anyhow::Ok(format!("Sunny in {city}, 72°F (mocked)."))
    }))
}

fn agent_with(llm: &ScriptedLlm) -> Agent {
    Agent::new("test-agent", Arc::new(llm.clone()))
}

fn contents(turns: &[Message]) -> Vec<String> {
    turns.iter().map(|m| m.content.clone()).collect()
}

#[tokio::test]
async fn plain_reply_is_returned_and_recorded() {
    let llm = ScriptedLlm::new([Reply::text("Hello there!")]);
    let agent = agent_with(&llm);

    let reply = agent.chat("  Hi  ").await.unwrap();

    assert_eq!(reply, "Hello there!");
    assert_eq!(llm.calls(), 1);
    let request = llm.last_request();
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, MessageRole::System);
    assert_eq!(request[1], Message::user("Hi"));
    assert_eq!(agent.history().await, vec![Message::user("Hi"), Message::assistant("Hello there!")]);
}

#[tokio::test]
async fn blank_message_never_reaches_the_service() {
    let llm = ScriptedLlm::default();
    let agent = agent_with(&llm);

    for message in ["", "   ", "\n\t"] {
        let err = agent.chat(message).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(ValidationError::EmptyMessage)));
    }
    let cancel = CancellationToken::new();
    let mut stream = agent.chat_stream(" ", &cancel);
    assert!(matches!(stream.next().await, Some(Err(AgentError::Validation(_)))));
    assert!(stream.next().await.is_none());

    assert_eq!(llm.calls(), 0);
    assert!(agent.history().await.is_empty());
}

#[tokio::test]
async fn history_keeps_most_recent_turns_in_order() {
    let llm = ScriptedLlm::default();
    let agent = agent_with(&llm).with_history_capacity(3);

    agent.chat("one").await.unwrap();
    assert_eq!(agent.history().await.len(), 2);
    agent.chat("two").await.unwrap();

    let history = agent.history().await;
    assert_eq!(history.len(), 3);
    assert_eq!(contents(&history), vec!["echo: one", "two", "echo: two"]);

    for i in 0..10 {
        agent.chat(&format!("m{i}")).await.unwrap();
        assert!(agent.history().await.len() <= 3);
    }
    assert_eq!(contents(&agent.history().await), vec!["echo: m8", "m9", "echo: m9"]);
}

#[tokio::test]
async fn prompt_carries_previous_turns_but_not_the_new_message() {
    let llm = ScriptedLlm::new([Reply::text("first answer"), Reply::text("second answer")]);
    let agent = agent_with(&llm).with_system_prompt("Be terse.");

    agent.chat("first question").await.unwrap();
    agent.chat("second question").await.unwrap();

    let system = &llm.last_request()[0].content;
    assert_eq!(
        system,
        "Be terse.\n\nConversation so far:\nuser: first question\nassistant: first answer"
    );
    assert_eq!(agent.current_system_prompt().await.matches("user:").count(), 2);
}

#[tokio::test]
async fn service_failure_leaves_history_untouched() {
    let llm = ScriptedLlm::new([Reply::text("ok"), Reply::unavailable(), Reply::text("recovered")]);
    let agent = agent_with(&llm);

    agent.chat("before").await.unwrap();
    let before = agent.history().await;

    let err = agent.chat("during outage").await.unwrap_err();
    assert!(matches!(err, AgentError::Service(_)));
    assert!(err.is_retryable());
    assert_eq!(agent.history().await, before);

    agent.chat("after").await.unwrap();
    let system = &llm.last_request()[0].content;
    assert!(system.contains("user: before\nassistant: ok"));
    assert!(!system.contains("during outage"));
    assert_eq!(contents(&agent.history().await)[2..], ["after".to_string(), "recovered".to_string()]);
}

#[tokio::test]
async fn weather_round_trip() {
    let llm = ScriptedLlm::new([
        Reply::text(WEATHER_CALL),
        Reply::text("It's sunny in NYC and 72°F."),
    ]);
    let agent = agent_with(&llm).with_tool(weather_tool()).unwrap();

    let result = agent.call_llm("What's the weather in NYC?", &CancellationToken::new()).await.unwrap();

    assert_eq!(result.generation, "It's sunny in NYC and 72°F.");
    assert_eq!(result.iterations, 2);
    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].name, "weather");
    assert_eq!(result.tool_calls[0].input, "NYC");
    assert_eq!(result.tokens.total_tokens, 30);

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0][0].content.contains("weather: Get current weather for a city"));
    let followup = &requests[1];
    assert_eq!(followup.len(), 4);
    assert_eq!(followup[2], Message::assistant(WEATHER_CALL));
    assert_eq!(followup[3].role, MessageRole::Tool);
    assert_eq!(followup[3].content, "Tool weather returned: Sunny in NYC, 72°F (mocked).");

    // only the user turn and the final answer are remembered
    assert_eq!(
        agent.history().await,
        vec![Message::user("What's the weather in NYC?"), Message::assistant("It's sunny in NYC and 72°F.")]
    );
}

#[tokio::test]
async fn tool_failure_is_reported_and_summarised_in_history() {
    let llm = ScriptedLlm::new([Reply::text(r#"Checking. {"tool_calls":[{"name":"flaky","input":"x"}]}"#)]);
    let agent = agent_with(&llm);
    agent
        .register_tool(Arc::new(FnTool::new("flaky", "Fails on purpose", |_: String, _| async move {
            Err::<String, _>(anyhow::anyhow!("backend offline"))
        })))
        .await
        .unwrap();

    let err = agent.chat("try it").await.unwrap_err();

    match &err {
        AgentError::ToolExecution(ToolError::Execution { name, source }) => {
            assert_eq!(name, "flaky");
            assert_eq!(source.to_string(), "backend offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_retryable());
    assert_eq!(llm.calls(), 1);
    assert_eq!(
        agent.history().await,
        vec![Message::user("try it"), Message::tool_err("flaky", "backend offline")]
    );
}

#[tokio::test]
async fn unknown_tool_is_rejected_without_running_anything() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let llm = ScriptedLlm::new([Reply::text(
        r#"{"tool_calls":[{"name":"weather","input":"NYC"},{"name":"stocks","input":"AAPL"}]}"#,
    )]);
    let agent = agent_with(&llm)
        .with_tool(Arc::new(FnTool::new("weather", "Weather", move |_: String, _| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok("sunny".to_string())
            }
        })))
        .unwrap();

    let err = agent.chat("weather and stocks").await.unwrap_err();

    assert!(matches!(err, AgentError::ToolNotFound(ref name) if name == "stocks"));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(agent.history().await.is_empty());
}

#[tokio::test]
async fn endless_tool_requests_hit_the_iteration_cap() {
    let llm = ScriptedLlm::new((0..5).map(|_| Reply::text(WEATHER_CALL)));
    let agent = agent_with(&llm)
        .with_max_iterations(3)
        .with_tool(weather_tool())
        .unwrap();

    let err = agent.chat("loop forever").await.unwrap_err();

    assert!(matches!(err, AgentError::MaxIterationsExceeded(3)));
    assert_eq!(llm.calls(), 3);
    assert!(agent.history().await.is_empty());
}

#[tokio::test]
async fn cancellation_leaves_history_untouched() {
    let llm = ScriptedLlm::new([Reply::text("kept"), Reply::Hang]);
    let agent = Arc::new(agent_with(&llm));
    agent.chat("first").await.unwrap();
    let before = agent.history().await;

    let cancel = CancellationToken::new();
    let task = {
        let agent = agent.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { agent.chat_with_cancel("second", &cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
    assert!(err.is_cancellation());
    assert_eq!(agent.history().await, before);
}

#[tokio::test]
async fn already_cancelled_token_skips_the_service() {
    let llm = ScriptedLlm::default();
    let agent = agent_with(&llm);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = agent.chat_with_cancel("hello", &cancel).await.unwrap_err();

    assert!(matches!(err, AgentError::Cancelled));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn cancellation_reaches_running_tools() {
    let seen_cancel = Arc::new(AtomicUsize::new(0));
    let flag = seen_cancel.clone();
    let llm = ScriptedLlm::new([Reply::text(r#"{"tool_calls":[{"name":"slow","input":""}]}"#)]);
    let agent = Arc::new(
        agent_with(&llm)
            .with_tool(Arc::new(FnTool::new("slow", "Waits for cancellation", move |_: String, cancel: CancellationToken| {
                let flag = flag.clone();
                async move {
                    let watcher = tokio::spawn(async move {
                        cancel.cancelled().await;
                        flag.fetch_add(1, Ordering::SeqCst);
                    });
                    futures::future::pending::<()>().await;
                    drop(watcher);
                    anyhow::Ok(String::new())
                }
            })))
            .unwrap(),
    );

    let cancel = CancellationToken::new();
    let task = {
        let agent = agent.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { agent.chat_with_cancel("go slow", &cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    assert!(matches!(task.await.unwrap(), Err(AgentError::Cancelled)));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(seen_cancel.load(Ordering::SeqCst), 1);
    assert!(agent.history().await.is_empty());
}

#[tokio::test]
async fn timeouts_surface_as_cancellation_errors() {
    let llm = ScriptedLlm::new([Reply::Hang, Reply::Hang]);
    let agent = agent_with(&llm).with_timeout(Duration::from_millis(30));

    let err = agent.chat("configured deadline").await.unwrap_err();
    assert!(matches!(err, AgentError::TimedOut(d) if d == Duration::from_millis(30)));

    let err = agent.chat_with_timeout("explicit deadline", Duration::from_millis(10)).await.unwrap_err();
    assert!(matches!(err, AgentError::TimedOut(_)));
    assert!(err.is_cancellation());
    assert!(agent.history().await.is_empty());
}

#[tokio::test]
async fn concurrent_chats_keep_pairs_together() {
    let llm = ScriptedLlm::default();
    let agent = Arc::new(agent_with(&llm).with_history_capacity(64));

    let mut handles = Vec::new();
    for i in 0..16 {
        let agent = agent.clone();
        handles.push(tokio::spawn(async move { agent.chat(&format!("q{i}")).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let history = agent.history().await;
    assert_eq!(history.len(), 32);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[1].role, MessageRole::Assistant);
        assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
    }
}

#[tokio::test]
async fn re_registration_replaces_description_in_prompt() {
    let llm = ScriptedLlm::default();
    let agent = agent_with(&llm);
    agent.register_tool(weather_tool()).await.unwrap();
    agent
        .register_tool(Arc::new(FnTool::new("weather", "Forecast for a city", |c: String, _| async move {
            anyhow::Ok(c)
        })))
        .await
        .unwrap();

    assert_eq!(agent.tool_names().await, vec!["weather"]);
    let prompt = agent.current_system_prompt().await;
    assert!(prompt.contains("weather: Forecast for a city"));
    assert!(!prompt.contains("Get current weather"));
}

#[tokio::test]
async fn streamed_reply_is_forwarded_and_recorded() {
    let llm = ScriptedLlm::new([Reply::text("streaming works fine")]);
    let agent = agent_with(&llm);
    let cancel = CancellationToken::new();

    let chunks: Vec<_> = agent.chat_stream("stream please", &cancel).collect().await;

    let text: String = chunks.iter().map(|c| c.as_ref().unwrap().content.clone()).collect();
    assert_eq!(chunks.len(), 3);
    assert_eq!(text, "streaming works fine");
    assert_eq!(
        agent.history().await,
        vec![Message::user("stream please"), Message::assistant("streaming works fine")]
    );
}

#[tokio::test]
async fn streamed_directive_continues_the_round_trip() {
    let llm = ScriptedLlm::new([Reply::text(WEATHER_CALL), Reply::text("Sunny and warm.")]);
    let agent = agent_with(&llm).with_tool(weather_tool()).unwrap();
    let cancel = CancellationToken::new();

    let chunks: Vec<_> = agent.chat_stream("weather?", &cancel).collect().await;

    let last = chunks.last().unwrap().as_ref().unwrap();
    assert_eq!(last.content, "Sunny and warm.");
    assert!(last.replaces_previous);
    assert!(chunks[..chunks.len() - 1].iter().all(|c| !c.as_ref().unwrap().replaces_previous));
    assert_eq!(llm.calls(), 2);
    assert_eq!(agent.history().await.last().unwrap(), &Message::assistant("Sunny and warm."));
}

#[tokio::test]
async fn streamed_failure_ends_with_error() {
    let llm = ScriptedLlm::new([Reply::unavailable()]);
    let agent = agent_with(&llm);
    let cancel = CancellationToken::new();

    let chunks: Vec<_> = agent.chat_stream("hello", &cancel).collect().await;

    assert_eq!(chunks.len(), 1);
    assert!(matches!(chunks[0], Err(AgentError::Service(_))));
    assert!(agent.history().await.is_empty());
}
