use tokio_util::sync::CancellationToken;

/// A named, described function the model may ask the agent to run.
///
/// `run` receives the raw string input from the tool-call directive and the
/// cancellation token of the enclosing `chat` call. Long-running handlers
/// should watch the token; the agent also stops awaiting them once it fires.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, input: &str, cancel: CancellationToken) -> anyhow::Result<String>;
}
