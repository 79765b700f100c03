use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::traits::Tool;

/// Adapts an async closure into a [`Tool`].
///
/// ```no_run
/// use mini_chat_agent::tools::FnTool;
///
/// let weather = FnTool::new("weather", "Get current weather for a city", |city: String, _cancel| async move {
///     anyhow::Ok(format!("Sunny in {city}"))
/// });
/// ```
pub struct FnTool<F> {
    name: String,
    description: String,
    handler: F,
}

impl<F, Fut> FnTool<F>
where
    F: Fn(String, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            handler,
        }
    }
}

#[async_trait::async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(String, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, input: &str, cancel: CancellationToken) -> anyhow::Result<String> {
        (self.handler)(input.to_string(), cancel).await
    }
}
