use mini_chat_agent::prelude::*;
use std::sync::Arc;

// Use the proc-macro attribute to generate the Tool implementation
#[tool(
    name = "weather",
    description = "Get current weather for a city"
)]
fn get_weather(city: String) -> String {
    format!("Sunny in {}, 72°F (mocked).", city)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mini_chat_agent::logging::init();

    // Adjust model name to one available in your Ollama server.
    let ollama = Ollama::default().with_model("qwen3:8b");
    let llm = llm_to_arc_dyn(ollama);

    let agent = Agent::new("weather-assistant", llm)
        .with_system_prompt("You are a weather assistant. Use the tools when they help, otherwise answer directly.")
        .with_tool(Arc::new(GetWeatherTool))?;

    // Ask the model for the weather so it should request the `weather` tool.
    let prompt = "What's the weather in NYC?";

    match agent.call_llm(prompt, &CancellationToken::new()).await {
        Ok(res) => {
            println!("generation: {}", res.generation);
            println!("tools used: {:?}", res.tool_calls);
            println!("tokens: {:?}", res.tokens);
        }
        Err(e) => eprintln!("agent error: {e}"),
    }
    Ok(())
}
