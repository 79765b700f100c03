use std::io::{self, BufRead, Write};
use std::time::Duration;

use mini_chat_agent::prelude::*;

/// Line-based chat against a local Ollama. Configuration is read from
/// `mini-chat.toml` when present, with `MINI_CHAT_*` environment overrides.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mini_chat_agent::logging::init();

    let config = AppConfig::from_env_or_file("mini-chat.toml")?;
    let agent = Agent::from_config(&config)?;
    println!("chatting with {} ({}), empty line to quit", agent.name, config.backend.model());

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }

        let mut attempts = 0;
        loop {
            match agent.chat(&line).await {
                Ok(reply) => {
                    println!("{reply}");
                    break;
                }
                // the agent never retries on its own
                Err(e) if e.is_retryable() && attempts < 2 => {
                    attempts += 1;
                    eprintln!("retrying after error: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    break;
                }
            }
        }
        println!("[history: {} turns]", agent.history().await.len());
    }
    Ok(())
}
