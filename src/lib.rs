pub mod llm;
pub mod tools;
pub mod agent;
pub mod memory;
pub mod message;
pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;

// lets `#[tool]` expand to `::mini_chat_agent::...` inside this crate's own tests
extern crate self as mini_chat_agent;

// re-export the proc-macro attribute for convenient use: `use mini_chat_agent::tool;` or `#[mini_chat_agent::tool(...)]`
pub use mini_chat_agent_macros::tool;

pub use tokio_util::sync::CancellationToken;

// paths the `#[tool]` expansion relies on
#[doc(hidden)]
pub use anyhow;
#[doc(hidden)]
pub use async_trait;
