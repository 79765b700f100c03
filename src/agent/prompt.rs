//! System prompt assembly. Pure: the same instructions, tools and history
//! always produce byte-identical output.

use std::sync::Arc;

use crate::message::Message;
use crate::tools::{directive, Tool};

/// Build the system instruction for one exchange.
///
/// Sections, separated by a blank line and omitted when empty:
/// the agent instructions, the tool list (`name: description`, registration
/// order) with the directive format, and the history window as
/// `role: content` lines, oldest first.
pub fn build_system_prompt<'a>(
    instructions: Option<&str>,
    tools: &[Arc<dyn Tool>],
    history: impl IntoIterator<Item = &'a Message>,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    if let Some(instructions) = instructions.map(str::trim).filter(|s| !s.is_empty()) {
        sections.push(instructions.to_string());
    }

    if !tools.is_empty() {
        let mut section = String::from("You have access to the following tools:\n");
        for tool in tools {
            section.push_str(&format!("{}: {}\n", tool.name().trim(), tool.description().trim()));
        }
        section.push_str(&format!(
            "To call a tool, reply with only this JSON: {}\n\
             After you receive the tool results, answer the user in plain text without tool_calls.",
            directive::DIRECTIVE_EXAMPLE
        ));
        sections.push(section);
    }

    let transcript: Vec<String> = history
        .into_iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect();
    if !transcript.is_empty() {
        sections.push(format!("Conversation so far:\n{}", transcript.join("\n")));
    }

    sections.join("\n\n")
}
