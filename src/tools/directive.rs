//! Tool-call directives embedded in completion text.
//!
//! The model asks for tools by answering with
//! `{"tool_calls":[{"name":"weather","input":"NYC"}]}`, either as the whole
//! reply or somewhere inside it.

use serde::{Serialize, Deserialize};
use serde_json::Value;

/// A single tool call requested by the model.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CallInfo {
    pub name: String,
    #[serde(default)]
    pub input: String,
}

/// The format the model is instructed to use, as shown in the system prompt.
/// Literal: prompt bytes must not depend on serde_json key ordering.
pub const DIRECTIVE_EXAMPLE: &str = r#"{"tool_calls":[{"name":"tool_name","input":"tool input"}]}"#;

/// Extract the tool calls from a completion, or `None` for a plain text reply.
pub fn parse(generation: &str) -> Option<Vec<CallInfo>> {
    let parsed = serde_json::from_str::<Value>(generation.trim()).ok().or_else(|| {
        let start = generation.find('{')?;
        let end = generation.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<Value>(&generation[start..=end]).ok()
    })?;

    let calls: Vec<CallInfo> = parsed
        .get("tool_calls")?
        .as_array()?
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let name = obj.get("name")?.as_str()?.to_string();
            let input = match obj.get("input").or_else(|| obj.get("args")) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            Some(CallInfo { name, input })
        })
        .collect();

    if calls.is_empty() { None } else { Some(calls) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, input: &str) -> CallInfo {
        CallInfo { name: name.into(), input: input.into() }
    }

    #[test]
    fn plain_text_is_not_a_directive() {
        assert_eq!(parse("It is sunny today."), None);
        assert_eq!(parse("use {braces} freely"), None);
        assert_eq!(parse(r#"{"tool_calls": []}"#), None);
        assert_eq!(parse(r#"{"answer": 42}"#), None);
    }

    #[test]
    fn whole_reply_directive() {
        let calls = parse(r#"{"tool_calls":[{"name":"weather","input":"NYC"}]}"#);
        assert_eq!(calls, Some(vec![call("weather", "NYC")]));
    }

    #[test]
    fn directive_surrounded_by_prose() {
        let text = "Let me check.\n{\"tool_calls\": [{\"name\": \"weather\", \"input\": \"Paris\"}]}\nOne moment.";
        assert_eq!(parse(text), Some(vec![call("weather", "Paris")]));
    }

    #[test]
    fn args_object_becomes_compact_json_input() {
        let text = r#"{"tool_calls":[{"name":"calc","args":{"a":1,"b":2}},{"name":"ping"},{"input":"orphan"}]}"#;
        assert_eq!(parse(text), Some(vec![call("calc", r#"{"a":1,"b":2}"#), call("ping", "")]));
    }

    #[test]
    fn example_round_trips_through_parser() {
        assert_eq!(parse(DIRECTIVE_EXAMPLE), Some(vec![call("tool_name", "tool input")]));
    }
}
