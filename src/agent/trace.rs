//! Best-effort reconstruction of tool activity for UI display.
//!
//! The agent loop leaves behind a heterogeneous message list: assistant
//! messages carrying tool-call requests, and tool messages carrying
//! results. This module folds that stream back into one entry per call.
//!
//! Correlation is explicitly best-effort: a result attaches to a call by
//! exact identifier match when both sides carry one, otherwise to the
//! first same-named call still awaiting output (first-fit). Execution
//! paths that drop call identifiers can therefore mislabel which output
//! belongs to which of several same-named calls; entries with no
//! plausible match stay in the `input-available` state.

use serde::Serialize;
use serde_json::Value;

use crate::llm::{ChatMessage, Role};

/// Lifecycle state of a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceState {
    /// Request seen, result pending.
    InputAvailable,
    /// Result attached.
    OutputAvailable,
}

/// One reconstructed tool invocation: its input and, when correlated,
/// its output.
#[derive(Debug, Clone, Serialize)]
pub struct ToolTraceEntry {
    /// Call identifier, when the model supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    pub input: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    pub state: TraceState,
}

/// Scan the messages produced during one agent invocation (the caller
/// must exclude pre-existing history) and pair each tool-call request
/// with its result.
pub fn reconstruct(messages: &[ChatMessage]) -> Vec<ToolTraceEntry> {
    let mut entries: Vec<ToolTraceEntry> = Vec::new();

    for message in messages {
        match message.role {
            Role::Assistant => {
                let Some(calls) = &message.tool_calls else {
                    continue;
                };
                for call in calls {
                    let id = (!call.id.is_empty()).then(|| call.id.clone());
                    entries.push(ToolTraceEntry {
                        id,
                        name: call.function.name.clone(),
                        input: call.function.parsed_arguments(),
                        output: None,
                        state: TraceState::InputAvailable,
                    });
                }
            }
            Role::Tool => {
                if let Some(idx) = find_slot(&entries, message) {
                    entries[idx].output = Some(message.content.clone().unwrap_or_default());
                    entries[idx].state = TraceState::OutputAvailable;
                }
            }
            Role::User | Role::System => {}
        }
    }

    entries
}

/// Identifier match first; first-fit by name as the fallback. `None`
/// when the result has no plausible home.
fn find_slot(entries: &[ToolTraceEntry], result: &ChatMessage) -> Option<usize> {
    if let Some(call_id) = result.tool_call_id.as_deref().filter(|id| !id.is_empty()) {
        if let Some(idx) = entries
            .iter()
            .position(|e| e.output.is_none() && e.id.as_deref() == Some(call_id))
        {
            return Some(idx);
        }
    }
    let name = result.name.as_deref()?;
    entries
        .iter()
        .position(|e| e.output.is_none() && e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FunctionCall, ToolCall};

    fn call_message(calls: Vec<(&str, &str, &str)>) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(
                calls
                    .into_iter()
                    .map(|(id, name, args)| ToolCall {
                        id: id.to_string(),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: name.to_string(),
                            arguments: args.to_string(),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
            name: None,
        }
    }

    fn result_message(call_id: Option<&str>, name: Option<&str>, content: &str) -> ChatMessage {
        ChatMessage {
            role: Role::Tool,
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: call_id.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn pairs_by_exact_identifier() {
        let messages = vec![
            call_message(vec![
                ("call_a", "query_sales_data", r#"{"endpoint":"monthly_sales"}"#),
                ("call_b", "list_distributors", "{}"),
            ]),
            // results arrive out of order
            result_message(Some("call_b"), Some("list_distributors"), "ids"),
            result_message(Some("call_a"), Some("query_sales_data"), "rows"),
        ];
        let trace = reconstruct(&messages);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].output.as_deref(), Some("rows"));
        assert_eq!(trace[1].output.as_deref(), Some("ids"));
        assert!(trace.iter().all(|e| e.state == TraceState::OutputAvailable));
    }

    #[test]
    fn falls_back_to_first_fit_by_name() {
        let messages = vec![
            call_message(vec![
                ("", "query_sales_data", r#"{"topK":1}"#),
                ("", "query_sales_data", r#"{"topK":2}"#),
            ]),
            result_message(None, Some("query_sales_data"), "first result"),
            result_message(None, Some("query_sales_data"), "second result"),
        ];
        let trace = reconstruct(&messages);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].input["topK"], 1);
        assert_eq!(trace[0].output.as_deref(), Some("first result"));
        assert_eq!(trace[1].output.as_deref(), Some("second result"));
        assert!(trace[0].id.is_none());
    }

    #[test]
    fn unmatched_call_stays_pending_and_orphan_result_is_dropped() {
        let messages = vec![
            call_message(vec![("call_a", "query_sales_data", "{}")]),
            result_message(Some("call_z"), Some("some_other_tool"), "orphan"),
        ];
        let trace = reconstruct(&messages);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].state, TraceState::InputAvailable);
        assert!(trace[0].output.is_none());
    }

    #[test]
    fn identifier_match_wins_over_position() {
        let messages = vec![
            call_message(vec![
                ("call_a", "query_sales_data", "{}"),
                ("call_b", "query_sales_data", "{}"),
            ]),
            // addressed to the second call despite the first being open
            result_message(Some("call_b"), Some("query_sales_data"), "for b"),
        ];
        let trace = reconstruct(&messages);
        assert!(trace[0].output.is_none());
        assert_eq!(trace[1].output.as_deref(), Some("for b"));
    }

    #[test]
    fn undecodable_arguments_become_null_input() {
        let messages = vec![call_message(vec![("call_a", "query_sales_data", "not json")])];
        let trace = reconstruct(&messages);
        assert!(trace[0].input.is_null());
    }

    #[test]
    fn user_and_plain_assistant_messages_are_ignored() {
        let messages = vec![
            ChatMessage {
                role: Role::User,
                content: Some("question".to_string()),
                tool_calls: None,
                tool_call_id: None,
                name: None,
            },
            ChatMessage {
                role: Role::Assistant,
                content: Some("answer".to_string()),
                tool_calls: None,
                tool_call_id: None,
                name: None,
            },
        ];
        assert!(reconstruct(&messages).is_empty());
    }
}
