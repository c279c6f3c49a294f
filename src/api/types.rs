//! API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::ToolTraceEntry;
use crate::llm::{ChatMessage, Role};

/// Request body for a chat turn.
///
/// `messages` is accepted as a raw value and coerced leniently: entries
/// failing the minimal shape check are silently dropped rather than
/// failing the request (see [`coerce_messages`]).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Value,
}

/// Response for a chat turn: the answer text plus the tool trace.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub text: String,

    pub tools: Vec<ToolTraceEntry>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Coerce the raw `messages` value into conversation turns.
///
/// A non-array value yields no turns. An entry survives only if it is an
/// object with a string `content` and a `role` of `user`, `assistant`,
/// or `system`; everything else is dropped without an error.
pub fn coerce_messages(raw: &Value) -> Vec<ChatMessage> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let role = match entry.get("role").and_then(Value::as_str) {
                Some("user") => Role::User,
                Some("assistant") => Role::Assistant,
                Some("system") => Role::System,
                _ => return None,
            };
            let content = entry.get("content").and_then(Value::as_str)?;
            Some(ChatMessage {
                role,
                content: Some(content.to_string()),
                tool_calls: None,
                tool_call_id: None,
                name: None,
            })
        })
        .collect()
}
