//! LLM client abstraction.
//!
//! Wire types for the chat-completions protocol (role-tagged messages,
//! tool schemas, tool calls) plus the `LlmClient` trait the agent loop
//! drives. Failures are classified into `LlmError` kinds at this
//! boundary so callers never have to inspect error message text.

mod openrouter;

pub use openrouter::OpenRouterClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Message role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation, in chat-completions wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Set on `Role::Tool` messages: the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Set on `Role::Tool` messages: the tool that produced the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A tool call emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier. Some execution paths deliver calls without one;
    /// treat an empty string as absent.
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type", default = "function_call_type")]
    pub call_type: String,

    pub function: FunctionCall,
}

fn function_call_type() -> String {
    "function".to_string()
}

/// The function half of a tool call: name plus string-encoded arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    /// JSON-encoded argument object, exactly as the model produced it.
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Normalize the string-encoded arguments to a structured value.
    /// Undecodable arguments become `Value::Null`.
    pub fn parsed_arguments(&self) -> Value {
        serde_json::from_str(&self.arguments).unwrap_or(Value::Null)
    }
}

/// A tool advertised to the model, chat-completions style.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: &'static str,

    pub function: FunctionSchema,
}

/// Name, description and JSON Schema parameters of one tool.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionSchema {
    pub name: &'static str,

    pub description: &'static str,

    pub parameters: Value,
}

/// The assistant turn returned from a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content (may be absent if the model only called tools).
    pub content: Option<String>,

    /// Tool calls requested by the model, in emission order.
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Failures talking to the model, classified so the agent loop can react
/// to the kind without sniffing message strings.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model provider rate limited the request: {0}")]
    RateLimited(String),

    #[error("model API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

/// Chat-completions client driven by the agent loop.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the conversation and available tools, returning the model's
    /// next turn (text and/or tool calls).
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<CompletionResponse, LlmError>;
}
