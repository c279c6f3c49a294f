//! Core agent loop implementation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{ChatMessage, LlmClient, LlmError, OpenRouterClient, Role};
use crate::tools::ToolRegistry;

use super::prompt::build_system_prompt;
use super::trace::{self, ToolTraceEntry};

/// Shown when the model provider rejects the request for volume.
const RATE_LIMIT_TEXT: &str =
    "I'm receiving too many requests right now. Please wait a moment and ask again.";

/// Shown for any other failure in the model request/response cycle.
const MODEL_FAILURE_TEXT: &str =
    "Sorry, I ran into a problem answering that. Please try asking again.";

/// Appended when the turn hits the tool-call round-trip limit.
const LOOP_LIMIT_TEXT: &str =
    "I had to stop before finishing: this question needed more tool calls than a single turn allows.";

/// How one chat turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The model produced a final text answer.
    Completed,
    /// The round-trip cap was reached; the text is best-effort partial.
    LoopLimitReached,
    /// The model request/response cycle failed; the text is canned.
    ModelFailure,
    /// The caller cancelled mid-turn; partial state was discarded.
    Cancelled,
}

/// Result of one chat turn: the answer plus the reconstructed tool trace.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub text: String,
    pub tools: Vec<ToolTraceEntry>,
    pub status: TurnStatus,
}

impl ChatOutcome {
    fn failed(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tools: Vec::new(),
            status: TurnStatus::ModelFailure,
        }
    }

    fn cancelled() -> Self {
        Self {
            text: String::new(),
            tools: Vec::new(),
            status: TurnStatus::Cancelled,
        }
    }
}

/// The conversational agent.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
}

impl Agent {
    /// Create a new agent with the given configuration.
    pub fn new(config: Config) -> Self {
        let llm = Arc::new(OpenRouterClient::with_base_url(
            config.api_key.clone(),
            config.llm_base_url.clone(),
        ));
        let tools = ToolRegistry::new(&config);

        Self { config, llm, tools }
    }

    /// Create an agent with a custom model client (useful for testing).
    pub fn with_client(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        let tools = ToolRegistry::new(&config);
        Self { config, llm, tools }
    }

    /// Run one chat turn to completion: call the model, execute any tool
    /// calls it requests, feed the results back, and repeat until it
    /// answers in plain text or a limit is hit.
    ///
    /// Never returns an error: model-layer failures become canned
    /// user-facing text with an empty tool list.
    pub async fn run_chat(
        &self,
        history: &[ChatMessage],
        cancel: CancellationToken,
    ) -> ChatOutcome {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage {
            role: Role::System,
            content: Some(build_system_prompt()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        });
        messages.extend_from_slice(history);

        // Trace reconstruction only considers messages this invocation adds.
        let turn_start = messages.len();
        let tool_schemas = self.tools.schemas();
        let mut answer_parts: Vec<String> = Vec::new();

        for iteration in 0..self.config.max_tool_iterations {
            if cancel.is_cancelled() {
                info!("chat turn cancelled before iteration {}", iteration + 1);
                return ChatOutcome::cancelled();
            }

            debug!("agent iteration {}", iteration + 1);

            let response = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("chat turn cancelled during model call");
                    return ChatOutcome::cancelled();
                }
                response = self.llm.chat_completion(
                    &self.config.default_model,
                    &messages,
                    Some(&tool_schemas),
                ) => match response {
                    Ok(response) => response,
                    Err(LlmError::RateLimited(detail)) => {
                        warn!(%detail, "model provider rate limited the turn");
                        return ChatOutcome::failed(RATE_LIMIT_TEXT);
                    }
                    Err(e) => {
                        warn!(error = %e, "model call failed");
                        return ChatOutcome::failed(MODEL_FAILURE_TEXT);
                    }
                },
            };

            if let Some(content) = &response.content {
                if !content.is_empty() {
                    answer_parts.push(content.clone());
                }
            }

            // Check for tool calls
            if let Some(tool_calls) = &response.tool_calls {
                if !tool_calls.is_empty() {
                    // Add assistant message with tool calls
                    messages.push(ChatMessage {
                        role: Role::Assistant,
                        content: response.content.clone(),
                        tool_calls: Some(tool_calls.clone()),
                        tool_call_id: None,
                        name: None,
                    });

                    // Execute each tool call sequentially, in emission
                    // order: every result must be attached before the
                    // turn is re-submitted.
                    for tool_call in tool_calls {
                        info!(
                            tool = %tool_call.function.name,
                            id = %tool_call.id,
                            "executing tool call"
                        );

                        let dispatch = self.tools.dispatch(
                            &tool_call.function.name,
                            tool_call.function.parsed_arguments(),
                        );
                        let result = tokio::select! {
                            _ = cancel.cancelled() => {
                                info!("chat turn cancelled during tool dispatch");
                                return ChatOutcome::cancelled();
                            }
                            result = dispatch => result,
                        };

                        let result_str = match result {
                            Ok(output) => output,
                            Err(e) => format!("Error: {}", e),
                        };

                        messages.push(ChatMessage {
                            role: Role::Tool,
                            content: Some(result_str),
                            tool_calls: None,
                            tool_call_id: (!tool_call.id.is_empty())
                                .then(|| tool_call.id.clone()),
                            name: Some(tool_call.function.name.clone()),
                        });
                    }

                    continue;
                }
            }

            // No tool calls - this is the final response
            let text = match response.content {
                Some(content) if !content.is_empty() => content,
                _ => MODEL_FAILURE_TEXT.to_string(),
            };
            return ChatOutcome {
                text,
                tools: trace::reconstruct(&messages[turn_start..]),
                status: TurnStatus::Completed,
            };
        }

        warn!(
            max = self.config.max_tool_iterations,
            "chat turn hit the tool-call round-trip limit"
        );
        let mut text = answer_parts.join("\n\n");
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(LOOP_LIMIT_TEXT);
        ChatOutcome {
            text,
            tools: trace::reconstruct(&messages[turn_start..]),
            status: TurnStatus::LoopLimitReached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, FunctionCall, ToolCall, ToolSchema};
    use crate::agent::trace::TraceState;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed sequence of completion results, then plain text.
    struct ScriptedClient {
        responses: Mutex<Vec<Result<CompletionResponse, LlmError>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<CompletionResponse, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolSchema]>,
        ) -> Result<CompletionResponse, LlmError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(CompletionResponse {
                    content: Some("done".to_string()),
                    tool_calls: None,
                })
            } else {
                responses.remove(0)
            }
        }
    }

    fn text_response(text: &str) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: Some(text.to_string()),
            tool_calls: None,
        })
    }

    fn tool_call_response(calls: Vec<(&str, &str, &str)>) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
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
        })
    }

    fn agent(responses: Vec<Result<CompletionResponse, LlmError>>) -> Agent {
        let config = Config::new("test-key".to_string(), "test-model".to_string());
        Agent::with_client(config, ScriptedClient::new(responses))
    }

    fn user_turn(text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: Role::User,
            content: Some(text.to_string()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }]
    }

    #[tokio::test]
    async fn plain_text_answer_completes_without_tools() {
        let agent = agent(vec![text_response("Sales were flat in May.")]);
        let outcome = agent
            .run_chat(&user_turn("How were sales?"), CancellationToken::new())
            .await;
        assert_eq!(outcome.status, TurnStatus::Completed);
        assert_eq!(outcome.text, "Sales were flat in May.");
        assert!(outcome.tools.is_empty());
    }

    #[tokio::test]
    async fn two_tool_calls_in_one_turn_yield_two_correlated_trace_entries() {
        let agent = agent(vec![
            tool_call_response(vec![
                ("call_1", "list_distributors", "{}"),
                ("call_2", "list_distributors", "{}"),
            ]),
            text_response("There are four distributors."),
        ]);
        let outcome = agent
            .run_chat(&user_turn("Who are our distributors?"), CancellationToken::new())
            .await;
        assert_eq!(outcome.status, TurnStatus::Completed);
        assert_eq!(outcome.text, "There are four distributors.");
        assert_eq!(outcome.tools.len(), 2);
        for entry in &outcome.tools {
            assert_eq!(entry.state, TraceState::OutputAvailable);
            assert!(entry.output.as_deref().unwrap().contains("10001515"));
        }
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_error_and_turn_still_completes() {
        let agent = agent(vec![
            tool_call_response(vec![("call_1", "bogus_tool", "{}")]),
            text_response("I could not use that tool."),
        ]);
        let outcome = agent
            .run_chat(&user_turn("hi"), CancellationToken::new())
            .await;
        assert_eq!(outcome.status, TurnStatus::Completed);
        assert_eq!(outcome.tools.len(), 1);
        assert!(outcome.tools[0]
            .output
            .as_deref()
            .unwrap()
            .contains("unknown tool"));
    }

    #[tokio::test]
    async fn upstream_configuration_error_still_reaches_done() {
        // monthly_sales has no URL configured; the tool returns an error
        // payload and the model gets to explain it.
        let agent = agent(vec![
            tool_call_response(vec![(
                "call_1",
                "query_sales_data",
                r#"{"endpoint":"monthly_sales","empId":1023}"#,
            )]),
            text_response("The monthly sales data is unavailable right now."),
        ]);
        let outcome = agent
            .run_chat(&user_turn("monthly sales?"), CancellationToken::new())
            .await;
        assert_eq!(outcome.status, TurnStatus::Completed);
        assert!(!outcome.text.is_empty());
        assert!(outcome.tools[0]
            .output
            .as_deref()
            .unwrap()
            .contains("not configured"));
    }

    #[tokio::test]
    async fn rate_limit_becomes_canned_message_with_empty_tools() {
        let agent = agent(vec![Err(LlmError::RateLimited("429".to_string()))]);
        let outcome = agent
            .run_chat(&user_turn("hi"), CancellationToken::new())
            .await;
        assert_eq!(outcome.status, TurnStatus::ModelFailure);
        assert_eq!(outcome.text, RATE_LIMIT_TEXT);
        assert!(outcome.tools.is_empty());
    }

    #[tokio::test]
    async fn other_model_failures_become_generic_apology() {
        let agent = agent(vec![Err(LlmError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        })]);
        let outcome = agent
            .run_chat(&user_turn("hi"), CancellationToken::new())
            .await;
        assert_eq!(outcome.status, TurnStatus::ModelFailure);
        assert_eq!(outcome.text, MODEL_FAILURE_TEXT);
    }

    #[tokio::test]
    async fn loop_limit_yields_explicit_terminal_state() {
        // The model keeps asking for tools and never answers.
        let responses: Vec<_> = (0..10)
            .map(|i| {
                let id = format!("call_{}", i);
                tool_call_response(vec![(id.as_str(), "list_distributors", "{}")])
            })
            .collect();
        let mut config = Config::new("test-key".to_string(), "test-model".to_string());
        config.max_tool_iterations = 2;
        let agent = Agent::with_client(config, ScriptedClient::new(responses));

        let outcome = agent
            .run_chat(&user_turn("hi"), CancellationToken::new())
            .await;
        assert_eq!(outcome.status, TurnStatus::LoopLimitReached);
        assert!(outcome.text.contains("stop before finishing"));
        assert_eq!(outcome.tools.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_discards_partial_state() {
        let agent = agent(vec![text_response("never delivered")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = agent.run_chat(&user_turn("hi"), cancel).await;
        assert_eq!(outcome.status, TurnStatus::Cancelled);
        assert!(outcome.text.is_empty());
        assert!(outcome.tools.is_empty());
    }
}
