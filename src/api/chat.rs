//! Chat endpoint handler.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::TurnStatus;
use crate::llm::{ChatMessage, Role};

use super::types::{coerce_messages, ChatRequest, ChatResponse};
use super::AppState;

/// Header carrying the opaque thread id for checkpointed continuation.
pub const THREAD_ID_HEADER: &str = "x-thread-id";

/// Handle one chat turn.
///
/// When a thread id header is present, the thread's checkpointed history
/// is prepended to the incoming messages and the new turns (incoming
/// plus the assistant's answer) are checkpointed afterwards. Model-layer
/// failures come back as apology text with a 500.
pub(super) async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    let incoming = coerce_messages(&body.messages);
    let thread_id = headers
        .get(THREAD_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut turn_messages = Vec::new();
    if let Some(thread_id) = &thread_id {
        turn_messages.extend(state.threads.load(thread_id).await);
    }
    turn_messages.extend(incoming.iter().cloned());

    info!(
        incoming = incoming.len(),
        thread = thread_id.as_deref().unwrap_or("-"),
        "handling chat turn"
    );

    let outcome = state
        .agent
        .run_chat(&turn_messages, CancellationToken::new())
        .await;

    match outcome.status {
        TurnStatus::Completed | TurnStatus::LoopLimitReached => {
            if let Some(thread_id) = &thread_id {
                let mut new_turns = incoming;
                new_turns.push(ChatMessage {
                    role: Role::Assistant,
                    content: Some(outcome.text.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                    name: None,
                });
                state.threads.append(thread_id, &new_turns).await;
            }
            (
                StatusCode::OK,
                Json(ChatResponse {
                    text: outcome.text,
                    tools: outcome.tools,
                }),
            )
        }
        TurnStatus::ModelFailure => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ChatResponse {
                text: outcome.text,
                tools: Vec::new(),
            }),
        ),
        // The caller is gone; nothing is checkpointed.
        TurnStatus::Cancelled => (
            StatusCode::OK,
            Json(ChatResponse {
                text: outcome.text,
                tools: Vec::new(),
            }),
        ),
    }
}
