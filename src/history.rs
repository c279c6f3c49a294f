//! Conversation checkpointing keyed by an opaque thread identifier.
//!
//! The chat API does not persist conversations itself; continuity is
//! delegated to a `ThreadStore` collaborator looked up by the thread id
//! the caller supplies. Concurrent requests for the same thread id are
//! serialized by the store's own lock, not by the agent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::llm::ChatMessage;

/// One checkpointed conversation turn.
#[derive(Debug, Clone)]
pub struct StoredTurn {
    /// Opaque turn identifier.
    pub id: Uuid,

    /// Creation timestamp. Turns are immutable once stored.
    pub created_at: DateTime<Utc>,

    pub message: ChatMessage,
}

/// External checkpoint store for conversation threads.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Load the checkpointed messages for a thread, oldest first.
    /// Unknown thread ids yield an empty history.
    async fn load(&self, thread_id: &str) -> Vec<ChatMessage>;

    /// Append messages to a thread's checkpoint, stamping each with an
    /// identifier and creation time.
    async fn append(&self, thread_id: &str, messages: &[ChatMessage]);
}

/// In-memory thread store (non-persistent).
#[derive(Clone, Default)]
pub struct InMemoryThreadStore {
    threads: Arc<RwLock<HashMap<String, Vec<StoredTurn>>>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn load(&self, thread_id: &str) -> Vec<ChatMessage> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map(|turns| turns.iter().map(|t| t.message.clone()).collect())
            .unwrap_or_default()
    }

    async fn append(&self, thread_id: &str, messages: &[ChatMessage]) {
        let mut threads = self.threads.write().await;
        let turns = threads.entry(thread_id.to_string()).or_default();
        for message in messages {
            turns.push(StoredTurn {
                id: Uuid::new_v4(),
                created_at: Utc::now(),
                message: message.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn user_message(text: &str) -> ChatMessage {
        ChatMessage {
            role: Role::User,
            content: Some(text.to_string()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    #[tokio::test]
    async fn append_then_load_round_trips_in_order() {
        let store = InMemoryThreadStore::new();
        store
            .append("thread-1", &[user_message("first"), user_message("second")])
            .await;
        store.append("thread-1", &[user_message("third")]).await;

        let history = store.load("thread-1").await;
        let contents: Vec<_> = history.iter().filter_map(|m| m.content.as_deref()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let store = InMemoryThreadStore::new();
        store.append("a", &[user_message("for a")]).await;
        store.append("b", &[user_message("for b")]).await;

        assert_eq!(store.load("a").await.len(), 1);
        assert_eq!(store.load("b").await.len(), 1);
        assert!(store.load("missing").await.is_empty());
    }
}
