//! HTTP API for the chat agent.
//!
//! One inbound surface: `POST /api/chat` takes `{messages: [{role,
//! content}]}` plus an optional `x-thread-id` header and returns
//! `{text, tools}` - the final answer and the tool-call trace behind it.
//! `GET /health` reports liveness.

mod chat;
mod types;

pub use types::{ChatRequest, ChatResponse, HealthResponse};

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::Agent;
use crate::config::Config;
use crate::history::{InMemoryThreadStore, ThreadStore};

/// Shared state for the API handlers.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub threads: Arc<dyn ThreadStore>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat::chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server and serve until shutdown.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        agent: Arc::new(Agent::new(config)),
        threads: Arc::new(InMemoryThreadStore::new()),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
