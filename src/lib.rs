//! # Sales Copilot
//!
//! A conversational agent that answers natural-language questions about
//! sales data (monthly sales, top distributors, order history, employee
//! records) by calling read-only query tools against upstream HTTP APIs.
//!
//! This library provides:
//! - An HTTP API accepting chat turns and returning the answer plus a
//!   trace of the tool calls made to produce it
//! - A tool-based agent loop driving an external LLM
//! - A data-query tool with filtering, sorting, aggregation and
//!   payload-size guards so results fit in a model prompt
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a chat turn via the API
//! 2. Build context with system prompt and available tools
//! 3. Call LLM, parse response, execute any tool calls
//! 4. Feed results back to LLM, repeat until it answers in plain text
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_copilot::{config::Config, agent::Agent};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(config);
//! let outcome = agent.run_chat(&messages, CancellationToken::new()).await;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod history;
pub mod llm;
pub mod tools;

pub use config::Config;
