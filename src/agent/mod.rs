//! Agent module - the core conversational agent logic.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build context with system prompt and conversation history
//! 2. Call LLM with available tools
//! 3. If LLM requests tool calls, execute them and feed results back
//! 4. Repeat until LLM produces a final answer or the round-trip cap hits
//!
//! After the loop, the messages it produced are folded into a per-call
//! tool trace for UI display.

mod agent_loop;
mod prompt;
mod trace;

pub use agent_loop::{Agent, ChatOutcome, TurnStatus};
pub use prompt::build_system_prompt;
pub use trace::{ToolTraceEntry, TraceState};
