//! # Newsdesk Core
//!
//! Core library for Newsdesk - a chat front-end that answers questions about
//! a news article corpus.
//!
//! This library bridges a language model and a remote MCP tool server: it
//! manages the tool channel for each conversation turn, runs the model's
//! tool-calling loop, instruments every tool invocation, and turns every
//! failure into a reply the user can read.

// Core modules
pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod telemetry;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use agent::{
    AgentBuilder, AgentConfig, AgentSession, ConversationHistory, TurnExecutor, TurnOutcome,
    TurnProcessor,
};
pub use config::{McpServerConfig, ModelParams, Protocol, ResolvedLlmConfig};
pub use error::{Error, Result};
pub use mcp::{InstrumentedChannel, SseToolChannel, ToolChannel};
pub use telemetry::{init_tracing, TelemetryConfig, TelemetryGuard, TelemetryRecorder};

/// Current version of the newsdesk-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
