//! CLI command implementations

pub mod ask;
pub mod chat;
pub mod tools;

pub use ask::ask_command;
pub use chat::chat_command;
pub use tools::tools_command;

use crate::config::NewsdeskConfig;
use anyhow::{Context, Result};
use newsdesk_core::telemetry::TelemetrySink;
use newsdesk_core::{AgentBuilder, SseToolChannel, TurnExecutor};
use std::sync::Arc;
use tracing::info;

/// Build the turn executor for a resolved configuration
pub fn build_executor(
    config: NewsdeskConfig,
    sink: Option<Arc<dyn TelemetrySink>>,
) -> Result<TurnExecutor> {
    info!("🤖 Using protocol: {}", config.llm.protocol.as_str());
    info!("🤖 Using model: {}", config.llm.model);
    info!("🔌 MCP server: {}", config.mcp.url);

    let channel = SseToolChannel::new(config.mcp).context("Failed to create MCP channel")?;

    let mut builder = AgentBuilder::new(config.llm)
        .with_agent_config(config.agent)
        .with_channel(Arc::new(channel));
    if let Some(sink) = &sink {
        builder = builder.with_sink(sink.clone());
    }
    let session = builder.build().context("Failed to build agent session")?;

    let executor = TurnExecutor::new(Arc::new(session));
    Ok(match sink {
        Some(sink) => executor.with_sink(sink),
        None => executor,
    })
}
