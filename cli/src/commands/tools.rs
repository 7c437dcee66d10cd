//! Tools listing command

use crate::config::CliConfigLoader;
use anyhow::Result;
use colored::Colorize;
use newsdesk_core::mcp::ToolChannel;
use newsdesk_core::{InstrumentedChannel, SseToolChannel};
use tracing::info;

/// Show the tools exposed by the configured MCP server
pub async fn tools_command(config_loader: CliConfigLoader) -> Result<()> {
    let config = config_loader.load().await?;
    info!("Listing tools from {}", config.mcp.url);

    let channel = InstrumentedChannel::new(SseToolChannel::new(config.mcp)?);
    let listed = match channel.connect().await {
        Ok(()) => channel.list_tools().await,
        Err(e) => Err(e),
    };
    channel.close().await?;
    let tools = listed?;

    println!("🛠️  Available Tools\n");
    if tools.is_empty() {
        println!("{}", "No tools available".yellow());
    }
    for tool in tools {
        println!("📦 {}", tool.display_name().bold());
        if let Some(description) = &tool.description {
            // Show first line of description only for brevity
            let first_line = description.lines().next().unwrap_or(description);
            println!("   {}\n", first_line);
        }
    }

    Ok(())
}
