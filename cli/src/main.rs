//! # newsdesk CLI
//!
//! Command-line chat front-end answering questions about a news article
//! corpus through an MCP tool server.
//!
//! ## Usage
//!
//! - `newsdesk` or `newsdesk chat` - Start an interactive chat
//! - `newsdesk ask "question"` - Answer a single question
//! - `newsdesk tools` - Show the tools the MCP server exposes

use anyhow::Result;
use clap::{Parser, Subcommand};
use newsdesk_core::telemetry::{LogFormat, TelemetrySink};
use newsdesk_core::{init_tracing, TelemetryConfig, TelemetryRecorder};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod chat;
mod commands;
mod config;

use commands::{ask_command, chat_command, tools_command};
use config::CliConfigLoader;

/// newsdesk - chat with a news article corpus
#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat about news articles, backed by an MCP tool server")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API key override
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL override
    #[arg(long)]
    base_url: Option<String>,

    /// Model name override
    #[arg(long)]
    model: Option<String>,

    /// MCP server SSE URL override
    #[arg(long)]
    mcp_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log line format (text or json)
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Record tool and turn telemetry as JSON in this file
    #[arg(long)]
    telemetry_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,

    /// Answer a single question
    Ask {
        /// The question to answer
        prompt: String,
    },

    /// Show available tools
    Tools,
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(api_key) = &cli.api_key {
        loader = loader.with_api_key_override(api_key.clone());
    }

    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }

    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }

    if let Some(mcp_url) = &cli.mcp_url {
        loader = loader.with_mcp_url_override(mcp_url.clone());
    }

    loader
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let telemetry = TelemetryConfig::default()
        .verbose(cli.verbose)
        .with_format(cli.log_format)
        .with_log_file(cli.log_file.clone());
    let mut guard = init_tracing(telemetry)?;

    let sink: Option<Arc<dyn TelemetrySink>> = cli
        .telemetry_file
        .as_ref()
        .map(|path| Arc::new(TelemetryRecorder::with_file(path)) as Arc<dyn TelemetrySink>);
    if let Some(sink) = &sink {
        guard = guard.with_sink(sink.clone());
    }

    let config_loader = build_config_loader(&cli);

    let result = match cli.command {
        Some(Commands::Ask { prompt }) => ask_command(prompt, config_loader, sink).await,
        Some(Commands::Tools) => tools_command(config_loader).await,
        Some(Commands::Chat) | None => chat_command(config_loader, sink).await,
    };

    // Flush buffered telemetry on every exit path
    info!("Shutting down telemetry");
    if let Err(e) = guard.shutdown().await {
        eprintln!("Failed to flush telemetry: {}", e);
    }

    result
}
