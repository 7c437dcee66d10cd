//! Interactive chat command

use crate::chat::{run_repl, TurnAccumulator};
use crate::config::CliConfigLoader;
use anyhow::Result;
use colored::Colorize;
use newsdesk_core::telemetry::TelemetrySink;
use std::sync::Arc;
use tokio::io::BufReader;

/// Start the chat loop on stdin/stdout
pub async fn chat_command(
    config_loader: CliConfigLoader,
    sink: Option<Arc<dyn TelemetrySink>>,
) -> Result<()> {
    let config = config_loader.load().await?;
    let executor = super::build_executor(config, sink)?;

    println!("{}", "📰 Newsdesk - ask about science news articles".bold());
    println!(
        "{}",
        "Type /clear to start over, /exit or Ctrl-D to quit.\n".dimmed()
    );

    let mut chat = TurnAccumulator::new(executor);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    run_repl(&mut chat, stdin, &mut stdout).await
}
