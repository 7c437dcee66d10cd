//! Single question command

use crate::config::CliConfigLoader;
use anyhow::Result;
use newsdesk_core::telemetry::TelemetrySink;
use newsdesk_core::ConversationHistory;
use std::sync::Arc;
use tracing::info;

/// Answer one prompt and print the reply
pub async fn ask_command(
    prompt: String,
    config_loader: CliConfigLoader,
    sink: Option<Arc<dyn TelemetrySink>>,
) -> Result<()> {
    if prompt.trim().is_empty() {
        anyhow::bail!("Prompt cannot be empty");
    }

    let config = config_loader.load().await?;
    let executor = super::build_executor(config, sink)?;

    info!("Asking: {}", prompt);
    let outcome = executor
        .process_turn(&prompt, &ConversationHistory::new())
        .await;
    println!("{}", outcome.response);

    Ok(())
}
