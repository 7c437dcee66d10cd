//! Read-eval-print loop over a [`TurnAccumulator`]

use super::accumulator::TurnAccumulator;
use anyhow::Result;
use colored::Colorize;
use newsdesk_core::TurnProcessor;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

/// Commands understood by the chat loop
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Exit,
    Clear,
    Message(&'a str),
}

fn parse_line(line: &str) -> ReplCommand<'_> {
    match line.trim() {
        "/exit" | "/quit" => ReplCommand::Exit,
        "/clear" => ReplCommand::Clear,
        _ => ReplCommand::Message(line),
    }
}

/// Read prompts from `input` until `/exit` or end of input, printing each
/// answer to `out`
pub async fn run_repl<P, R, W>(
    chat: &mut TurnAccumulator<P>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    P: TurnProcessor,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "{} ", "you>".bold().green())?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        match parse_line(&line) {
            ReplCommand::Exit => break,
            ReplCommand::Clear => {
                chat.clear();
                writeln!(out, "{}", "🧹 Conversation cleared".dimmed())?;
            }
            ReplCommand::Message(message) => {
                if message.trim().is_empty() {
                    continue;
                }
                let (transcript, history, _) = chat.respond(message).await;
                debug!("History now holds {} messages", history.len());
                if let Some(entry) = transcript.last() {
                    writeln!(out, "{} {}\n", "newsdesk>".bold().cyan(), entry.response)?;
                }
            }
        }
    }

    Ok(())
}
