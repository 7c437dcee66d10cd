//! Conversation turn executor
//!
//! One prompt in, one finished reply out. Every failure is turned into reply
//! text, and the tool channels are closed on every exit path.

use super::session::{AgentRun, AgentSession};
use crate::error::{AgentError, Error};
use crate::llm::LlmMessage;
use crate::telemetry::{preview, EventKind, TelemetryEvent, TelemetrySink};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

/// Reply prefix for failures talking to the tool or model provider
pub const PROVIDER_ERROR_PREFIX: &str = "Error communicating with MCP tool server: ";

/// Reply prefix for every other failure
pub const UNEXPECTED_ERROR_PREFIX: &str = "Unexpected error in chat processing: ";

const PROMPT_PREVIEW_CHARS: usize = 50;
const RESPONSE_PREVIEW_CHARS: usize = 200;

/// Message log carried from one turn to the next.
///
/// Callers should treat it as a black box: start from the default (empty)
/// value and replace it with the history returned by each turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory(Vec<LlmMessage>);

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<LlmMessage>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> &[LlmMessage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reply to one turn together with the history to use for the next one
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub response: String,
    /// Unchanged from the input when the turn failed
    pub history: ConversationHistory,
}

/// Anything that can answer a turn
#[async_trait]
pub trait TurnProcessor: Send + Sync {
    async fn process_turn(&self, prompt: &str, history: &ConversationHistory) -> TurnOutcome;
}

enum TurnFailure {
    Error(Error),
    Panic(String),
}

impl TurnFailure {
    fn response(&self) -> String {
        match self {
            TurnFailure::Error(e) if e.is_agent_run_error() => {
                format!("{}{}", PROVIDER_ERROR_PREFIX, e)
            }
            TurnFailure::Error(e) => format!("{}{}", UNEXPECTED_ERROR_PREFIX, e),
            TurnFailure::Panic(message) => format!("{}{}", UNEXPECTED_ERROR_PREFIX, message),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TurnFailure::Error(e) => e.kind(),
            TurnFailure::Panic(_) => "Panic",
        }
    }
}

/// Runs turns against a shared [`AgentSession`]
pub struct TurnExecutor {
    session: Arc<AgentSession>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl TurnExecutor {
    pub fn new(session: Arc<AgentSession>) -> Self {
        Self {
            session,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Answer `prompt`. Never fails: errors come back as the response text
    /// and leave the history untouched.
    pub async fn process_turn(&self, prompt: &str, history: &ConversationHistory) -> TurnOutcome {
        debug!("Processing chat prompt: '{}'", prompt);

        let span = info_span!("chat_with_agent", prompt = %prompt);
        match self.execute(prompt, history).instrument(span.clone()).await {
            Ok(run) => {
                let response_length = run.output.len();
                span.in_scope(|| {
                    info!(
                        response_length,
                        response_preview = %preview(&run.output, RESPONSE_PREVIEW_CHARS),
                        "Generated final response"
                    )
                });
                info!(
                    response_length,
                    steps = run.steps,
                    total_tokens = run.usage.total_tokens,
                    prompt = %preview(prompt, PROMPT_PREVIEW_CHARS),
                    "Chat processing completed"
                );
                self.emit(prompt, response_length, None);

                TurnOutcome {
                    response: run.output,
                    history: ConversationHistory(run.messages),
                }
            }
            Err(failure) => {
                let response = failure.response();
                error!(error_type = failure.kind(), "{}", response);
                self.emit(prompt, response.len(), Some(failure.kind()));

                TurnOutcome {
                    response,
                    history: history.clone(),
                }
            }
        }
    }

    async fn execute(
        &self,
        prompt: &str,
        history: &ConversationHistory,
    ) -> Result<AgentRun, TurnFailure> {
        if prompt.trim().is_empty() {
            return Err(TurnFailure::Error(
                AgentError::InvalidPrompt {
                    message: "prompt is blank".to_string(),
                }
                .into(),
            ));
        }

        let outcome = match self.session.open_channels().await {
            Ok(()) => {
                AssertUnwindSafe(self.session.run(prompt, history.messages()))
                    .catch_unwind()
                    .await
            }
            Err(e) => Ok(Err(e)),
        };

        self.session.close_channels().await;

        match outcome {
            Ok(Ok(run)) => Ok(run),
            Ok(Err(e)) => Err(TurnFailure::Error(e)),
            Err(panic) => Err(TurnFailure::Panic(panic_message(panic))),
        }
    }

    fn emit(&self, prompt: &str, response_length: usize, error_type: Option<&str>) {
        if let Some(sink) = &self.sink {
            sink.record(TelemetryEvent::new(EventKind::TurnComplete {
                prompt_preview: preview(prompt, PROMPT_PREVIEW_CHARS),
                response_length,
                success: error_type.is_none(),
                error_type: error_type.map(str::to_string),
            }));
        }
    }
}

#[async_trait]
impl TurnProcessor for TurnExecutor {
    async fn process_turn(&self, prompt: &str, history: &ConversationHistory) -> TurnOutcome {
        TurnExecutor::process_turn(self, prompt, history).await
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "agent panicked".to_string()
    }
}
