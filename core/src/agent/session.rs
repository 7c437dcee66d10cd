//! Agent session: the model generation loop over bound tool channels

use super::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::llm::{ChatOptions, ContentBlock, LlmClient, LlmMessage, MessageRole, Usage};
use crate::tools::ToolBinding;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Result of one completed agent run
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Final answer text
    pub output: String,

    /// Full message log: the input history followed by this run's messages
    pub messages: Vec<LlmMessage>,

    /// Number of model requests made
    pub steps: usize,

    pub usage: Usage,
}

/// A model, its instructions and its tool channels, bound together once
/// and reused for every turn
pub struct AgentSession {
    llm_client: Arc<dyn LlmClient>,
    binding: ToolBinding,
    config: AgentConfig,
}

impl AgentSession {
    pub fn new(llm_client: Arc<dyn LlmClient>, binding: ToolBinding, config: AgentConfig) -> Self {
        Self {
            llm_client,
            binding,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn binding(&self) -> &ToolBinding {
        &self.binding
    }

    pub fn model_name(&self) -> &str {
        self.llm_client.model_name()
    }

    /// Connect every bound channel
    pub async fn open_channels(&self) -> Result<()> {
        self.binding.open().await
    }

    /// Disconnect every bound channel
    pub async fn close_channels(&self) {
        self.binding.close().await
    }

    /// Answer `prompt` given the prior `history`.
    ///
    /// The channels must already be open. The model is asked repeatedly
    /// until it replies without requesting tools.
    pub async fn run(&self, prompt: &str, history: &[LlmMessage]) -> Result<AgentRun> {
        if prompt.trim().is_empty() {
            return Err(AgentError::InvalidPrompt {
                message: "prompt is blank".to_string(),
            }
            .into());
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        let needs_system_prompt = !history
            .first()
            .is_some_and(|m| m.role == MessageRole::System);
        if needs_system_prompt {
            messages.push(LlmMessage::system(self.config.system_prompt.clone()));
        }
        messages.extend_from_slice(history);
        messages.push(LlmMessage::user(prompt));

        let catalog = self.binding.discover().await;
        let tools = (!catalog.is_empty()).then(|| catalog.definitions());
        let options = ChatOptions::from(&self.config.params);
        let mut usage = Usage::default();

        for step in 1..=self.config.max_steps {
            debug!("🤖 Model request {} of {}", step, self.config.max_steps);

            let response = match self
                .llm_client
                .chat_completion(messages.clone(), tools.clone(), Some(options.clone()))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    error!("❌ LLM request failed for step {}: {}", step, e);
                    return Err(e);
                }
            };

            if let Some(step_usage) = &response.usage {
                usage.accumulate(step_usage);
            }

            let tool_uses: Vec<(String, String, Value)> = response
                .message
                .get_tool_uses()
                .into_iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            let output = final_text(&response.message);
            messages.push(response.message);

            if tool_uses.is_empty() {
                return Ok(AgentRun {
                    output,
                    messages,
                    steps: step,
                    usage,
                });
            }

            let mut results = Vec::with_capacity(tool_uses.len());
            for (id, name, input) in tool_uses {
                debug!("Tool call: {} (id: {})", name, id);
                results.push(self.binding.dispatch(&catalog, &id, &name, input).await?);
            }
            messages.push(LlmMessage::tool_results(results));
        }

        Err(AgentError::MaxStepsExceeded {
            max_steps: self.config.max_steps,
        }
        .into())
    }
}

/// Text of the final assistant message, falling back to its debug form
fn final_text(message: &LlmMessage) -> String {
    message
        .get_text()
        .unwrap_or_else(|| format!("{:?}", message.content))
}
