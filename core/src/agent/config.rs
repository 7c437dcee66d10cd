//! Agent configuration structures

use super::prompt::NEWS_AGENT_SYSTEM_PROMPT;
use super::session::AgentSession;
use crate::config::{ModelParams, Protocol, ResolvedLlmConfig};
use crate::error::{ConfigError, Result};
use crate::llm::{LlmClient, OpenAiClient};
use crate::mcp::ToolChannel;
use crate::telemetry::TelemetrySink;
use crate::tools::ToolBinding;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Default cap on model requests per turn
pub const DEFAULT_MAX_STEPS: usize = 20;

/// Configuration for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Instruction text sent as the system message, verbatim
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum number of model requests in one turn
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    #[serde(default)]
    pub params: ModelParams,
}

fn default_system_prompt() -> String {
    NEWS_AGENT_SYSTEM_PROMPT.to_string()
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_steps: DEFAULT_MAX_STEPS,
            params: ModelParams::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.system_prompt.trim().is_empty() {
            return Err("System prompt cannot be empty".to_string());
        }
        if self.max_steps == 0 {
            return Err("max_steps must be greater than zero".to_string());
        }
        if let Some(temperature) = self.params.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }
        Ok(())
    }
}

/// Builder for creating agent sessions with resolved configuration
pub struct AgentBuilder {
    llm_config: Option<ResolvedLlmConfig>,
    llm_client: Option<Arc<dyn LlmClient>>,
    agent_config: AgentConfig,
    channels: Vec<Arc<dyn ToolChannel>>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl AgentBuilder {
    /// Builder that will talk to the model described by `llm_config`
    pub fn new(llm_config: ResolvedLlmConfig) -> Self {
        Self {
            llm_config: Some(llm_config),
            llm_client: None,
            agent_config: AgentConfig::default(),
            channels: Vec::new(),
            sink: None,
        }
    }

    /// Builder around an existing model client
    pub fn with_client(llm_client: Arc<dyn LlmClient>) -> Self {
        Self {
            llm_config: None,
            llm_client: Some(llm_client),
            agent_config: AgentConfig::default(),
            channels: Vec::new(),
            sink: None,
        }
    }

    pub fn with_agent_config(mut self, agent_config: AgentConfig) -> Self {
        self.agent_config = agent_config;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.agent_config.max_steps = max_steps;
        self
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.agent_config.system_prompt = system_prompt.into();
        self
    }

    /// Bind a tool channel. It is instrumented when the session is built.
    pub fn with_channel(mut self, channel: Arc<dyn ToolChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Deliver tool telemetry to `sink` in addition to tracing
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<AgentSession> {
        self.agent_config
            .validate()
            .map_err(|message| ConfigError::InvalidValue {
                field: "agent".to_string(),
                value: message,
            })?;

        let llm_client: Arc<dyn LlmClient> = match (self.llm_client, self.llm_config) {
            (Some(client), _) => client,
            (None, Some(config)) => {
                config
                    .validate()
                    .map_err(|message| ConfigError::InvalidValue {
                        field: "model".to_string(),
                        value: message,
                    })?;
                let client: Arc<dyn LlmClient> = match config.protocol {
                    Protocol::OpenAICompat => Arc::new(OpenAiClient::new(&config)?),
                };
                debug!(
                    protocol = config.protocol.as_str(),
                    model = %config.model,
                    "Created model client"
                );
                client
            }
            (None, None) => {
                return Err(ConfigError::MissingField {
                    field: "model".to_string(),
                }
                .into())
            }
        };

        let binding = ToolBinding::new(self.channels, self.sink);
        Ok(AgentSession::new(llm_client, binding, self.agent_config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{FakeToolChannel, ScriptedLlmClient};

    #[test]
    fn test_default_config_uses_news_prompt() {
        let config = AgentConfig::default();
        assert_eq!(config.system_prompt, NEWS_AGENT_SYSTEM_PROMPT);
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: AgentConfig = serde_json::from_str(r#"{"max_steps": 5}"#).unwrap();
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.system_prompt, NEWS_AGENT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_build_rejects_zero_steps() {
        let result = AgentBuilder::with_client(Arc::new(ScriptedLlmClient::new()))
            .with_max_steps(0)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_build_rejects_missing_api_key() {
        let config = ResolvedLlmConfig::new(
            Protocol::OpenAICompat,
            "https://api.openai.com/v1".to_string(),
            String::new(),
            "gpt-4.1-mini".to_string(),
        );
        assert!(AgentBuilder::new(config).build().is_err());
    }

    #[test]
    fn test_build_binds_channels() {
        let session = AgentBuilder::with_client(Arc::new(ScriptedLlmClient::new()))
            .with_channel(Arc::new(FakeToolChannel::news_server()))
            .with_system_prompt("Be brief.")
            .build()
            .unwrap();
        assert_eq!(session.binding().channels().len(), 1);
        assert_eq!(session.config().system_prompt, "Be brief.");
    }
}
