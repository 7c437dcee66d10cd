//! Model client seam and the request/response records it exchanges

use crate::config::ModelParams;
use crate::error::Result;
use crate::mcp::ToolDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::LlmMessage;

/// A chat-completion capable model.
///
/// One call yields one finished assistant message, which may request tool
/// calls. The agent loop decides what to do with them.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        options: Option<ChatOptions>,
    ) -> Result<LlmResponse>;

    /// Model identifier sent with each request
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub message: LlmMessage,
    pub usage: Option<Usage>,
    /// Model that actually served the request
    pub model: String,
    pub finish_reason: Option<FinishReason>,
}

/// Token accounting for one request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Fold another request's usage into this running total
    pub fn accumulate(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

/// A remote tool as the model sees it: an OpenAI-style function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments, taken from the provider's `inputSchema`
    pub parameters: Value,
}

impl From<&ToolDescriptor> for ToolDefinition {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone().unwrap_or_default(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

/// Sampling options forwarded to the model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl From<&ModelParams> for ChatOptions {
    fn from(params: &ModelParams) -> Self {
        Self {
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_from_descriptor() {
        let schema = json!({
            "type": "object",
            "properties": {"tag_names": {"type": "string"}},
            "required": ["tag_names"]
        });
        let tool = ToolDescriptor::new("search_articles_by_tag_names", None, schema.clone());

        let definition = ToolDefinition::from(&tool);
        assert_eq!(definition.tool_type, "function");
        assert_eq!(definition.function.name, "search_articles_by_tag_names");
        assert_eq!(definition.function.description, "");
        assert_eq!(definition.function.parameters, schema);
    }

    #[test]
    fn test_usage_accumulates() {
        let mut total = Usage::default();
        let step = Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        total.accumulate(&step);
        total.accumulate(&step);
        assert_eq!(total.total_tokens, 30);
        assert_eq!(total.prompt_tokens, 20);
    }
}
