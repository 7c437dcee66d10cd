//! Conversation records
//!
//! A conversation history is a list of these. Callers treat them as opaque;
//! only the agent loop and the model clients look inside.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    /// Results of tool calls requested by the previous assistant message
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },

    /// The model asks for a remote tool to be invoked
    ToolUse {
        /// Provider-assigned call id, echoed back in the matching result
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Outcome of one tool call, as text the model can read
    ToolResult {
        tool_use_id: String,
        is_error: bool,
        content: String,
    },
}

impl LlmMessage {
    fn text<S: Into<String>>(role: MessageRole, content: S) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::text(MessageRole::System, content)
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::text(MessageRole::User, content)
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::text(MessageRole::Assistant, content)
    }

    /// One message carrying a result for every tool call of a step
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::Blocks(results),
        }
    }

    /// Text parts of the message joined by newlines, `None` when there are none
    pub fn get_text(&self) -> Option<String> {
        let blocks = match &self.content {
            MessageContent::Text(text) => return Some(text.clone()),
            MessageContent::Blocks(blocks) => blocks,
        };

        let parts: Vec<&str> = blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n"))
    }

    pub fn has_tool_use(&self) -> bool {
        !self.get_tool_uses().is_empty()
    }

    pub fn get_tool_uses(&self) -> Vec<&ContentBlock> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
                .collect(),
        }
    }
}
