//! MCP protocol types (JSON-RPC envelopes, tool descriptors, tool results)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol revision spoken by the SSE transport
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC request or notification
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    /// Absent for notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn request<S: Into<String>>(id: u64, method: S, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    pub fn notification<S: Into<String>>(method: S) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Numeric request id, if the server echoed one
    pub fn numeric_id(&self) -> Option<u64> {
        match self.id.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Descriptor of one tool exposed by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    pub fn new<S: Into<String>>(name: S, description: Option<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description,
            input_schema,
        }
    }

    /// Name suitable for logs; falls back to the descriptor's JSON form
    /// when the provider sent no name.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
        } else {
            self.name.clone()
        }
    }
}

/// `tools/list` result page
#[derive(Debug, Clone, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// One content item of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
    #[serde(other)]
    Unknown,
}

/// `tools/call` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(
        rename = "structuredContent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_content: Option<Value>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful result carrying a single text item
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            structured_content: None,
            is_error: false,
        }
    }

    /// Result the provider flagged as a tool-level error
    pub fn error<S: Into<String>>(text: S) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Text handed back to the model
    pub fn to_text(&self) -> String {
        let parts: Vec<String> = self
            .content
            .iter()
            .filter_map(|item| match item {
                ToolContent::Text { text } => Some(text.clone()),
                ToolContent::Resource { resource } => resource
                    .get("text")
                    .and_then(|t| t.as_str())
                    .map(str::to_string),
                ToolContent::Image { mime_type, .. } => Some(format!("[image: {}]", mime_type)),
                ToolContent::Unknown => None,
            })
            .collect();

        if parts.is_empty() {
            if let Some(structured) = &self.structured_content {
                return structured.to_string();
            }
        }
        parts.join("\n")
    }

    /// Shape of the payload: the JSON type of the structured content if
    /// present, otherwise the kind of the first content item.
    pub fn result_type(&self) -> &'static str {
        if let Some(structured) = &self.structured_content {
            return json_type_name(structured);
        }
        match self.content.first() {
            Some(ToolContent::Text { .. }) => "text",
            Some(ToolContent::Image { .. }) => "image",
            Some(ToolContent::Resource { .. }) => "resource",
            Some(ToolContent::Unknown) => "unknown",
            None => "empty",
        }
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
