//! Configuration types for Newsdesk core
//!
//! Core only accepts fully resolved, validated configuration.
//! All discovery, loading, and merging happens in CLI layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default connect timeout for MCP servers, in seconds
pub const DEFAULT_MCP_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default read timeout for the MCP event stream, in seconds
pub const DEFAULT_MCP_READ_TIMEOUT_SECS: u64 = 600;

/// Wire protocol spoken by the model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// OpenAI chat completions, including compatible proxies and local servers
    #[serde(rename = "openai_compat", alias = "openai")]
    OpenAICompat,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::OpenAICompat => "openai_compat",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Protocol::OpenAICompat => "https://api.openai.com/v1",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "openai_compat" => Ok(Protocol::OpenAICompat),
            other => Err(format!("unsupported protocol '{}'", other)),
        }
    }
}

/// Model parameters for LLM requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Top-p sampling parameter
    pub top_p: Option<f32>,
}

/// A fully resolved LLM configuration ready for use by core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLlmConfig {
    /// The protocol to use
    pub protocol: Protocol,
    /// Base URL for the API
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Model name/identifier
    pub model: String,
    /// Model parameters
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers for requests
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ResolvedLlmConfig {
    /// Create a new resolved LLM config
    pub fn new(protocol: Protocol, base_url: String, api_key: String, model: String) -> Self {
        Self {
            protocol,
            base_url,
            api_key,
            model,
            params: ModelParams::default(),
            headers: HashMap::new(),
        }
    }

    /// Set model parameters
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Add multiple headers
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API key cannot be empty".to_string());
        }

        if self.model.is_empty() {
            return Err("Model name cannot be empty".to_string());
        }

        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !is_http_url(&self.base_url) {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if let Some(temp) = self.params.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if let Some(top_p) = self.params.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err("Top-p must be between 0.0 and 1.0".to_string());
            }
        }

        Ok(())
    }
}

/// Connection settings for a remote MCP tool server reached over HTTP+SSE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Display name used in logs
    #[serde(default = "default_server_name")]
    pub name: String,
    /// URL of the server's SSE endpoint
    pub url: String,
    /// Timeout for establishing the connection and the endpoint handshake
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Maximum silence tolerated on the event stream, and the bound on each
    /// request's wait for its response
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Additional headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_server_name() -> String {
    "news-search".to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_MCP_CONNECT_TIMEOUT_SECS
}

fn default_read_timeout() -> u64 {
    DEFAULT_MCP_READ_TIMEOUT_SECS
}

impl McpServerConfig {
    /// Create a config for the given URL with the default timeouts
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            name: default_server_name(),
            url: url.into(),
            connect_timeout_secs: DEFAULT_MCP_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_MCP_READ_TIMEOUT_SECS,
            headers: HashMap::new(),
        }
    }

    /// Set both transport timeouts
    pub fn with_timeouts(mut self, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        self.connect_timeout_secs = connect_timeout_secs;
        self.read_timeout_secs = read_timeout_secs;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("MCP server URL cannot be empty".to_string());
        }

        if !is_http_url(&self.url) {
            return Err("MCP server URL must start with http:// or https://".to_string());
        }

        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err("MCP timeouts must be greater than zero".to_string());
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
