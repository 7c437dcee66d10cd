//! Error types and handling for Newsdesk Core

use thiserror::Error;

/// Result type alias for Newsdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Newsdesk Core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// LLM client errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// MCP tool provider communication errors
    #[error("{0}")]
    Mcp(#[from] McpError),

    /// Tool execution errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Agent execution errors
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Telemetry setup and recording errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },
}

/// LLM client errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Unexpected model response: {message}")]
    UnexpectedResponse { message: String },
}

/// Errors raised while talking to a remote MCP tool provider
#[derive(Error, Debug)]
pub enum McpError {
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("MCP server returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("MCP protocol error: {message}")]
    Protocol { message: String },

    #[error("MCP error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("MCP event stream closed: {reason}")]
    Closed { reason: String },

    #[error("MCP server '{server}' is not connected")]
    NotConnected { server: String },
}

/// Tool execution errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },
}

/// Agent execution errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Maximum steps exceeded: {max_steps}")]
    MaxStepsExceeded { max_steps: usize },

    #[error("Invalid prompt: {message}")]
    InvalidPrompt { message: String },
}

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {message}")]
    InitFailed { message: String },

    #[error("Failed to record telemetry: {message}")]
    RecordingFailed { message: String },
}

impl Error {
    /// Whether this error belongs to the agent-run class, i.e. a failure in
    /// communicating with the tool provider or the model provider.
    ///
    /// Everything else is an unclassified failure.
    pub fn is_agent_run_error(&self) -> bool {
        matches!(
            self,
            Error::Mcp(_)
                | Error::Llm(_)
                | Error::Http(_)
                | Error::Agent(AgentError::MaxStepsExceeded { .. })
        )
    }

    /// Stable label naming the failure kind, used as the `error_type`
    /// telemetry field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "ConfigError",
            Error::Llm(e) => match e {
                LlmError::Authentication { .. } => "LlmError::Authentication",
                LlmError::InvalidRequest { .. } => "LlmError::InvalidRequest",
                LlmError::ApiError { .. } => "LlmError::ApiError",
                LlmError::UnexpectedResponse { .. } => "LlmError::UnexpectedResponse",
            },
            Error::Mcp(e) => match e {
                McpError::Connect { .. } => "McpError::Connect",
                McpError::HttpStatus { .. } => "McpError::HttpStatus",
                McpError::Protocol { .. } => "McpError::Protocol",
                McpError::Rpc { .. } => "McpError::Rpc",
                McpError::Timeout { .. } => "McpError::Timeout",
                McpError::Closed { .. } => "McpError::Closed",
                McpError::NotConnected { .. } => "McpError::NotConnected",
            },
            Error::Tool(_) => "ToolError",
            Error::Agent(_) => "AgentError",
            Error::Telemetry(_) => "TelemetryError",
            Error::Io(_) => "IoError",
            Error::Serialization(_) => "SerializationError",
            Error::Http(_) => "HttpError",
            Error::Generic(_) => "Error",
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failures_are_agent_run_errors() {
        let err: Error = McpError::Connect {
            url: "http://localhost:1/sse".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        assert!(err.is_agent_run_error());
        assert_eq!(err.kind(), "McpError::Connect");

        let err: Error = AgentError::MaxStepsExceeded { max_steps: 3 }.into();
        assert!(err.is_agent_run_error());
    }

    #[test]
    fn test_other_failures_are_unclassified() {
        let err: Error = "boom".into();
        assert!(!err.is_agent_run_error());
        assert_eq!(err.to_string(), "boom");

        let err: Error = ToolError::NotFound {
            name: "missing".to_string(),
        }
        .into();
        assert!(!err.is_agent_run_error());

        let err: Error = AgentError::InvalidPrompt {
            message: "prompt is blank".to_string(),
        }
        .into();
        assert!(!err.is_agent_run_error());
    }

    #[test]
    fn test_mcp_error_display_is_unprefixed() {
        let err: Error = McpError::Rpc {
            code: -32601,
            message: "Method not found".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "MCP error -32601: Method not found");
    }
}
