//! Minimal configuration module for Newsdesk core
//!
//! Only exports pure data types. All loading logic is in CLI layer.

pub mod types;

pub use types::{
    McpServerConfig, ModelParams, Protocol, ResolvedLlmConfig, DEFAULT_MCP_CONNECT_TIMEOUT_SECS,
    DEFAULT_MCP_READ_TIMEOUT_SECS,
};
