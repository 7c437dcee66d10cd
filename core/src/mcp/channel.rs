//! Capability interface for a remote tool provider connection

use super::types::{CallToolResult, ToolDescriptor};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A connection to one remote tool provider.
///
/// Implementations use interior mutability so a channel can be shared as
/// `Arc<dyn ToolChannel>` between the agent and the caller.
#[async_trait]
pub trait ToolChannel: Send + Sync {
    /// Identity of the remote server (its URL), used in telemetry
    fn server_identity(&self) -> &str;

    /// Open the connection. Opening an open channel is a no-op.
    async fn connect(&self) -> Result<()>;

    /// Release the connection. Closing a closed channel is a no-op.
    async fn close(&self) -> Result<()>;

    /// Whether the connection is currently open
    async fn is_connected(&self) -> bool;

    /// Enumerate the tools the provider currently exposes
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool with the given arguments
    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult>;
}

#[async_trait]
impl<T: ToolChannel + ?Sized> ToolChannel for std::sync::Arc<T> {
    fn server_identity(&self) -> &str {
        (**self).server_identity()
    }

    async fn connect(&self) -> Result<()> {
        (**self).connect().await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }

    async fn is_connected(&self) -> bool {
        (**self).is_connected().await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        (**self).list_tools().await
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult> {
        (**self).call_tool(tool_name, arguments).await
    }
}
