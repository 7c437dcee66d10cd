//! Association between the model runtime and its tool channels
//!
//! Each bound channel is wrapped in an [`InstrumentedChannel`]. The catalog
//! is fetched fresh for every run; nothing about it is cached.

use crate::error::{Result, ToolError};
use crate::llm::{ContentBlock, ToolDefinition};
use crate::mcp::{InstrumentedChannel, ToolChannel, ToolDescriptor};
use crate::telemetry::TelemetrySink;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A bound, instrumented tool channel
pub type BoundChannel = InstrumentedChannel<Arc<dyn ToolChannel>>;

/// Tools discovered across all bound channels at one point in time
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
    owners: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Function definitions handed to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(ToolDefinition::from)
            .collect()
    }

    fn owner(&self, tool_name: &str) -> Option<usize> {
        self.owners.get(tool_name).copied()
    }
}

/// The set of tool channels available to one agent
pub struct ToolBinding {
    channels: Vec<BoundChannel>,
}

impl ToolBinding {
    pub fn new(channels: Vec<Arc<dyn ToolChannel>>, sink: Option<Arc<dyn TelemetrySink>>) -> Self {
        let channels = channels
            .into_iter()
            .map(|channel| {
                let instrumented = InstrumentedChannel::new(channel);
                match &sink {
                    Some(sink) => instrumented.with_sink(sink.clone()),
                    None => instrumented,
                }
            })
            .collect();
        Self { channels }
    }

    /// Binding with exactly one channel
    pub fn single(channel: Arc<dyn ToolChannel>, sink: Option<Arc<dyn TelemetrySink>>) -> Self {
        Self::new(vec![channel], sink)
    }

    pub fn channels(&self) -> &[BoundChannel] {
        &self.channels
    }

    /// Open every channel, stopping at the first failure
    pub async fn open(&self) -> Result<()> {
        for channel in &self.channels {
            channel.connect().await?;
        }
        Ok(())
    }

    /// Close every channel. Failures are logged, never returned.
    pub async fn close(&self) {
        for channel in &self.channels {
            if let Err(e) = channel.close().await {
                warn!(
                    server_url = channel.server_identity(),
                    error = %e,
                    "Failed to close MCP channel"
                );
            }
        }
    }

    /// Fetch the current tool catalog from every channel.
    ///
    /// A channel whose listing fails contributes no tools. When two
    /// channels expose the same name the first one wins.
    pub async fn discover(&self) -> ToolCatalog {
        let mut catalog = ToolCatalog::default();

        for (index, channel) in self.channels.iter().enumerate() {
            for tool in channel.list_tools().await.unwrap_or_default() {
                if tool.name.trim().is_empty() {
                    debug!("Skipping unnamed tool from {}", channel.server_identity());
                    continue;
                }
                if catalog.owners.contains_key(&tool.name) {
                    warn!(
                        "Tool '{}' from {} shadowed by an earlier channel",
                        tool.name,
                        channel.server_identity()
                    );
                    continue;
                }
                catalog.owners.insert(tool.name.clone(), index);
                catalog.tools.push(tool);
            }
        }

        catalog
    }

    /// Execute one tool call requested by the model.
    ///
    /// Unknown tools and provider-flagged failures become error results the
    /// model can read; transport failures are returned as errors.
    pub async fn dispatch(
        &self,
        catalog: &ToolCatalog,
        tool_use_id: &str,
        tool_name: &str,
        input: Value,
    ) -> Result<ContentBlock> {
        let Some(channel) = catalog.owner(tool_name).and_then(|i| self.channels.get(i)) else {
            warn!("Model requested unknown tool '{}'", tool_name);
            return Ok(ContentBlock::ToolResult {
                tool_use_id: tool_use_id.to_string(),
                is_error: true,
                content: ToolError::NotFound {
                    name: tool_name.to_string(),
                }
                .to_string(),
            });
        };

        let arguments = match input {
            Value::Null => json!({}),
            other => other,
        };

        let result = channel.call_tool(tool_name, arguments).await?;
        Ok(ContentBlock::ToolResult {
            tool_use_id: tool_use_id.to_string(),
            is_error: result.is_error,
            content: result.to_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, McpError};
    use crate::mcp::CallToolResult;
    use crate::testing::FakeToolChannel;

    #[tokio::test]
    async fn test_discover_builds_definitions() {
        let fake: Arc<dyn ToolChannel> = Arc::new(FakeToolChannel::news_server());
        let binding = ToolBinding::single(fake, None);
        binding.open().await.unwrap();

        let catalog = binding.discover().await;
        assert_eq!(catalog.len(), 3);

        let definitions = catalog.definitions();
        assert_eq!(definitions[0].function.name, "search_articles_by_tag_names");
        assert_eq!(definitions[0].tool_type, "function");
        assert!(definitions[0].function.parameters["properties"]
            .get("tag_names")
            .is_some());
    }

    #[tokio::test]
    async fn test_first_channel_wins_on_duplicate_names() {
        let first = Arc::new(FakeToolChannel::news_server().with_result(
            "make_hashed_link",
            CallToolResult::text("from first"),
        ));
        let second = Arc::new(
            FakeToolChannel::new("http://mirror/sse")
                .with_tool("make_hashed_link", "Mirror hashing")
                .with_result("make_hashed_link", CallToolResult::text("from second")),
        );
        let binding = ToolBinding::new(vec![first, second.clone()], None);
        binding.open().await.unwrap();

        let catalog = binding.discover().await;
        assert_eq!(catalog.len(), 3);

        let block = binding
            .dispatch(&catalog, "call_1", "make_hashed_link", json!({"link": "x"}))
            .await
            .unwrap();
        assert_eq!(
            block,
            ContentBlock::ToolResult {
                tool_use_id: "call_1".to_string(),
                is_error: false,
                content: "from first".to_string(),
            }
        );
        assert!(second.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_error_result() {
        let binding = ToolBinding::single(Arc::new(FakeToolChannel::news_server()), None);
        binding.open().await.unwrap();
        let catalog = binding.discover().await;

        let block = binding
            .dispatch(&catalog, "call_9", "delete_everything", Value::Null)
            .await
            .unwrap();
        match block {
            ContentBlock::ToolResult { is_error, content, .. } => {
                assert!(is_error);
                assert!(content.contains("delete_everything"));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_propagates_transport_errors() {
        let fake = FakeToolChannel::news_server().with_rpc_error(
            "search_articles_by_tag_names",
            -32603,
            "internal error",
        );
        let binding = ToolBinding::single(Arc::new(fake), None);
        binding.open().await.unwrap();
        let catalog = binding.discover().await;

        let err = binding
            .dispatch(
                &catalog,
                "call_2",
                "search_articles_by_tag_names",
                json!({"tag_names": "space"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Mcp(McpError::Rpc { code: -32603, .. })));
    }

    #[tokio::test]
    async fn test_close_closes_every_channel() {
        let first = Arc::new(FakeToolChannel::news_server());
        let second = Arc::new(FakeToolChannel::new("http://other/sse"));
        let binding = ToolBinding::new(vec![first.clone(), second.clone()], None);

        binding.open().await.unwrap();
        binding.close().await;

        assert_eq!(first.close_count(), 1);
        assert_eq!(second.close_count(), 1);
        assert!(!first.is_connected().await);
    }
}
