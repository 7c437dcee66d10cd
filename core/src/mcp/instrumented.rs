//! Observability decorator for tool channels
//!
//! [`InstrumentedChannel`] wraps any [`ToolChannel`] and brackets its two
//! operations with `tracing` spans. Contracts are unchanged except that
//! listing is fail-soft: a failed enumeration is logged and reported as an
//! empty catalog.

use super::channel::ToolChannel;
use super::types::{CallToolResult, ToolDescriptor};
use crate::error::{Error, Result};
use crate::telemetry::{preview, EventKind, TelemetryEvent, TelemetrySink};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::field::Empty;
use tracing::{error, info, info_span, Instrument, Span};

/// Maximum number of characters of a tool result included in log events
pub const RESULT_PREVIEW_CHARS: usize = 200;

/// One tool call as seen by the instrumentation layer.
///
/// Lives only for the duration of the call.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: Value,
    pub server_identity: String,
}

impl ToolInvocation {
    pub fn new(tool_name: &str, arguments: &Value, server_identity: &str) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            arguments: arguments.clone(),
            server_identity: server_identity.to_string(),
        }
    }

    fn span(&self) -> Span {
        info_span!(
            "mcp_tool_call",
            tool_name = %self.tool_name,
            server_url = %self.server_identity,
            arguments = %self.arguments,
            success = Empty,
            result_size = Empty,
            result_type = Empty,
            error = Empty,
            error_type = Empty,
        )
    }

    fn succeeded(&self, span: &Span, result: &CallToolResult, elapsed: Duration) -> EventKind {
        let text = result.to_text();
        let result_size = text.len();
        let result_type = result.result_type();

        span.record("success", true);
        span.record("result_size", result_size);
        span.record("result_type", result_type);
        span.in_scope(|| {
            info!(
                tool_name = %self.tool_name,
                result_size,
                result_type,
                is_error = result.is_error,
                preview = %preview(&text, RESULT_PREVIEW_CHARS),
                "✅ MCP tool call succeeded"
            )
        });

        self.event(elapsed, true, Some(result_size), Some(result_type), None)
    }

    fn failed(&self, span: &Span, err: &Error, elapsed: Duration) -> EventKind {
        let message = err.to_string();

        span.record("success", false);
        span.record("error", message.as_str());
        span.record("error_type", err.kind());
        span.in_scope(|| {
            error!(
                tool_name = %self.tool_name,
                error = %message,
                error_type = err.kind(),
                "❌ MCP tool call failed"
            )
        });

        self.event(elapsed, false, None, None, Some((message, err.kind())))
    }

    fn event(
        &self,
        elapsed: Duration,
        success: bool,
        result_size: Option<usize>,
        result_type: Option<&str>,
        failure: Option<(String, &str)>,
    ) -> EventKind {
        let (error, error_type) = match failure {
            Some((message, kind)) => (Some(message), Some(kind.to_string())),
            None => (None, None),
        };
        EventKind::ToolCall {
            tool_name: self.tool_name.clone(),
            server_url: self.server_identity.clone(),
            arguments: self.arguments.clone(),
            success,
            result_size,
            result_type: result_type.map(str::to_string),
            error,
            error_type,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// A tool channel with structured telemetry around every operation
pub struct InstrumentedChannel<C> {
    inner: C,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl<C: ToolChannel> InstrumentedChannel<C> {
    pub fn new(inner: C) -> Self {
        Self { inner, sink: None }
    }

    /// Also deliver events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn emit(&self, kind: EventKind) {
        if let Some(sink) = &self.sink {
            sink.record(TelemetryEvent::new(kind));
        }
    }
}

#[async_trait]
impl<C: ToolChannel> ToolChannel for InstrumentedChannel<C> {
    fn server_identity(&self) -> &str {
        self.inner.server_identity()
    }

    async fn connect(&self) -> Result<()> {
        self.inner.connect().await?;
        tracing::debug!("🔌 Connected to MCP server {}", self.server_identity());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await?;
        tracing::debug!("Closed MCP server {}", self.server_identity());
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.inner.is_connected().await
    }

    /// Never fails: enumeration errors are logged and yield no tools
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let server_url = self.server_identity().to_string();
        let span = info_span!("mcp_list_tools", server_url = %server_url, tool_count = Empty);

        match self.inner.list_tools().instrument(span.clone()).await {
            Ok(tools) => {
                let names: Vec<String> = tools.iter().map(ToolDescriptor::display_name).collect();
                span.record("tool_count", names.len());
                span.in_scope(|| {
                    info!(
                        server_url = %server_url,
                        count = names.len(),
                        tools = ?names,
                        "📋 Listed MCP tools"
                    )
                });
                self.emit(EventKind::ToolList {
                    server_url,
                    success: true,
                    tool_names: names,
                    error: None,
                });
                Ok(tools)
            }
            Err(e) => {
                span.in_scope(|| {
                    error!(
                        server_url = %server_url,
                        error = %e,
                        error_type = e.kind(),
                        "❌ Failed to list MCP tools"
                    )
                });
                self.emit(EventKind::ToolList {
                    server_url,
                    success: false,
                    tool_names: Vec::new(),
                    error: Some(e.to_string()),
                });
                Ok(Vec::new())
            }
        }
    }

    /// Errors from the wrapped channel are returned unchanged
    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult> {
        let invocation = ToolInvocation::new(tool_name, &arguments, self.server_identity());
        let span = invocation.span();
        span.in_scope(|| {
            info!(
                tool_name = %invocation.tool_name,
                server_url = %invocation.server_identity,
                arguments_size = invocation.arguments.to_string().len(),
                "🔧 Calling MCP tool {}",
                invocation.tool_name
            )
        });
        let started = Instant::now();

        let outcome = self
            .inner
            .call_tool(tool_name, arguments)
            .instrument(span.clone())
            .await;

        let event = match &outcome {
            Ok(result) => invocation.succeeded(&span, result, started.elapsed()),
            Err(e) => invocation.failed(&span, e, started.elapsed()),
        };
        self.emit(event);

        outcome
    }
}
