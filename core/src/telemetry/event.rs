//! Structured telemetry events and the sink they are delivered to

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A single telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: EventKind,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// One tool invocation finished
    ToolCall {
        tool_name: String,
        server_url: String,
        arguments: Value,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result_size: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_type: Option<String>,
        duration_ms: u64,
    },

    /// A tool catalog was fetched (or the fetch failed)
    ToolList {
        server_url: String,
        success: bool,
        tool_names: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A conversation turn produced its response
    TurnComplete {
        prompt_preview: String,
        response_length: usize,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_type: Option<String>,
    },
}

impl TelemetryEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Tool name for tool call events
    pub fn tool_name(&self) -> Option<&str> {
        match &self.kind {
            EventKind::ToolCall { tool_name, .. } => Some(tool_name),
            _ => None,
        }
    }
}

/// Destination for structured telemetry.
///
/// Delivery is fire-and-forget: `record` never fails and callers do not
/// depend on the sink being present.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);

    /// Drain anything buffered. Called once at shutdown.
    async fn flush(&self) -> Result<()>;
}
