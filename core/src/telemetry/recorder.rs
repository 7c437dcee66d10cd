//! In-memory telemetry recorder, optionally persisted as JSON

use super::event::{EventKind, TelemetryEvent, TelemetrySink};
use crate::error::{Result, TelemetryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::fs;

/// Collects telemetry events for later inspection
pub struct TelemetryRecorder {
    events: RwLock<Vec<TelemetryEvent>>,
    file_path: Option<PathBuf>,
}

/// Persisted telemetry log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryLog {
    pub metadata: TelemetryMetadata,
    pub events: Vec<TelemetryEvent>,
}

/// Summary written alongside the events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryMetadata {
    /// Unique identifier for this log
    pub id: String,

    /// Timestamp of the first event
    pub started_at: DateTime<Utc>,

    /// Timestamp of the last event
    pub completed_at: Option<DateTime<Utc>>,

    /// Log format version
    pub version: String,

    /// Number of tool invocations
    pub tool_calls: usize,

    /// Number of failed tool invocations and turns
    pub failures: usize,

    /// Number of turns
    pub turns: usize,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            file_path: None,
        }
    }

    /// Recorder that writes its log to `path` on flush
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            file_path: Some(path.as_ref().to_path_buf()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<TelemetryEvent>> {
        self.events.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TelemetryEvent>> {
        self.events.write().unwrap_or_else(|e| e.into_inner())
    }

    /// All recorded events
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.read().clone()
    }

    pub fn event_count(&self) -> usize {
        self.read().len()
    }

    /// Tool call events for the given tool
    pub fn tool_calls(&self, tool_name: &str) -> Vec<TelemetryEvent> {
        self.read()
            .iter()
            .filter(|e| e.tool_name() == Some(tool_name))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Write the log to the configured file, if any
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };

        let log = self.build_log();
        let json =
            serde_json::to_string_pretty(&log).map_err(|e| TelemetryError::RecordingFailed {
                message: format!("Failed to serialize telemetry: {}", e),
            })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        fs::write(path, json).await?;
        Ok(())
    }

    /// Load a previously saved log
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<TelemetryLog> {
        let content = fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&content)?)
    }

    fn build_log(&self) -> TelemetryLog {
        let events = self.events();

        let started_at = events.first().map(|e| e.timestamp).unwrap_or_else(Utc::now);
        let completed_at = events.last().map(|e| e.timestamp);

        let mut tool_calls = 0;
        let mut failures = 0;
        let mut turns = 0;
        for event in &events {
            match &event.kind {
                EventKind::ToolCall { success, .. } => {
                    tool_calls += 1;
                    if !success {
                        failures += 1;
                    }
                }
                EventKind::TurnComplete { success, .. } => {
                    turns += 1;
                    if !success {
                        failures += 1;
                    }
                }
                EventKind::ToolList { .. } => {}
            }
        }

        TelemetryLog {
            metadata: TelemetryMetadata {
                id: uuid::Uuid::new_v4().to_string(),
                started_at,
                completed_at,
                version: "1.0".to_string(),
                tool_calls,
                failures,
                turns,
            },
            events,
        }
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySink for TelemetryRecorder {
    fn record(&self, event: TelemetryEvent) {
        self.write().push(event);
    }

    async fn flush(&self) -> Result<()> {
        self.save().await
    }
}
