//! Tracing setup and structured telemetry
//!
//! Spans and events are emitted through `tracing`. A [`TelemetrySink`] can
//! additionally be installed to collect the same events as structured
//! records; nothing in the crate depends on one being present.

pub mod event;
pub mod recorder;

pub use event::{EventKind, TelemetryEvent, TelemetrySink};
pub use recorder::{TelemetryLog, TelemetryRecorder};

use crate::error::{Result, TelemetryError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "Invalid log format: {}. Valid options: text, json",
                other
            )),
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
    /// Also write log lines to this file
    pub log_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            log_file: None,
        }
    }
}

impl TelemetryConfig {
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }
}

/// Keeps buffered telemetry alive until [`TelemetryGuard::shutdown`]
#[derive(Default)]
pub struct TelemetryGuard {
    worker: Option<WorkerGuard>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl TelemetryGuard {
    /// Attach a sink to be flushed at shutdown
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Flush the sink and drain the log writer
    pub async fn shutdown(self) -> Result<()> {
        let result = match &self.sink {
            Some(sink) => sink.flush().await,
            None => Ok(()),
        };
        drop(self.worker);
        result
    }
}

/// Install the global tracing subscriber.
///
/// Calling this when a subscriber is already installed is not an error.
pub fn init_tracing(config: TelemetryConfig) -> Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TelemetryError::InitFailed {
            message: format!("invalid filter '{}': {}", config.level, e),
        })?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    layers.push(match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    });

    let mut worker = None;
    if let Some(path) = &config.log_file {
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path.file_name().ok_or_else(|| TelemetryError::InitFailed {
            message: format!("invalid log file path: {}", path.display()),
        })?;

        std::fs::create_dir_all(&directory)?;
        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        worker = Some(guard);

        layers.push(match config.format {
            LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
            LogFormat::Text => fmt::layer().with_ansi(false).with_writer(writer).boxed(),
        });
    }

    // Fails only when a global subscriber or logger is already installed,
    // which then keeps receiving every event.
    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
    {
        tracing::debug!("Keeping existing tracing subscriber: {}", e);
    }

    Ok(TelemetryGuard { worker, sink: None })
}

/// Keep the first `max_chars` characters of `text`, marking a cut with `...`
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 200), "short");
        assert_eq!(preview(&"a".repeat(50), 50), "a".repeat(50));

        let long = "é".repeat(250);
        let truncated = preview(&long, 200);
        assert_eq!(truncated, format!("{}...", "é".repeat(200)));
    }

    #[test]
    fn test_init_tracing_twice_keeps_first_subscriber() {
        assert!(init_tracing(TelemetryConfig::default()).is_ok());
        assert!(init_tracing(TelemetryConfig::default().with_format(LogFormat::Json)).is_ok());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[tokio::test]
    async fn test_guard_flushes_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let recorder = Arc::new(TelemetryRecorder::with_file(&path));

        let guard = TelemetryGuard::default().with_sink(recorder.clone());
        guard.shutdown().await.unwrap();
        assert!(path.exists());
    }
}
