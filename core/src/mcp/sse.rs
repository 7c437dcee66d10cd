//! MCP client over the HTTP+SSE transport
//!
//! The server pushes JSON-RPC responses over a long-lived event stream and
//! receives requests as POSTs to the endpoint it announces in its first
//! `endpoint` event. A background task reads the stream and routes each
//! response to the request waiting on its id.

use super::channel::ToolChannel;
use super::types::{
    CallToolResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ToolDescriptor,
    PROTOCOL_VERSION,
};
use crate::config::McpServerConfig;
use crate::error::{McpError, Result};
use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};
use url::Url;

type SseEvents = BoxStream<'static, std::result::Result<Event, EventStreamError<reqwest::Error>>>;
type ResponseSender = oneshot::Sender<std::result::Result<JsonRpcResponse, McpError>>;
type PendingRequests = Arc<StdMutex<PendingTable>>;

/// Requests waiting for a response. Once the reader stops, `closed` holds
/// the reason and no new waiters are accepted.
#[derive(Default)]
struct PendingTable {
    waiters: HashMap<u64, ResponseSender>,
    closed: Option<String>,
}

/// Tool channel speaking MCP over HTTP+SSE
pub struct SseToolChannel {
    config: McpServerConfig,
    http: reqwest::Client,
    connection: Mutex<Option<Connection>>,
    next_id: AtomicU64,
}

/// Live state of an open connection
struct Connection {
    endpoint: Url,
    pending: PendingRequests,
    reader: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
        fail_pending(&self.pending, "connection closed");
    }
}

impl SseToolChannel {
    /// Create a channel for the given server. No connection is made until
    /// [`ToolChannel::connect`] is called.
    pub fn new(config: McpServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            config,
            http,
            connection: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Server configuration this channel was built from
    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.config.connect_timeout_secs)
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.config.read_timeout_secs)
    }

    fn connect_error<E: std::fmt::Display>(&self, error: E) -> McpError {
        McpError::Connect {
            url: self.config.url.clone(),
            message: error.to_string(),
        }
    }

    fn with_headers(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }
        request
    }

    /// Open the event stream and wait for the server to announce its
    /// message endpoint
    async fn open_stream(&self) -> Result<(Url, SseEvents)> {
        let url = Url::parse(&self.config.url).map_err(|e| self.connect_error(e))?;

        let request = self
            .with_headers(self.http.get(url.clone()))
            .header(ACCEPT, "text/event-stream");

        let response = timeout(self.connect_timeout(), request.send())
            .await
            .map_err(|_| McpError::Timeout {
                operation: "SSE connection".to_string(),
                seconds: self.config.connect_timeout_secs,
            })?
            .map_err(|e| self.connect_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            }
            .into());
        }

        let mut events: SseEvents = response.bytes_stream().eventsource().boxed();

        let endpoint = timeout(self.connect_timeout(), wait_for_endpoint(&mut events))
            .await
            .map_err(|_| McpError::Timeout {
                operation: "endpoint event".to_string(),
                seconds: self.config.connect_timeout_secs,
            })??;

        let endpoint = url.join(endpoint.trim()).map_err(|e| McpError::Protocol {
            message: format!("invalid endpoint '{}': {}", endpoint, e),
        })?;

        Ok((endpoint, events))
    }

    async fn handles(&self) -> Result<(Url, PendingRequests)> {
        let connection = self.connection.lock().await;
        match connection.as_ref() {
            Some(conn) if conn.reader.is_finished() => Err(McpError::Closed {
                reason: "event stream ended".to_string(),
            }
            .into()),
            Some(conn) => Ok((conn.endpoint.clone(), conn.pending.clone())),
            None => Err(McpError::NotConnected {
                server: self.config.name.clone(),
            }
            .into()),
        }
    }

    async fn post(&self, endpoint: &Url, message: &JsonRpcRequest) -> Result<()> {
        let response = self
            .with_headers(self.http.post(endpoint.clone()))
            .json(message)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }
        Ok(())
    }

    /// Send a JSON-RPC request and wait for its response
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let (endpoint, pending) = self.handles().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        register_waiter(&pending, id, tx)?;

        let message = JsonRpcRequest::request(id, method, params);
        debug!("MCP request {} ({})", method, id);
        if let Err(e) = self.post(&endpoint, &message).await {
            lock_pending(&pending).waiters.remove(&id);
            return Err(e);
        }

        let response = match timeout(self.read_timeout(), rx).await {
            Err(_) => {
                lock_pending(&pending).waiters.remove(&id);
                return Err(McpError::Timeout {
                    operation: method.to_string(),
                    seconds: self.config.read_timeout_secs,
                }
                .into());
            }
            Ok(Err(_)) => {
                return Err(McpError::Closed {
                    reason: format!("connection dropped while waiting for {}", method),
                }
                .into())
            }
            Ok(Ok(response)) => response?,
        };

        if let Some(error) = response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            }
            .into());
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let (endpoint, _) = self.handles().await?;
        self.post(&endpoint, &JsonRpcRequest::notification(method))
            .await
    }

    async fn initialize(&self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "newsdesk",
                "version": crate::VERSION
            }
        });

        let result = self.request("initialize", Some(params)).await?;
        let server_info = result.get("serverInfo").cloned().unwrap_or_default();
        debug!(server_info = %server_info, "MCP session initialized");

        self.notify("notifications/initialized").await
    }
}

#[async_trait]
impl ToolChannel for SseToolChannel {
    fn server_identity(&self) -> &str {
        &self.config.url
    }

    async fn connect(&self) -> Result<()> {
        {
            let mut connection = self.connection.lock().await;
            if connection.as_ref().is_some_and(|c| !c.reader.is_finished()) {
                return Ok(());
            }

            let (endpoint, events) = self.open_stream().await?;
            debug!("MCP endpoint for {}: {}", self.config.name, endpoint);

            let pending: PendingRequests = Arc::default();
            let reader = tokio::spawn(pump_events(
                events,
                pending.clone(),
                self.read_timeout(),
            ));

            *connection = Some(Connection {
                endpoint,
                pending,
                reader,
            });
        }

        if let Err(e) = self.initialize().await {
            self.connection.lock().await.take();
            return Err(e);
        }

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.connection.lock().await.take().is_some() {
            debug!("Closed MCP connection to {}", self.config.name);
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .await
            .as_ref()
            .is_some_and(|c| !c.reader.is_finished())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult> {
        let params = json!({
            "name": tool_name,
            "arguments": arguments,
        });
        let result = self.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }
}

async fn wait_for_endpoint(events: &mut SseEvents) -> Result<String> {
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| McpError::Protocol {
            message: format!("invalid event stream: {}", e),
        })?;
        if event.event == "endpoint" {
            return Ok(event.data);
        }
        debug!("Ignoring '{}' event before endpoint", event.event);
    }

    Err(McpError::Closed {
        reason: "stream ended before the endpoint event".to_string(),
    }
    .into())
}

/// Route responses from the event stream to their waiting requests until
/// the stream ends or stays silent longer than `read_timeout`.
async fn pump_events(mut events: SseEvents, pending: PendingRequests, read_timeout: Duration) {
    let reason = loop {
        let event = match timeout(read_timeout, events.next()).await {
            Err(_) => break format!("no events for {}s", read_timeout.as_secs()),
            Ok(None) => break "server closed the event stream".to_string(),
            Ok(Some(Err(e))) => break format!("event stream error: {}", e),
            Ok(Some(Ok(event))) => event,
        };

        if !event.event.is_empty() && event.event != "message" {
            debug!("Ignoring '{}' event", event.event);
            continue;
        }

        let response: JsonRpcResponse = match serde_json::from_str(&event.data) {
            Ok(response) => response,
            Err(e) => {
                warn!("Discarding malformed MCP message: {}", e);
                continue;
            }
        };

        let Some(id) = response.numeric_id() else {
            debug!("Ignoring MCP message without id");
            continue;
        };
        let waiter = lock_pending(&pending).waiters.remove(&id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(Ok(response));
            }
            None => debug!("No pending request for MCP response {}", id),
        }
    };

    debug!("MCP reader stopped: {}", reason);
    fail_pending(&pending, &reason);
}

fn register_waiter(pending: &PendingRequests, id: u64, tx: ResponseSender) -> Result<()> {
    let mut table = lock_pending(pending);
    if let Some(reason) = &table.closed {
        return Err(McpError::Closed {
            reason: reason.clone(),
        }
        .into());
    }
    table.waiters.insert(id, tx);
    Ok(())
}

fn fail_pending(pending: &PendingRequests, reason: &str) {
    let mut table = lock_pending(pending);
    if table.closed.is_none() {
        table.closed = Some(reason.to_string());
    }
    for (_, tx) in table.waiters.drain() {
        let _ = tx.send(Err(McpError::Closed {
            reason: reason.to_string(),
        }));
    }
}

fn lock_pending(pending: &PendingRequests) -> std::sync::MutexGuard<'_, PendingTable> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
