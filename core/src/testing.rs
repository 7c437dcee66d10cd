//! Test doubles: a scripted model, an in-memory tool channel and an
//! in-process MCP server speaking HTTP+SSE

use crate::error::{Error, LlmError, McpError, Result};
use crate::llm::{
    ChatOptions, ContentBlock, FinishReason, LlmClient, LlmMessage, LlmResponse, MessageContent,
    MessageRole, ToolDefinition,
};
use crate::mcp::{CallToolResult, ToolChannel, ToolDescriptor, PROTOCOL_VERSION};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// The three tools exposed by the news search server
pub fn news_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "search_articles_by_tag_names",
            Some("Search for articles by tag names".to_string()),
            json!({
                "type": "object",
                "properties": {"tag_names": {"type": "string"}},
                "required": ["tag_names"]
            }),
        ),
        ToolDescriptor::new(
            "get_article_by_link_hash",
            Some("Get a specific article by its link url hash".to_string()),
            json!({
                "type": "object",
                "properties": {"link_hash": {"type": "string"}},
                "required": ["link_hash"]
            }),
        ),
        ToolDescriptor::new(
            "make_hashed_link",
            Some("Create a hashed link from a link url".to_string()),
            json!({
                "type": "object",
                "properties": {"link": {"type": "string"}},
                "required": ["link"]
            }),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Scripted model

enum ScriptStep {
    Reply(LlmMessage),
    LlmError(String),
    GenericError(String),
    Panic(String),
}

/// One request received by [`ScriptedLlmClient`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<LlmMessage>,
    pub tool_names: Vec<String>,
}

/// Model client that replays a fixed script, one step per request
#[derive(Default)]
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn then(self, step: ScriptStep) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn then_text(self, text: &str) -> Self {
        self.then(ScriptStep::Reply(LlmMessage::assistant(text)))
    }

    pub fn then_tool_call(self, id: &str, name: &str, input: Value) -> Self {
        self.then(ScriptStep::Reply(LlmMessage {
            role: MessageRole::Assistant,
            content: MessageContent::Blocks(vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }]),
        }))
    }

    pub fn then_llm_error(self, message: &str) -> Self {
        self.then(ScriptStep::LlmError(message.to_string()))
    }

    pub fn then_generic_error(self, message: &str) -> Self {
        self.then(ScriptStep::GenericError(message.to_string()))
    }

    pub fn then_panic(self, message: &str) -> Self {
        self.then(ScriptStep::Panic(message.to_string()))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<ToolDefinition>>,
        _options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages,
            tool_names: tools
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.function.name)
                .collect(),
        });

        let step = self.script.lock().unwrap().pop_front();
        let message = match step {
            Some(ScriptStep::Reply(message)) => message,
            Some(ScriptStep::LlmError(message)) => {
                return Err(LlmError::ApiError {
                    status: 500,
                    message,
                }
                .into())
            }
            Some(ScriptStep::GenericError(message)) => return Err(Error::Generic(message)),
            Some(ScriptStep::Panic(message)) => panic!("{}", message),
            None => {
                return Err(LlmError::UnexpectedResponse {
                    message: "script exhausted".to_string(),
                }
                .into())
            }
        };

        let finish_reason = if message.has_tool_use() {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };

        Ok(LlmResponse {
            message,
            usage: None,
            model: "scripted-model".to_string(),
            finish_reason: Some(finish_reason),
        })
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

// ---------------------------------------------------------------------------
// In-memory tool channel

enum FakeResponse {
    Result(CallToolResult),
    Rpc { code: i64, message: String },
}

/// Tool channel backed by canned responses, counting connects and closes
pub struct FakeToolChannel {
    identity: String,
    tools: Vec<ToolDescriptor>,
    responses: HashMap<String, FakeResponse>,
    fail_connect: bool,
    fail_list: bool,
    connected: AtomicBool,
    connects: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeToolChannel {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            tools: Vec::new(),
            responses: HashMap::new(),
            fail_connect: false,
            fail_list: false,
            connected: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Channel exposing the three news tools
    pub fn news_server() -> Self {
        Self {
            tools: news_tools(),
            ..Self::new("http://fake-news-server/sse")
        }
    }

    pub fn with_tool(mut self, name: &str, description: &str) -> Self {
        self.tools.push(ToolDescriptor::new(
            name,
            Some(description.to_string()),
            json!({"type": "object", "properties": {}}),
        ));
        self
    }

    pub fn with_result(mut self, tool_name: &str, result: CallToolResult) -> Self {
        self.responses
            .insert(tool_name.to_string(), FakeResponse::Result(result));
        self
    }

    pub fn with_rpc_error(mut self, tool_name: &str, code: i64, message: &str) -> Self {
        self.responses.insert(
            tool_name.to_string(),
            FakeResponse::Rpc {
                code,
                message: message.to_string(),
            },
        );
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(McpError::NotConnected {
                server: self.identity.clone(),
            }
            .into())
        }
    }
}

#[async_trait]
impl ToolChannel for FakeToolChannel {
    fn server_identity(&self) -> &str {
        &self.identity
    }

    async fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(McpError::Connect {
                url: self.identity.clone(),
                message: "connection refused".to_string(),
            }
            .into());
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.ensure_connected()?;
        if self.fail_list {
            return Err(McpError::Protocol {
                message: "tools/list unavailable".to_string(),
            }
            .into());
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult> {
        self.ensure_connected()?;
        self.calls
            .lock()
            .unwrap()
            .push((tool_name.to_string(), arguments.clone()));

        match self.responses.get(tool_name) {
            Some(FakeResponse::Result(result)) => Ok(result.clone()),
            Some(FakeResponse::Rpc { code, message }) => Err(McpError::Rpc {
                code: *code,
                message: message.clone(),
            }
            .into()),
            None => Ok(CallToolResult::text(format!("{} {}", tool_name, arguments))),
        }
    }
}

// ---------------------------------------------------------------------------
// In-process MCP server over HTTP+SSE

#[derive(Default)]
struct ServerState {
    stream: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    initialized: AtomicBool,
    /// Announce the endpoint, then never answer a request
    silent: bool,
}

/// MCP server bound to 127.0.0.1 serving the news tools. `tools/list` is
/// split over two pages; calling `explode` yields a JSON-RPC error,
/// `stall` is never answered and `hang_up` ends the event stream.
pub struct FakeSseServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

impl FakeSseServer {
    pub async fn start() -> Self {
        Self::serve(ServerState::default()).await
    }

    /// Server that completes the endpoint handshake and then goes quiet
    pub async fn start_silent() -> Self {
        Self::serve(ServerState {
            silent: true,
            ..ServerState::default()
        })
        .await
    }

    async fn serve(state: ServerState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/sse", get(open_stream))
            .route("/messages", post(receive_message))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, task }
    }

    pub fn sse_url(&self) -> String {
        format!("http://{}/sse", self.addr)
    }

    pub fn saw_initialized_notification(&self) -> bool {
        self.state.initialized.load(Ordering::SeqCst)
    }
}

impl Drop for FakeSseServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn open_stream(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    *state.stream.lock().unwrap() = Some(tx);

    let endpoint = futures::stream::once(futures::future::ready(Ok::<_, Infallible>(
        Event::default()
            .event("endpoint")
            .data("/messages?session_id=test-session"),
    )));
    let messages = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);

    Sse::new(endpoint.chain(messages))
}

async fn receive_message(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<Value>,
) -> StatusCode {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    if state.silent {
        return StatusCode::ACCEPTED;
    }

    if method == "tools/call" {
        match request["params"]["name"].as_str() {
            Some("stall") => return StatusCode::ACCEPTED,
            Some("hang_up") => {
                state.stream.lock().unwrap().take();
                return StatusCode::ACCEPTED;
            }
            _ => {}
        }
    }

    let Some(id) = request.get("id").cloned() else {
        if method == "notifications/initialized" {
            state.initialized.store(true, Ordering::SeqCst);
        }
        return StatusCode::ACCEPTED;
    };

    let body = match respond(&method, &request["params"]) {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }),
    };

    if let Some(tx) = state.stream.lock().unwrap().as_ref() {
        let _ = tx.send(Event::default().event("message").data(body.to_string()));
    }
    StatusCode::ACCEPTED
}

fn respond(method: &str, params: &Value) -> std::result::Result<Value, (i64, String)> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "fake-news", "version": "0.1.0"}
        })),
        "tools/list" => {
            let tools = news_tools();
            match params.get("cursor").and_then(Value::as_str) {
                None => Ok(json!({"tools": &tools[..2], "nextCursor": "page-2"})),
                Some("page-2") => Ok(json!({"tools": &tools[2..]})),
                Some(other) => Err((-32602, format!("unknown cursor {}", other))),
            }
        }
        "tools/call" => {
            let name = params["name"].as_str().unwrap_or_default();
            if name == "explode" {
                return Err((-32000, "tool exploded".to_string()));
            }
            Ok(json!({
                "content": [{
                    "type": "text",
                    "text": format!("{} results for {}", name, params["arguments"])
                }],
                "isError": false
            }))
        }
        other => Err((-32601, format!("Method not found: {}", other))),
    }
}
