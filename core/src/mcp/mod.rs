//! Remote tool providers speaking the Model Context Protocol

pub mod channel;
pub mod instrumented;
pub mod sse;
pub mod types;

pub use channel::ToolChannel;
pub use instrumented::{InstrumentedChannel, ToolInvocation, RESULT_PREVIEW_CHARS};
pub use sse::SseToolChannel;
pub use types::{CallToolResult, ToolContent, ToolDescriptor, PROTOCOL_VERSION};
