//! Tool registry binding between the agent and its MCP channels

pub mod binding;

pub use binding::{BoundChannel, ToolBinding, ToolCatalog};
