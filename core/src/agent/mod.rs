//! Agent session, configuration and the conversation turn executor

pub mod config;
pub mod prompt;
pub mod session;
pub mod turn;

pub use config::{AgentBuilder, AgentConfig, DEFAULT_MAX_STEPS};
pub use prompt::NEWS_AGENT_SYSTEM_PROMPT;
pub use session::{AgentRun, AgentSession};
pub use turn::{
    ConversationHistory, TurnExecutor, TurnOutcome, TurnProcessor, PROVIDER_ERROR_PREFIX,
    UNEXPECTED_ERROR_PREFIX,
};
