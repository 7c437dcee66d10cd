//! Concrete LLM provider clients

pub mod openai;

pub use openai::OpenAiClient;
