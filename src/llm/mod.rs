//! Language model client: wire types, provider trait, OpenAI-compatible impl.

mod error;
mod openai;
mod provider;
mod types;

pub use error::LlmError;
pub use openai::OpenAiProvider;
pub use provider::{first_message, LlmProvider};
pub use types::{
    ChatRequest, ChatResponse, Choice, FunctionCall, FunctionDefinition, Message, Role, ToolCall,
    ToolDefinition,
};
