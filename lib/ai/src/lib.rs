//! Reply generation for the scambait honeypot.
//!
//! - [`backend`]: the chat-completion abstraction the agent calls through
//! - [`openai`]: an HTTP client for OpenAI-compatible endpoints
//! - [`prompt`]: the persona prompt template
//! - [`agent`]: deadline and fallback policy around one completion call

pub mod agent;
pub mod backend;
pub mod error;
pub mod openai;
pub mod prompt;

pub use agent::{AgentConfig, FallbackReason, HoneypotAgent, ReplyOutcome, ReplySource};
pub use backend::{
    LlmBackend, LlmBackendConfig, LlmMessage, LlmProvider, LlmRequest, LlmResponse, MessageRole,
    TokenUsage,
};
pub use error::LlmError;
pub use openai::OpenAiCompatBackend;
pub use prompt::PromptTemplate;
