//! scambait HTTP server.
//!
//! Exposes the honeypot pipeline over a small JSON API. The pipeline itself
//! lives in [`honeypot`]; [`routes`] and [`auth`] are the HTTP surface and
//! [`config`] loads everything from the environment.

pub mod auth;
pub mod config;
pub mod error;
pub mod honeypot;
pub mod routes;

use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::honeypot::Honeypot;
use scambait_ai::{HoneypotAgent, OpenAiCompatBackend};
use scambait_conversation::ConversationMemory;
use std::sync::Arc;
use std::time::Duration;

/// Extra time the HTTP client allows beyond the agent deadline.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Builds the honeypot pipeline described by `config`.
///
/// # Errors
///
/// Returns an error if custom patterns fail to load or the LLM backend
/// cannot be constructed.
pub fn build_honeypot(config: &ServerConfig) -> scambait_core::Result<Honeypot, StartupError> {
    let library = config
        .detection
        .pattern_library()
        .map_err(|e| StartupError::Patterns {
            reason: e.to_string(),
        })?;

    let backend = OpenAiCompatBackend::new(
        config.llm.clone(),
        config.agent.timeout() + CLIENT_TIMEOUT_SLACK,
    )
    .map_err(|e| StartupError::Backend {
        reason: e.to_string(),
    })?;

    let agent = HoneypotAgent::new(Arc::new(backend), config.agent.agent_config());
    Ok(Honeypot::new(
        library,
        config.detection.threshold,
        ConversationMemory::new(config.memory.max_turns),
        agent,
    ))
}
