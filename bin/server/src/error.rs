//! Domain error types for server startup.
//!
//! Request handling itself cannot fail: the honeypot pipeline always yields a
//! response. Only loading configuration and building the pipeline can.

use std::fmt;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized.
    LoadFailed { reason: String },
    /// A value is outside its allowed range.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailed { reason } => write!(f, "failed to load configuration: {reason}"),
            Self::Invalid { field, reason } => {
                write!(f, "invalid configuration for '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that abort startup after configuration was loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupError {
    /// Custom detection patterns could not be loaded.
    Patterns { reason: String },
    /// The completion backend could not be constructed.
    Backend { reason: String },
    /// The listen address could not be bound.
    Bind { addr: String, reason: String },
    /// The server stopped with an I/O error.
    Serve { reason: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patterns { reason } => write!(f, "failed to load detection patterns: {reason}"),
            Self::Backend { reason } => write!(f, "failed to build LLM backend: {reason}"),
            Self::Bind { addr, reason } => write!(f, "failed to bind {addr}: {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for StartupError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::Invalid {
            field: "agent.temperature",
            reason: "must be within [0, 2]".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration for 'agent.temperature': must be within [0, 2]"
        );
    }

    #[test]
    fn startup_error_display() {
        let err = StartupError::Bind {
            addr: "0.0.0.0:8000".to_string(),
            reason: "address in use".to_string(),
        };
        assert!(err.to_string().contains("0.0.0.0:8000"));
    }
}
