//! Error types for the detection crate.
//!
//! Scoring and extraction are total and never fail. Only compiling a
//! user-supplied `PatternConfig` can, and those errors are wrapped in a
//! rootcause `Report` by the caller-facing constructors.

use std::fmt;

/// Errors from compiling or loading a pattern library.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternError {
    /// A signal or extraction pattern is not a valid regular expression.
    InvalidRegex { name: String, reason: String },
    /// A signal weight is negative or not finite.
    InvalidWeight { name: String, weight: f64 },
    /// A signal was configured without a name.
    EmptyName,
    /// The pattern file could not be read.
    ReadFailed { path: String, reason: String },
    /// The pattern file is not a valid pattern configuration.
    ParseFailed { reason: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex { name, reason } => {
                write!(f, "invalid pattern '{name}': {reason}")
            }
            Self::InvalidWeight { name, weight } => {
                write!(f, "signal '{name}' has invalid weight {weight}")
            }
            Self::EmptyName => write!(f, "signal name must not be empty"),
            Self::ReadFailed { path, reason } => {
                write!(f, "failed to read pattern file '{path}': {reason}")
            }
            Self::ParseFailed { reason } => {
                write!(f, "failed to parse pattern configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for PatternError {}
