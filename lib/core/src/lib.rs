//! Core types shared by the scambait crates.
//!
//! Holds the rootcause-based `Result` alias and the strongly-typed ids used
//! to correlate log lines across one interaction.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{InteractionId, InvocationId, ParseIdError};
