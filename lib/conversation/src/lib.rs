//! Conversation state for scambait.
//!
//! One [`ConversationMemory`] is created at startup and shared by every
//! request; it is the only mutable state the honeypot core holds.

pub mod memory;
pub mod message;

pub use memory::{ConversationMemory, DEFAULT_MAX_TURNS};
pub use message::{Message, Role};
