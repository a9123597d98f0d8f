//! Message types for conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The suspected scammer on the other end.
    Scammer,
    /// The honeypot persona.
    Agent,
}

impl Role {
    /// Returns the lowercase tag used in transcripts.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scammer => "scammer",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded turn. Only [`ConversationMemory`](crate::ConversationMemory)
/// creates these, so `seq` is always assigned by the memory that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the session, starting at 1.
    pub seq: u64,
    /// Sender.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// When the message was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(seq: u64, role: Role, content: impl Into<String>) -> Self {
        Self {
            seq,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Renders the message as one transcript line.
    #[must_use]
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}
