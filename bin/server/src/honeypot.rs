//! The honeypot pipeline.
//!
//! One [`Honeypot`] is built at startup and shared by every request. Each
//! interaction scores the message, records it, asks the agent for a reply,
//! records the reply, and extracts intel into the per-request bundle and the
//! session ledger.

use scambait_ai::HoneypotAgent;
use scambait_conversation::{ConversationMemory, Role};
use scambait_core::InteractionId;
use scambait_detection::{IntelBundle, IntelExtractor, PatternLibrary, ScamClassifier};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, instrument};

/// Result of one interaction, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoneypotResponse {
    pub is_scam: bool,
    pub confidence: f64,
    pub agent_reply: String,
    pub extracted_intel: IntelBundle,
}

/// Snapshot of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoneypotStatus {
    /// Turns currently in the context window.
    pub retained_turns: usize,
    /// Turns recorded since startup.
    pub total_turns: u64,
}

/// Classifier, extractor, memory and agent wired into one pipeline.
#[derive(Debug)]
pub struct Honeypot {
    classifier: ScamClassifier,
    extractor: IntelExtractor,
    memory: ConversationMemory,
    agent: HoneypotAgent,
    intel: Mutex<IntelBundle>,
}

impl Honeypot {
    /// Builds the pipeline around a shared pattern library.
    #[must_use]
    pub fn new(
        library: Arc<PatternLibrary>,
        threshold: f64,
        memory: ConversationMemory,
        agent: HoneypotAgent,
    ) -> Self {
        Self {
            classifier: ScamClassifier::new(Arc::clone(&library)).with_threshold(threshold),
            extractor: IntelExtractor::new(library),
            memory,
            agent,
            intel: Mutex::new(IntelBundle::default()),
        }
    }

    /// Handles one inbound message. Always produces a well-formed response.
    #[instrument(skip_all, fields(interaction = %InteractionId::new()))]
    pub async fn interact(&self, message: &str) -> HoneypotResponse {
        let detection = self.classifier.score(message);

        self.memory.add(Role::Scammer, message);
        let context = self.memory.context();
        let outcome = self.agent.reply(&context, message).await;
        self.memory.add(Role::Agent, outcome.text.as_str());

        let intel = self.extractor.extract(message);
        if !intel.is_empty() {
            self.ledger().merge(&intel);
        }

        info!(
            is_scam = detection.is_scam,
            confidence = detection.confidence,
            intel = intel.len(),
            reply_fallback = outcome.is_fallback(),
            latency_ms = outcome.latency_ms,
            "interaction complete"
        );

        HoneypotResponse {
            is_scam: detection.is_scam,
            confidence: detection.confidence,
            agent_reply: outcome.into_text(),
            extracted_intel: intel,
        }
    }

    /// Intel accumulated over the whole session.
    #[must_use]
    pub fn intel(&self) -> IntelBundle {
        self.ledger().clone()
    }

    #[must_use]
    pub fn status(&self) -> HoneypotStatus {
        HoneypotStatus {
            retained_turns: self.memory.len(),
            total_turns: self.memory.total_recorded(),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, IntelBundle> {
        self.intel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
