//! Bounded conversation memory.
//!
//! Holds the most recent turns of the session and renders them as the
//! transcript handed to the reply agent. Writers are serialized behind a
//! mutex, so sequence numbers are strictly increasing with no gaps even
//! under concurrent requests. When the bound is exceeded the oldest turns are
//! evicted first.

use crate::message::{Message, Role};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Default number of turns retained.
pub const DEFAULT_MAX_TURNS: usize = 20;

#[derive(Debug, Default)]
struct MemoryState {
    /// Turns ever recorded, including evicted ones.
    recorded: u64,
    turns: VecDeque<Message>,
}

/// Append-only, retention-bounded log of conversation turns.
#[derive(Debug)]
pub struct ConversationMemory {
    max_turns: usize,
    state: Mutex<MemoryState>,
}

impl ConversationMemory {
    /// Creates a memory that retains at most `max_turns` turns (at least one).
    #[must_use]
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            max_turns,
            state: Mutex::new(MemoryState {
                recorded: 0,
                turns: VecDeque::with_capacity(max_turns),
            }),
        }
    }

    /// The retention bound.
    #[must_use]
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Appends a turn and returns it as recorded.
    pub fn add(&self, role: Role, content: impl Into<String>) -> Message {
        let mut state = self.lock();
        state.recorded += 1;
        let message = Message::new(state.recorded, role, content);
        state.turns.push_back(message.clone());

        while state.turns.len() > self.max_turns {
            if let Some(evicted) = state.turns.pop_front() {
                trace!(seq = evicted.seq, "evicted oldest turn");
            }
        }

        message
    }

    /// Renders the retained turns oldest-first, one `role: content` line each.
    #[must_use]
    pub fn context(&self) -> String {
        self.lock()
            .turns
            .iter()
            .map(Message::transcript_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Copies the retained turns oldest-first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().turns.iter().cloned().collect()
    }

    /// Number of retained turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().turns.len()
    }

    /// Returns true if no turns are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().turns.is_empty()
    }

    /// Number of turns ever recorded, including evicted ones.
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.lock().recorded
    }

    // Every mutation is a single push plus pops, so a guard left behind by a
    // panicking holder still protects a consistent log.
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn empty_memory_renders_empty_context() {
        let memory = ConversationMemory::default();
        assert!(memory.is_empty());
        assert_eq!(memory.context(), "");
        assert_eq!(memory.max_turns(), DEFAULT_MAX_TURNS);
    }

    #[test]
    fn add_then_context_includes_turn() {
        let memory = ConversationMemory::default();
        let recorded = memory.add(Role::Scammer, "your parcel is held at customs");
        assert_eq!(recorded.seq, 1);

        memory.add(Role::Agent, "Oh my, which parcel is that?");
        assert_eq!(
            memory.context(),
            "scammer: your parcel is held at customs\nagent: Oh my, which parcel is that?"
        );
    }

    #[test]
    fn context_is_idempotent() {
        let memory = ConversationMemory::default();
        memory.add(Role::Scammer, "hello");
        let first = memory.context();
        assert_eq!(first, memory.context());
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn oldest_turns_are_evicted_first() {
        let memory = ConversationMemory::new(3);
        for i in 1..=5 {
            memory.add(Role::Scammer, format!("turn {i}"));
        }

        let context = memory.context();
        assert!(!context.contains("turn 1"));
        assert!(!context.contains("turn 2"));
        assert_eq!(context, "scammer: turn 3\nscammer: turn 4\nscammer: turn 5");

        let seqs: Vec<u64> = memory.snapshot().iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
        assert_eq!(memory.total_recorded(), 5);
    }

    #[test]
    fn zero_bound_keeps_latest_turn() {
        let memory = ConversationMemory::new(0);
        memory.add(Role::Scammer, "first");
        memory.add(Role::Agent, "second");
        assert_eq!(memory.max_turns(), 1);
        assert_eq!(memory.context(), "agent: second");
    }

    #[test]
    fn recorded_turns_are_not_mutated_by_later_adds() {
        let memory = ConversationMemory::new(10);
        memory.add(Role::Scammer, "a");
        let before = memory.snapshot();
        memory.add(Role::Agent, "b");
        assert_eq!(memory.snapshot()[..1], before[..]);
    }

    #[test]
    fn concurrent_adds_get_unique_gapless_sequence_numbers() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let memory = Arc::new(ConversationMemory::new(THREADS * PER_THREAD));
        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let memory = Arc::clone(&memory);
                scope.spawn(move || {
                    for i in 0..PER_THREAD {
                        let role = if i % 2 == 0 { Role::Scammer } else { Role::Agent };
                        memory.add(role, format!("t{t}-{i}"));
                    }
                });
            }
        });

        let snapshot = memory.snapshot();
        assert_eq!(snapshot.len(), THREADS * PER_THREAD);
        for (index, message) in snapshot.iter().enumerate() {
            assert_eq!(message.seq, index as u64 + 1);
        }
    }

    #[test]
    fn concurrent_adds_past_the_bound_keep_the_newest() {
        let memory = Arc::new(ConversationMemory::new(10));
        std::thread::scope(|scope| {
            for t in 0..4 {
                let memory = Arc::clone(&memory);
                scope.spawn(move || {
                    for i in 0..25 {
                        memory.add(Role::Scammer, format!("{t}:{i}"));
                    }
                });
            }
        });

        let seqs: Vec<u64> = memory.snapshot().iter().map(|m| m.seq).collect();
        assert_eq!(seqs, (91..=100).collect::<Vec<_>>());
    }
}
