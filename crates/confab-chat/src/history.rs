//! Conversation state: the ordered turn log for one chat session.

use confab_ai::Turn;

/// An append-only, ordered sequence of conversation turns.
///
/// Turns are never reordered or deduplicated; insertion order is
/// chronological.
#[derive(Debug, Default)]
pub struct TurnStore {
    turns: Vec<Turn>,
}

impl TurnStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one turn at the end
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Read-only view of the turns in order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Owned copy of the turns in order
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Clear all turns. Idempotent.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Number of turns stored
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the store holds no turns
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
