//! In-memory, append-only log of finished scans.

use super::state::ScanState;
use crate::types::ScanId;

/// Terminal scan snapshots in completion order.
#[derive(Debug, Clone, Default)]
pub struct ScanHistory {
    entries: Vec<ScanState>,
}

impl ScanHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished scan. Non-terminal snapshots are refused.
    pub(crate) fn push(&mut self, state: ScanState) -> bool {
        if !state.status.is_terminal() {
            return false;
        }
        self.entries.push(state);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id the next appended scan will have.
    pub fn next_id(&self) -> ScanId {
        ScanId::new(self.entries.len())
    }

    pub fn entries(&self) -> &[ScanState] {
        &self.entries
    }
}
