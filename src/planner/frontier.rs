//! Exploration frontier: entries pending axis-aligned expansion.

use crate::graph::ViewpointEntryIndex;
use crate::sensing::RandomSource;

/// Unordered pool of entry indices; removal swaps with the last element.
#[derive(Debug, Clone, Default)]
pub struct ExplorationFrontier {
    pending: Vec<ViewpointEntryIndex>,
}

impl ExplorationFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: ViewpointEntryIndex) {
        self.pending.push(index);
    }

    /// Add every index in `0..count`.
    pub fn seed(&mut self, count: usize) {
        self.pending.extend((0..count).map(ViewpointEntryIndex));
    }

    /// Remove and return a uniformly chosen member.
    pub fn pop_random(&mut self, rng: &mut dyn RandomSource) -> Option<ViewpointEntryIndex> {
        if self.pending.is_empty() {
            return None;
        }
        let slot = rng.uniform_index(self.pending.len());
        Some(self.pending.swap_remove(slot))
    }

    pub fn contains(&self, index: ViewpointEntryIndex) -> bool {
        self.pending.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
