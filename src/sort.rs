//! # Sort Engine
//!
//! Tracks whether the flight array is currently sorted ascending by X, and
//! re-sorts (repacking the airport sidecar in the process) on demand.

use crate::directory::IdDirectory;
use crate::store::DeviceStore;

/// Sort-validity tracker for the flight array.
pub struct SortEngine {
    valid: bool,
}

impl SortEngine {
    /// Creates a new engine; the array is considered unsorted until the first
    /// successful sort.
    #[must_use]
    pub fn new() -> Self {
        Self { valid: false }
    }

    /// Whether slots `0..N-1` are currently known to be non-decreasing in X.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Marks the sort stale; the next query will re-sort before scanning.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Re-sorts `store` if the order is currently invalid, dirtying
    /// `directory` only when an actual re-sort happened (slots moved).
    pub fn ensure_sorted(&mut self, store: &mut DeviceStore, directory: &mut IdDirectory) {
        if self.valid {
            return;
        }
        store.sort_by_x();
        self.valid = true;
        directory.mark_dirty();
        tracing::debug!(flights = store.len(), "sort engine re-sorted flight array");
    }
}

impl Default for SortEngine {
    fn default() -> Self {
        Self::new()
    }
}
