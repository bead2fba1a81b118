//! # ID Directory
//!
//! Maps a caller-chosen flight identifier to its current slot index. Dirtied
//! by any sort and any structural change (add, remove); rebuilt lazily in a
//! single linear pass the next time a lookup is needed.

use std::collections::HashMap;

use crate::model::FlightRecord;

/// Identifier-to-slot map, rebuilt on demand.
pub struct IdDirectory {
    slots: HashMap<i64, u32>,
    dirty: bool,
}

impl IdDirectory {
    /// Creates an empty, dirty directory (nothing has been built yet).
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            dirty: true,
        }
    }

    /// Marks the directory stale; the next lookup will rebuild it.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Rebuilds the map from the current flight array if it is dirty.
    pub fn ensure_fresh(&mut self, records: &[FlightRecord]) {
        if !self.dirty {
            return;
        }
        self.slots.clear();
        self.slots.reserve(records.len());
        for (slot, record) in records.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            self.slots.insert(record.id, slot as u32);
        }
        self.dirty = false;
        tracing::debug!(flights = records.len(), "id directory rebuilt");
    }

    /// Resolves an identifier to its slot index, or `None` if it is not
    /// present. Does not rebuild; call [`Self::ensure_fresh`] first.
    #[must_use]
    pub fn lookup(&self, id: i64) -> Option<u32> {
        self.slots.get(&id).copied()
    }

    /// Public `index_of` semantics: rebuilds if dirty, then resolves `id`,
    /// returning `-1` if the identifier is not present.
    pub fn index_of(&mut self, records: &[FlightRecord], id: i64) -> i64 {
        self.ensure_fresh(records);
        self.lookup(id).map_or(-1, i64::from)
    }
}

impl Default for IdDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlightRecord;

    fn record(id: i64) -> FlightRecord {
        FlightRecord {
            id,
            x: 0,
            duration: 0,
            recalculating: false,
            airport_offset: 0,
            airport_len: 0,
        }
    }

    #[test]
    fn rebuilds_lazily_and_resolves_unknown_as_minus_one() {
        let records = vec![record(10), record(20)];
        let mut directory = IdDirectory::new();

        assert_eq!(directory.index_of(&records, 20), 1);
        assert_eq!(directory.index_of(&records, 99), -1);
    }

    #[test]
    fn dirty_flag_forces_rebuild_after_structural_change() {
        let mut records = vec![record(10)];
        let mut directory = IdDirectory::new();
        assert_eq!(directory.index_of(&records, 10), 0);

        records.insert(0, record(5));
        directory.mark_dirty();
        assert_eq!(directory.index_of(&records, 10), 1);
        assert_eq!(directory.index_of(&records, 5), 0);
    }
}
