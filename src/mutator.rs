//! # Mutator
//!
//! Implements `initialize` / `add` / `update` / `remove` against the device
//! store, the id directory, and the sort-validity flag. Every operation here
//! is all-or-nothing at the batch granularity: failures are detected before
//! any field is written.

use std::collections::HashSet;

use crate::directory::IdDirectory;
use crate::error::{FlightIndexError, Result};
use crate::model::{FlightUpdate, NewFlight};
use crate::sort::SortEngine;
use crate::store::DeviceStore;

/// Stateless namespace for the four structural operations.
pub struct Mutator;

impl Mutator {
    /// Replaces any existing state with `batch`. An empty batch is legal and
    /// yields an empty store ready to accept `add`.
    pub fn initialize(
        store: &mut DeviceStore,
        directory: &mut IdDirectory,
        sort: &mut SortEngine,
        batch: &[NewFlight],
    ) -> Result<()> {
        let mut fresh = DeviceStore::new(batch.len());
        fresh.copy_in(batch)?;
        *store = fresh;
        sort.invalidate();
        directory.mark_dirty();
        tracing::info!(flights = batch.len(), "flight index initialized");
        Ok(())
    }

    /// Appends `batch` at the tail, growing the store if needed.
    pub fn add(
        store: &mut DeviceStore,
        directory: &mut IdDirectory,
        sort: &mut SortEngine,
        batch: &[NewFlight],
    ) -> Result<()> {
        store.copy_in(batch)?;
        sort.invalidate();
        directory.mark_dirty();
        tracing::info!(flights = batch.len(), total = store.len(), "flights added");
        Ok(())
    }

    /// Applies each update transactionally: every id is resolved first, and
    /// the whole call fails with `UnknownIdentifier` before any flight is
    /// touched if any id is missing.
    pub fn update(
        store: &mut DeviceStore,
        directory: &mut IdDirectory,
        sort: &mut SortEngine,
        batch: &[FlightUpdate],
    ) -> Result<()> {
        directory.ensure_fresh(store.records());

        let mut slots = Vec::with_capacity(batch.len());
        for entry in batch {
            let slot = directory
                .lookup(entry.id)
                .ok_or(FlightIndexError::UnknownIdentifier(entry.id))?;
            slots.push(slot);
        }

        let total_new_airports: usize = batch.iter().map(|e| e.position.airports.len()).sum();
        store.reserve_airports(total_new_airports)?;

        let mut x_changed = false;
        for (slot, entry) in slots.into_iter().zip(batch) {
            let offset = store.append_airports(&entry.position.airports);
            #[allow(clippy::cast_possible_truncation)]
            let airport_len = entry.position.airports.len() as u32;

            let record = &mut store.records_mut()[slot as usize];
            if record.x != entry.position.x {
                x_changed = true;
            }
            record.x = entry.position.x;
            record.duration = entry.duration;
            record.airport_offset = offset;
            record.airport_len = airport_len;
            record.recalculating = false;
        }

        store.bump_longest_duration(batch.iter().map(|e| e.duration).max().unwrap_or(0));

        if x_changed {
            sort.invalidate();
        }
        tracing::info!(flights = batch.len(), "flights updated");
        Ok(())
    }

    /// Tombstones and compacts the slots named by `ids`. Identifiers that are
    /// not present are silently skipped, matching the directory's batch-
    /// lookup semantics elsewhere in the engine.
    pub fn remove(
        store: &mut DeviceStore,
        directory: &mut IdDirectory,
        sort: &mut SortEngine,
        ids: &[i64],
    ) -> Result<()> {
        directory.ensure_fresh(store.records());

        let tombstones: HashSet<u32> = ids.iter().filter_map(|id| directory.lookup(*id)).collect();
        if tombstones.is_empty() {
            return Ok(());
        }

        store.compact_removing(&tombstones);
        directory.mark_dirty();
        sort.invalidate();
        store.mark_longest_duration_dirty();
        tracing::info!(removed = tombstones.len(), remaining = store.len(), "flights removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Airport, Position};

    fn new_flight(id: i64, x: i64, duration: i64) -> NewFlight {
        NewFlight {
            id,
            position: Position::new(x, vec![Airport::new(0, 0)]),
            duration,
        }
    }

    #[test]
    fn update_is_all_or_nothing_on_unknown_id() {
        let mut store = DeviceStore::new(16);
        let mut directory = IdDirectory::new();
        let mut sort = SortEngine::new();
        Mutator::add(&mut store, &mut directory, &mut sort, &[new_flight(1, 0, 0)]).unwrap();

        let batch = vec![
            FlightUpdate {
                id: 1,
                position: Position::new(5, vec![Airport::new(0, 0)]),
                duration: 0,
            },
            FlightUpdate {
                id: 999,
                position: Position::new(5, vec![Airport::new(0, 0)]),
                duration: 0,
            },
        ];
        let err = Mutator::update(&mut store, &mut directory, &mut sort, &batch).unwrap_err();
        assert_eq!(err, FlightIndexError::UnknownIdentifier(999));
        assert_eq!(store.records()[0].x, 0, "flight 1 must be untouched");
    }

    #[test]
    fn update_resets_recalculating_flag() {
        let mut store = DeviceStore::new(16);
        let mut directory = IdDirectory::new();
        let mut sort = SortEngine::new();
        Mutator::add(&mut store, &mut directory, &mut sort, &[new_flight(1, 0, 0)]).unwrap();
        store.records_mut()[0].recalculating = true;

        Mutator::update(
            &mut store,
            &mut directory,
            &mut sort,
            &[FlightUpdate {
                id: 1,
                position: Position::new(0, vec![Airport::new(0, 0)]),
                duration: 0,
            }],
        )
        .unwrap();

        assert!(!store.records()[0].recalculating);
    }

    #[test]
    fn remove_compacts_and_ignores_unknown_ids() {
        let mut store = DeviceStore::new(16);
        let mut directory = IdDirectory::new();
        let mut sort = SortEngine::new();
        Mutator::add(
            &mut store,
            &mut directory,
            &mut sort,
            &[new_flight(1, 0, 0), new_flight(2, 1, 0), new_flight(3, 2, 0)],
        )
        .unwrap();

        Mutator::remove(&mut store, &mut directory, &mut sort, &[2, 404]).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.records().iter().any(|r| r.id == 1));
        assert!(store.records().iter().any(|r| r.id == 3));
    }
}
