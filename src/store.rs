//! # Device Store
//!
//! Owns the dense flight array and the airport sidecar arena. Growth is
//! geometric and explicit, mirroring the discipline a device-resident buffer
//! needs: capacity is grown ahead of a write, never implicitly on read.

use std::collections::HashSet;

use crate::error::{FlightIndexError, Result};
use crate::model::{Airport, FlightRecord, NewFlight};

/// Minimum flight capacity requested on first population when the caller's
/// batch is empty.
const MIN_CAPACITY: usize = 64;

/// The growable, dense flight array plus its airport sidecar.
pub struct DeviceStore {
    records: Vec<FlightRecord>,
    airports: Vec<Airport>,
    longest_duration: i64,
    longest_duration_dirty: bool,
    min_capacity: usize,
}

impl DeviceStore {
    /// Creates an empty store. `min_capacity` is the capacity floor used when
    /// the first populating batch is itself empty.
    #[must_use]
    pub fn new(min_capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            airports: Vec::new(),
            longest_duration: 0,
            longest_duration_dirty: false,
            min_capacity: min_capacity.max(1),
        }
    }

    /// Number of live flights (slots 0..N-1).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store currently holds no live flights.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The live flight slots, in their current (possibly unsorted) order.
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[FlightRecord] {
        &self.records
    }

    /// Mutable access to the live flight slots.
    #[inline]
    pub fn records_mut(&mut self) -> &mut [FlightRecord] {
        &mut self.records
    }

    /// The airport sub-points owned by `record`.
    #[inline]
    #[must_use]
    pub fn airport_slice(&self, record: &FlightRecord) -> &[Airport] {
        let start = record.airport_offset as usize;
        let end = start + record.airport_len as usize;
        &self.airports[start..end]
    }

    /// Current upper bound on duration over all live flights.
    #[inline]
    #[must_use]
    pub fn longest_duration(&self) -> i64 {
        self.longest_duration
    }

    /// Ensures the flight array can hold at least `n` slots without further
    /// reallocation, doubling from the current capacity (or `min_capacity`,
    /// whichever is larger) until `n` fits.
    pub fn ensure_capacity(&mut self, n: usize) -> Result<()> {
        let from = self.records.capacity();
        if from >= n {
            return Ok(());
        }
        let mut target = from.max(self.min_capacity).max(1);
        while target < n {
            target *= 2;
        }
        let additional = target - self.records.len();
        self.records
            .try_reserve_exact(additional)
            .map_err(|_| FlightIndexError::OutOfDeviceMemory { requested: target })?;
        tracing::debug!(from, to = target, "device store grew flight capacity");
        Ok(())
    }

    /// Bulk-copies a host batch into tail slots, placing airport payloads
    /// end-to-end in the sidecar and recording each record's (offset, len).
    ///
    /// All-or-nothing: capacity and airport-arena reservations are validated
    /// up front, so a failure never leaves a partially-appended batch.
    pub fn copy_in(&mut self, batch: &[NewFlight]) -> Result<()> {
        if batch.is_empty() {
            self.ensure_capacity(self.records.len().max(self.min_capacity))?;
            return Ok(());
        }

        self.ensure_capacity(self.records.len() + batch.len())?;

        let total_airports: usize = batch.iter().map(|f| f.position.airports.len()).sum();
        let target_airports = self.airports.len() + total_airports;
        self.airports
            .try_reserve_exact(total_airports)
            .map_err(|_| FlightIndexError::OutOfDeviceMemory { requested: target_airports })?;

        for flight in batch {
            let offset = self.airports.len() as u32;
            self.airports.extend_from_slice(&flight.position.airports);
            self.records.push(FlightRecord {
                id: flight.id,
                x: flight.position.x,
                duration: flight.duration,
                recalculating: false,
                airport_offset: offset,
                #[allow(clippy::cast_possible_truncation)]
                airport_len: flight.position.airports.len() as u32,
            });
            self.longest_duration = self.longest_duration.max(flight.duration);
        }

        Ok(())
    }

    /// Reserves room in the airport sidecar for `additional` more sub-points
    /// without mutating any existing flight.
    pub fn reserve_airports(&mut self, additional: usize) -> Result<()> {
        let target = self.airports.len() + additional;
        self.airports
            .try_reserve_exact(additional)
            .map_err(|_| FlightIndexError::OutOfDeviceMemory { requested: target })
    }

    /// Appends `airports` to the sidecar arena (capacity must already have
    /// been reserved via [`Self::reserve_airports`]) and returns the offset
    /// at which they were written.
    #[must_use]
    pub fn append_airports(&mut self, airports: &[Airport]) -> u32 {
        let offset = self.airports.len() as u32;
        self.airports.extend_from_slice(airports);
        offset
    }

    /// Bumps the duration upper bound; durations only ever grow this value
    /// immediately, since a bigger duration can never be covered by the old
    /// bound.
    pub fn bump_longest_duration(&mut self, duration: i64) {
        self.longest_duration = self.longest_duration.max(duration);
    }

    /// Marks the duration upper bound as possibly stale (too high) after a
    /// removal. The existing value remains a valid upper bound until the next
    /// recompute, so there is no correctness requirement to do this eagerly.
    pub fn mark_longest_duration_dirty(&mut self) {
        self.longest_duration_dirty = true;
    }

    /// Recomputes the duration upper bound as the exact maximum over live
    /// flights, if it was marked dirty by a prior removal.
    pub fn refresh_longest_duration(&mut self) {
        if !self.longest_duration_dirty {
            return;
        }
        self.longest_duration = self.records.iter().map(|r| r.duration).max().unwrap_or(0);
        self.longest_duration_dirty = false;
        tracing::debug!(longest_duration = self.longest_duration, "recomputed longest duration after removal");
    }

    /// Stably sorts the flight array ascending by X, repacking the airport
    /// sidecar densely in the new order. This reclaims any dead airport
    /// ranges left behind by prior updates.
    pub fn sort_by_x(&mut self) {
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        order.sort_by_key(|&i| self.records[i].x);

        let mut new_records = Vec::with_capacity(self.records.len());
        let mut new_airports = Vec::with_capacity(self.airports.len());
        for &i in &order {
            let record = self.records[i];
            let airports = self.airport_slice(&record);
            let offset = new_airports.len() as u32;
            new_airports.extend_from_slice(airports);
            new_records.push(FlightRecord {
                airport_offset: offset,
                ..record
            });
        }

        self.records = new_records;
        self.airports = new_airports;
    }

    /// Removes the flight slots named by `tombstones` (slot indices, not
    /// identifiers), compacting the survivors to the prefix `0..N'` in one
    /// pass and repacking their airport ranges.
    pub fn compact_removing(&mut self, tombstones: &HashSet<u32>) {
        let mut new_records = Vec::with_capacity(self.records.len() - tombstones.len());
        let mut new_airports = Vec::with_capacity(self.airports.len());
        for (slot, record) in self.records.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            if tombstones.contains(&(slot as u32)) {
                continue;
            }
            let airports = self.airport_slice(record);
            let offset = new_airports.len() as u32;
            new_airports.extend_from_slice(airports);
            new_records.push(FlightRecord {
                airport_offset: offset,
                ..*record
            });
        }
        self.records = new_records;
        self.airports = new_airports;
    }
}
