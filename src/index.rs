//! # Flight Index
//!
//! The composition root: owns the device store, id directory, sort engine,
//! and result-buffer registry, and exposes the public, safe-Rust operations.

use crate::directory::IdDirectory;
use crate::error::{FlightIndexError, Result};
use crate::model::{BoundingBox, FlightUpdate, NewFlight};
use crate::mutator::Mutator;
use crate::result::ResultRegistry;
use crate::sort::SortEngine;
use crate::store::DeviceStore;
use crate::sweep;

/// Capacity policy for a [`FlightIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexConfig {
    /// Capacity floor used when the first populating batch is itself empty.
    pub min_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { min_capacity: 1024 }
    }
}

/// A persistent, sort-and-sweep spatial index over flight records.
///
/// Every operation is single-threaded and synchronous: it returns only after
/// all work it performed has completed, and there is no supported way to
/// mutate the same index concurrently from two threads (see crate docs).
pub struct FlightIndex {
    store: DeviceStore,
    directory: IdDirectory,
    sort: SortEngine,
    results: ResultRegistry,
    initialized: bool,
}

impl FlightIndex {
    /// Creates a new, empty index with the default capacity policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Creates a new, empty index with an explicit capacity policy.
    #[must_use]
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            store: DeviceStore::new(config.min_capacity),
            directory: IdDirectory::new(),
            sort: SortEngine::new(),
            results: ResultRegistry::new(),
            initialized: false,
        }
    }

    /// The number of currently live flights.
    #[must_use]
    pub fn count(&self) -> usize {
        self.store.len()
    }

    /// Resolves a flight identifier to its current slot, rebuilding the
    /// directory first if it is stale. Returns `-1` if the identifier is not
    /// present.
    pub fn index_of(&mut self, id: i64) -> i64 {
        self.directory.index_of(self.store.records(), id)
    }

    /// Replaces any existing state with `batch`. An empty batch is legal.
    pub fn initialize(&mut self, batch: &[NewFlight]) -> Result<()> {
        Mutator::initialize(&mut self.store, &mut self.directory, &mut self.sort, batch)?;
        self.initialized = true;
        Ok(())
    }

    /// Appends `batch` at the tail, growing the store if needed.
    pub fn add(&mut self, batch: &[NewFlight]) -> Result<()> {
        Mutator::add(&mut self.store, &mut self.directory, &mut self.sort, batch)?;
        self.initialized = true;
        Ok(())
    }

    /// Applies each update transactionally. Fails with `UnknownIdentifier`
    /// before touching any flight if any id in `batch` is not present, and
    /// with `NotInitialized` if called before the first `initialize`/`add`.
    pub fn update(&mut self, batch: &[FlightUpdate]) -> Result<()> {
        self.require_initialized()?;
        Mutator::update(&mut self.store, &mut self.directory, &mut self.sort, batch)
    }

    /// Removes each flight in `ids` (unknown ids are ignored), compacting the
    /// store in one pass.
    pub fn remove(&mut self, ids: &[i64]) -> Result<()> {
        self.require_initialized()?;
        Mutator::remove(&mut self.store, &mut self.directory, &mut self.sort, ids)
    }

    /// Runs the bracketed sweep against `box_`, returning a buffer handle
    /// owned by this index. The caller must return it via
    /// [`Self::release_results`].
    pub fn detect(&mut self, box_: BoundingBox, auto_mark_recalculating: bool) -> Result<*mut i64> {
        self.require_initialized()?;
        let hits = sweep::detect(&mut self.store, &mut self.directory, &mut self.sort, box_, auto_mark_recalculating);
        Ok(self.results.alloc(&hits))
    }

    /// Returns a buffer previously obtained from [`Self::detect`].
    pub fn release_results(&mut self, ptr: *mut i64) -> Result<()> {
        self.results.release(ptr)
    }

    fn require_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(FlightIndexError::NotInitialized)
        }
    }
}

impl Default for FlightIndex {
    fn default() -> Self {
        Self::new()
    }
}
