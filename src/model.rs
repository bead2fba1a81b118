//! # Data Model
//!
//! Types shared between the device store, the sweep, and the boundary shim.

use bytemuck::{Pod, Zeroable};

/// Sentinel value terminating a flight's airport run in the flat boundary encoding.
///
/// Fixed by the original wire format; implementations must not use it as a
/// valid Y coordinate.
pub const POSITION_SENTINEL: i64 = -1337;

/// A point in the (X, Y, Z) coordinate space.
///
/// X is unix-time-seconds in the original deployment but the engine itself is
/// axis-agnostic.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Vec3 {
    /// Time coordinate.
    pub x: i64,
    /// Weather coordinate.
    pub y: i64,
    /// Airport coordinate.
    pub z: i64,
}

impl Vec3 {
    /// Creates a new coordinate triple.
    #[must_use]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// A closed axis-aligned box on (X, Y, Z).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BoundingBox {
    /// Lower corner (inclusive on all three axes).
    pub min: Vec3,
    /// Upper corner (inclusive on all three axes).
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a new bounding box from its two corners.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }
}

/// A flight's secondary-axis sub-point: a weather level and an airport ICAO.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Airport {
    /// Weather level.
    pub y: i64,
    /// Airport ICAO.
    pub z: i64,
}

impl Airport {
    /// Creates a new airport sub-point.
    #[must_use]
    pub const fn new(y: i64, z: i64) -> Self {
        Self { y, z }
    }

    #[inline]
    #[must_use]
    pub(crate) fn within(&self, min: Vec3, max: Vec3) -> bool {
        self.y >= min.y && self.y <= max.y && self.z >= min.z && self.z <= max.z
    }
}

/// A flight's position: an X coordinate plus one or more airport sub-points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Time coordinate.
    pub x: i64,
    /// Airport sub-points, at least one for a live flight.
    pub airports: Vec<Airport>,
}

impl Position {
    /// Creates a new position. Panics if `airports` is empty; a flight always
    /// has at least one airport sub-point.
    #[must_use]
    pub fn new(x: i64, airports: Vec<Airport>) -> Self {
        assert!(!airports.is_empty(), "a flight needs at least one airport");
        Self { x, airports }
    }
}

/// A flight to be inserted via [`crate::FlightIndex::initialize`] or
/// [`crate::FlightIndex::add`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewFlight {
    /// Caller-chosen identifier; need not be dense or positive.
    pub id: i64,
    /// Position at insertion time.
    pub position: Position,
    /// Extent along the X axis.
    pub duration: i64,
}

/// A single-flight update applied via [`crate::FlightIndex::update`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlightUpdate {
    /// Identifier of the flight being updated; must already be present.
    pub id: i64,
    /// New position.
    pub position: Position,
    /// New duration.
    pub duration: i64,
}

/// A record in the device-resident flight array.
///
/// The airport sub-points are not inlined here; `airport_offset`/`airport_len`
/// index into the store's airport sidecar, mirroring how a GPU-resident
/// record indexes into a shared instance buffer rather than carrying a
/// pointer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlightRecord {
    /// Caller-chosen identifier.
    pub id: i64,
    /// Time coordinate.
    pub x: i64,
    /// Extent along the X axis.
    pub duration: i64,
    /// Excluded from the sweep until the next `update` clears this.
    pub recalculating: bool,
    /// Offset into the airport sidecar.
    pub airport_offset: u32,
    /// Number of airport sub-points owned by this flight.
    pub airport_len: u32,
}

impl FlightRecord {
    #[inline]
    #[must_use]
    pub(crate) fn x_extent_overlaps(&self, min_x: i64, max_x: i64) -> bool {
        min_x <= self.x + self.duration && self.x <= max_x
    }
}
