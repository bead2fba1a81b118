//! A sort-and-sweep spatial index over flight records.
//!
//! Flights are kept in a dense, growable array sorted ascending by X. A
//! query brackets that array with two binary searches, widened on the low
//! end by the longest live duration, then scans the narrowed range,
//! checking each flight's duration-extended X extent and its airport
//! sub-points against the query box.
//!
//! Every operation on [`FlightIndex`] takes `&mut self`: the type itself is
//! the concurrency boundary. There is no internal locking, and there is no
//! way in safe Rust to call two methods on the same index from two threads
//! at once; that misuse is only reachable by the `extern "C"` boundary,
//! which does not constrain callers the way the type system does.

mod directory;
mod error;
mod ffi;
mod index;
mod model;
mod mutator;
mod result;
mod sort;
mod store;
mod sweep;

pub use error::{FlightIndexError, Result};
pub use index::{FlightIndex, IndexConfig};
pub use model::{Airport, BoundingBox, FlightRecord, FlightUpdate, NewFlight, Position, Vec3, POSITION_SENTINEL};

pub use ffi::{
    flight_index_add, flight_index_count, flight_index_create, flight_index_destroy, flight_index_detect,
    flight_index_index_of, flight_index_initialize, flight_index_release_results, flight_index_remove,
    flight_index_update,
};
