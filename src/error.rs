//! # Error Types
//!
//! All errors that can occur at the flight index's public boundary.

use thiserror::Error;

/// Errors that can occur while operating a [`crate::FlightIndex`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlightIndexError {
    /// Growing the flight array or the airport sidecar failed.
    #[error("out of device memory: requested capacity for {requested} flights")]
    OutOfDeviceMemory {
        /// The capacity that was being requested when allocation failed.
        requested: usize,
    },

    /// A flat boundary array was internally inconsistent.
    #[error("malformed batch: {reason}")]
    MalformedBatch {
        /// Human-readable description of what was inconsistent.
        reason: &'static str,
    },

    /// `update` referenced an id that is not present in the store.
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(i64),

    /// `release_results` was called on an untracked or already-released pointer.
    #[error("invalid result handle")]
    InvalidResultHandle,

    /// `detect` / `update` / `remove` was called before the first `initialize` or `add`.
    #[error("flight index not initialized")]
    NotInitialized,
}

/// Result type for flight index operations.
pub type Result<T> = std::result::Result<T, FlightIndexError>;
