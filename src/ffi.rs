#![allow(unsafe_code)]
//! # C ABI Boundary
//!
//! A thin, panic-safe shim around [`crate::FlightIndex`]. Every function here
//! takes and returns plain data (an opaque handle, flat arrays, primitive
//! results) and never lets a panic unwind across the boundary: a caller that
//! is not Rust has no frame to unwind into.

use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::FlightIndexError;
use crate::index::FlightIndex;
use crate::model::{Airport, BoundingBox, FlightUpdate, NewFlight, Position, Vec3, POSITION_SENTINEL};

/// Creates a new index and returns an opaque handle, or null if construction
/// panicked (it should not, but the boundary degrades rather than unwinds).
#[no_mangle]
pub extern "C" fn flight_index_create() -> *mut c_void {
    let result = catch_unwind(|| Box::into_raw(Box::new(FlightIndex::new())).cast::<c_void>());
    result.unwrap_or_else(|_| {
        tracing::error!("flight_index_create panicked");
        std::ptr::null_mut()
    })
}

/// Destroys an index created by [`flight_index_create`]. Idempotent on null.
///
/// # Safety
/// `handle` must be either null or a pointer previously returned by
/// [`flight_index_create`] that has not already been destroyed.
#[no_mangle]
pub unsafe extern "C" fn flight_index_destroy(handle: *mut c_void) {
    if handle.is_null() {
        return;
    }
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        drop(Box::from_raw(handle.cast::<FlightIndex>()));
    }));
    if outcome.is_err() {
        tracing::error!("flight_index_destroy panicked; handle leaked to avoid a double free");
    }
}

/// Live flight count, or `-1` on a null/invalid handle.
///
/// # Safety
/// `handle` must be a live pointer from [`flight_index_create`].
#[no_mangle]
pub unsafe extern "C" fn flight_index_count(handle: *mut c_void) -> i64 {
    let Some(index) = as_index(handle) else {
        return -1;
    };
    run(|| Ok(index.count() as i64)).unwrap_or(-1)
}

/// Slot index of `id`, or `-1` if absent or the handle is invalid.
///
/// # Safety
/// `handle` must be a live pointer from [`flight_index_create`].
#[no_mangle]
pub unsafe extern "C" fn flight_index_index_of(handle: *mut c_void, id: i64) -> i64 {
    let Some(index) = as_index(handle) else {
        return -1;
    };
    run(|| Ok(index.index_of(id))).unwrap_or(-1)
}

/// # Safety
/// `handle` must be a live pointer from [`flight_index_create`]. `ids`,
/// `positions`, and `durations` must each be valid for the declared lengths
/// (or null when their corresponding count is zero).
#[no_mangle]
pub unsafe extern "C" fn flight_index_initialize(
    handle: *mut c_void,
    ids: *const i64,
    positions: *const i64,
    durations: *const i64,
    flight_count: i64,
    position_len: i64,
) -> bool {
    apply_batch(handle, ids, positions, durations, flight_count, position_len, FlightIndex::initialize)
}

/// # Safety
/// See [`flight_index_initialize`].
#[no_mangle]
pub unsafe extern "C" fn flight_index_add(
    handle: *mut c_void,
    ids: *const i64,
    positions: *const i64,
    durations: *const i64,
    flight_count: i64,
    position_len: i64,
) -> bool {
    apply_batch(handle, ids, positions, durations, flight_count, position_len, FlightIndex::add)
}

unsafe fn apply_batch(
    handle: *mut c_void,
    ids: *const i64,
    positions: *const i64,
    durations: *const i64,
    flight_count: i64,
    position_len: i64,
    op: fn(&mut FlightIndex, &[NewFlight]) -> crate::error::Result<()>,
) -> bool {
    let Some(index) = as_index(handle) else {
        return false;
    };
    run(|| {
        let batch = decode_new_flights(ids, positions, durations, flight_count, position_len)?;
        op(index, &batch)
    })
    .is_some()
}

/// # Safety
/// `handle` must be a live pointer from [`flight_index_create`]. `ids`,
/// `positions`, and `durations` must each be valid for the declared lengths.
#[no_mangle]
pub unsafe extern "C" fn flight_index_update(
    handle: *mut c_void,
    ids: *const i64,
    positions: *const i64,
    durations: *const i64,
    update_count: i64,
    position_len: i64,
) -> bool {
    let Some(index) = as_index(handle) else {
        return false;
    };
    run(|| {
        let batch = decode_updates(ids, positions, durations, update_count, position_len)?;
        index.update(&batch)
    })
    .is_some()
}

/// # Safety
/// `handle` must be a live pointer from [`flight_index_create`]. `ids` must be
/// valid for `count` elements (or null if `count == 0`).
#[no_mangle]
pub unsafe extern "C" fn flight_index_remove(handle: *mut c_void, ids: *const i64, count: i64) -> bool {
    let Some(index) = as_index(handle) else {
        return false;
    };
    run(|| {
        let ids = decode_flat_i64(ids, count, "remove identifier array")?;
        index.remove(&ids)
    })
    .is_some()
}

/// Returns an engine-owned buffer (word 0 is the hit count, the rest are
/// identifiers), or null on failure. Release it with
/// [`flight_index_release_results`].
///
/// # Safety
/// `handle` must be a live pointer from [`flight_index_create`]. `box_min`
/// and `box_max` must each point at 3 valid `i64`s.
#[no_mangle]
pub unsafe extern "C" fn flight_index_detect(
    handle: *mut c_void,
    box_min: *const i64,
    box_max: *const i64,
    auto_mark_recalculating: bool,
) -> *mut i64 {
    let Some(index) = as_index(handle) else {
        return std::ptr::null_mut();
    };
    run(|| {
        let min = decode_vec3(box_min, "boxMin")?;
        let max = decode_vec3(box_max, "boxMax")?;
        index.detect(BoundingBox::new(min, max), auto_mark_recalculating)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// # Safety
/// `handle` must be a live pointer from [`flight_index_create`]. `results`
/// must either be null or a pointer previously returned by
/// [`flight_index_detect`] on this same handle.
#[no_mangle]
pub unsafe extern "C" fn flight_index_release_results(handle: *mut c_void, results: *mut i64) -> bool {
    let Some(index) = as_index(handle) else {
        return false;
    };
    run(|| index.release_results(results)).is_some()
}

unsafe fn as_index<'a>(handle: *mut c_void) -> Option<&'a mut FlightIndex> {
    if handle.is_null() {
        return None;
    }
    Some(&mut *handle.cast::<FlightIndex>())
}

/// Runs `body`, catching any panic and logging both panics and propagated
/// errors, collapsing either into `None`.
///
/// `body` routinely closes over `&mut FlightIndex`, which is not `UnwindSafe`
/// (a panic mid-mutation could leave it half-written); the boundary accepts
/// that risk deliberately; a poisoned index is no worse than the process the
/// caller would otherwise have crashed.
fn run<T>(body: impl FnOnce() -> crate::error::Result<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "flight index operation failed");
            None
        }
        Err(_) => {
            tracing::error!("flight index operation panicked at the FFI boundary");
            None
        }
    }
}

unsafe fn decode_flat_i64(ptr: *const i64, count: i64, what: &'static str) -> crate::error::Result<Vec<i64>> {
    if count < 0 {
        return Err(FlightIndexError::MalformedBatch { reason: what });
    }
    #[allow(clippy::cast_sign_loss)]
    let count = count as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(FlightIndexError::MalformedBatch { reason: what });
    }
    Ok(std::slice::from_raw_parts(ptr, count).to_vec())
}

unsafe fn decode_vec3(ptr: *const i64, what: &'static str) -> crate::error::Result<Vec3> {
    if ptr.is_null() {
        return Err(FlightIndexError::MalformedBatch { reason: what });
    }
    let slice = std::slice::from_raw_parts(ptr, 3);
    Ok(Vec3::new(slice[0], slice[1], slice[2]))
}

/// Parses the flat `positions` stream into one [`Position`] per flight: an X
/// value, a run of `(y, z)` pairs, then [`POSITION_SENTINEL`]. Fails with
/// `MalformedBatch` if the sentinel is missing, appears before any airport
/// pair has been read, or the array is not exactly consumed.
unsafe fn decode_positions(positions: *const i64, flight_count: usize, position_len: i64) -> crate::error::Result<Vec<Position>> {
    if flight_count == 0 {
        return Ok(Vec::new());
    }
    if position_len < 0 {
        return Err(FlightIndexError::MalformedBatch { reason: "negative position-array length" });
    }
    #[allow(clippy::cast_sign_loss)]
    let position_len = position_len as usize;
    if positions.is_null() {
        return Err(FlightIndexError::MalformedBatch { reason: "null positions array" });
    }
    let flat = std::slice::from_raw_parts(positions, position_len);

    let mut cursor = 0usize;
    let mut out = Vec::with_capacity(flight_count);
    for _ in 0..flight_count {
        let x = *flat
            .get(cursor)
            .ok_or(FlightIndexError::MalformedBatch { reason: "positions array ended before X value" })?;
        cursor += 1;

        let mut airports = Vec::new();
        loop {
            let value = *flat
                .get(cursor)
                .ok_or(FlightIndexError::MalformedBatch { reason: "positions array ended without sentinel" })?;
            if value == POSITION_SENTINEL {
                cursor += 1;
                break;
            }
            let z = *flat
                .get(cursor + 1)
                .ok_or(FlightIndexError::MalformedBatch { reason: "positions array ended mid airport pair" })?;
            airports.push(Airport::new(value, z));
            cursor += 2;
        }

        if airports.is_empty() {
            return Err(FlightIndexError::MalformedBatch { reason: "sentinel before any airport pair" });
        }

        out.push(Position::new(x, airports));
    }

    if cursor != flat.len() {
        return Err(FlightIndexError::MalformedBatch { reason: "positions array not fully consumed" });
    }

    Ok(out)
}

unsafe fn decode_new_flights(
    ids: *const i64,
    positions: *const i64,
    durations: *const i64,
    flight_count: i64,
    position_len: i64,
) -> crate::error::Result<Vec<NewFlight>> {
    if flight_count < 0 {
        return Err(FlightIndexError::MalformedBatch { reason: "negative flight count" });
    }
    #[allow(clippy::cast_sign_loss)]
    let count = flight_count as usize;

    let ids = decode_flat_i64(ids, flight_count, "identifier array")?;
    let durations = decode_flat_i64(durations, flight_count, "duration array")?;
    let positions = decode_positions(positions, count, position_len)?;

    if ids.len() != count || durations.len() != count || positions.len() != count {
        return Err(FlightIndexError::MalformedBatch { reason: "array length mismatch" });
    }

    Ok(ids
        .into_iter()
        .zip(positions)
        .zip(durations)
        .map(|((id, position), duration)| NewFlight { id, position, duration })
        .collect())
}

unsafe fn decode_updates(
    ids: *const i64,
    positions: *const i64,
    durations: *const i64,
    update_count: i64,
    position_len: i64,
) -> crate::error::Result<Vec<FlightUpdate>> {
    if update_count < 0 {
        return Err(FlightIndexError::MalformedBatch { reason: "negative update count" });
    }
    #[allow(clippy::cast_sign_loss)]
    let count = update_count as usize;

    let ids = decode_flat_i64(ids, update_count, "identifier array")?;
    let durations = decode_flat_i64(durations, update_count, "duration array")?;
    let positions = decode_positions(positions, count, position_len)?;

    if ids.len() != count || durations.len() != count || positions.len() != count {
        return Err(FlightIndexError::MalformedBatch { reason: "array length mismatch" });
    }

    Ok(ids
        .into_iter()
        .zip(positions)
        .zip(durations)
        .map(|((id, position), duration)| FlightUpdate { id, position, duration })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_destroy_round_trip() {
        let handle = flight_index_create();
        assert!(!handle.is_null());
        unsafe { flight_index_destroy(handle) };
    }

    #[test]
    fn destroy_null_is_noop() {
        unsafe { flight_index_destroy(std::ptr::null_mut()) };
    }

    #[test]
    fn add_then_detect_then_release() {
        let handle = flight_index_create();
        let ids = [1i64];
        let positions = [0i64, 0, 0, POSITION_SENTINEL];
        let durations = [0i64];

        unsafe {
            assert!(flight_index_add(handle, ids.as_ptr(), positions.as_ptr(), durations.as_ptr(), 1, 4));
            assert_eq!(flight_index_count(handle), 1);
            assert_eq!(flight_index_index_of(handle, 1), 0);

            let box_min = [-10i64, -10, -10];
            let box_max = [10i64, 10, 10];
            let result = flight_index_detect(handle, box_min.as_ptr(), box_max.as_ptr(), false);
            assert!(!result.is_null());
            assert_eq!(*result, 1);
            assert!(flight_index_release_results(handle, result));

            flight_index_destroy(handle);
        }
    }

    #[test]
    fn malformed_batch_missing_sentinel_fails() {
        let handle = flight_index_create();
        let ids = [1i64];
        let positions = [0i64, 0, 0];
        let durations = [0i64];

        unsafe {
            assert!(!flight_index_add(handle, ids.as_ptr(), positions.as_ptr(), durations.as_ptr(), 1, 3));
            flight_index_destroy(handle);
        }
    }

    #[test]
    fn operations_before_add_report_not_initialized() {
        let handle = flight_index_create();
        unsafe {
            let box_min = [0i64; 3];
            let box_max = [0i64; 3];
            assert!(flight_index_detect(handle, box_min.as_ptr(), box_max.as_ptr(), false).is_null());
            flight_index_destroy(handle);
        }
    }
}
