//! # Sweep Query
//!
//! The bracketed bounding-box scan: two binary searches over the sorted X
//! column narrow a linear scan to `[lo, hi)`, then each slot in the bracket
//! is classified against the box on X-extent, Y/Z airport membership, and
//! the recalculating flag.

use crate::directory::IdDirectory;
use crate::model::BoundingBox;
use crate::sort::SortEngine;
use crate::store::DeviceStore;

/// Runs `detect` against `store`, re-sorting and refreshing the duration
/// bound first if either is stale. Returns the hit identifiers in ascending
/// slot order, and, if `auto_mark_recalculating` is set, marks every hit's
/// `recalculating` flag before returning.
pub fn detect(
    store: &mut DeviceStore,
    directory: &mut IdDirectory,
    sort: &mut SortEngine,
    box_: BoundingBox,
    auto_mark_recalculating: bool,
) -> Vec<i64> {
    sort.ensure_sorted(store, directory);
    store.refresh_longest_duration();

    let x_lo = box_.min.x - store.longest_duration();
    let x_hi = box_.max.x;

    let records = store.records();
    // first slot whose X >= x_lo
    let lo = records.partition_point(|r| r.x < x_lo);
    // first slot whose X > x_hi
    let hi = records.partition_point(|r| r.x <= x_hi);

    if lo >= hi {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for slot in lo..hi {
        let record = &store.records()[slot];
        if record.recalculating {
            continue;
        }
        if !record.x_extent_overlaps(box_.min.x, box_.max.x) {
            continue;
        }
        let inside_airport = store
            .airport_slice(record)
            .iter()
            .any(|airport| airport.within(box_.min, box_.max));
        if !inside_airport {
            continue;
        }
        hits.push(slot);
    }

    if auto_mark_recalculating {
        for &slot in &hits {
            store.records_mut()[slot].recalculating = true;
        }
    }

    hits.iter().map(|&slot| store.records()[slot].id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Airport, NewFlight, Position, Vec3};
    use crate::mutator::Mutator;

    fn box_10() -> BoundingBox {
        BoundingBox::new(Vec3::new(-10, -10, -10), Vec3::new(10, 10, 10))
    }

    fn setup(flight: NewFlight) -> (DeviceStore, IdDirectory, SortEngine) {
        let mut store = DeviceStore::new(16);
        let mut directory = IdDirectory::new();
        let mut sort = SortEngine::new();
        Mutator::add(&mut store, &mut directory, &mut sort, &[flight]).unwrap();
        (store, directory, sort)
    }

    #[test]
    fn basic_collision() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(0, vec![Airport::new(0, 0)]),
            duration: 0,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn basic_non_collision() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(20, vec![Airport::new(20, 20)]),
            duration: 0,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert!(hits.is_empty());
    }

    #[test]
    fn outside_x_negative_without_duration() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(-11, vec![Airport::new(0, 0)]),
            duration: 0,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert!(hits.is_empty());
    }

    #[test]
    fn long_duration_reaches_into_box() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(-11, vec![Airport::new(0, 0)]),
            duration: 100,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn long_duration_but_airport_y_outside() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(-11, vec![Airport::new(11, 0)]),
            duration: 100,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert!(hits.is_empty());
    }

    #[test]
    fn one_of_several_airports_inside_suffices() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(
                0,
                vec![Airport::new(0, -11), Airport::new(0, -12), Airport::new(0, 0)],
            ),
            duration: 0,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn all_airports_outside_misses() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(
                0,
                vec![
                    Airport::new(-11, -11),
                    Airport::new(-12, -12),
                    Airport::new(-13, -13),
                ],
            ),
            duration: 0,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert!(hits.is_empty());
    }

    #[test]
    fn short_duration_does_not_reach_into_box() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(-11, vec![Airport::new(0, 0)]),
            duration: 5,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert!(hits.is_empty(), "extent [-11,-6] does not reach x=-10");
    }

    #[test]
    fn purely_inside_short_duration() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(-1, vec![Airport::new(0, 0)]),
            duration: 5,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn auto_mark_recalculating_drains_on_second_call() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(0, vec![Airport::new(0, 0)]),
            duration: 0,
        });
        let first = detect(&mut store, &mut directory, &mut sort, box_10(), true);
        assert_eq!(first, vec![1]);
        let second = detect(&mut store, &mut directory, &mut sort, box_10(), true);
        assert!(second.is_empty());
    }

    #[test]
    fn max_x_is_inclusive() {
        let (mut store, mut directory, mut sort) = setup(NewFlight {
            id: 1,
            position: Position::new(10, vec![Airport::new(0, 0)]),
            duration: 0,
        });
        let hits = detect(&mut store, &mut directory, &mut sort, box_10(), false);
        assert_eq!(hits, vec![1]);
    }
}
