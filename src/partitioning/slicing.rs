//! Deterministic contiguous slicing.
//!
//! `count` items are cut into `world` runs of `count / world` items, the
//! last rank absorbing the remainder. When there are fewer items than ranks
//! every rank but the last takes at most one item and the last rank always
//! takes the final one, so nothing is lost but some ranks may stay empty.

use super::PartitionId;
use std::ops::Range;

/// Index range of the items owned by `rank` when slicing `count` items over
/// `world` ranks.
pub fn slice_range(count: usize, world: usize, rank: usize) -> Range<usize> {
    if world == 0 || count == 0 || rank >= world {
        return 0..0;
    }
    if count < world {
        if rank == world - 1 {
            return count - 1..count;
        }
        if rank + 1 < count {
            return rank..rank + 1;
        }
        return 0..0;
    }
    let chunk = count / world;
    let start = rank * chunk;
    let end = if rank == world - 1 { count } else { start + chunk };
    start..end
}

/// Borrow the slice of `items` owned by `rank`.
pub fn slice_of<T>(items: &[T], world: usize, rank: usize) -> &[T] {
    &items[slice_range(items.len(), world, rank)]
}

/// Rank-per-item vector of a contiguous slicing.
pub fn slice_assignment(count: usize, world: usize) -> Vec<PartitionId> {
    let mut parts = vec![0; count];
    for rank in 0..world {
        for p in &mut parts[slice_range(count, world, rank)] {
            *p = rank;
        }
    }
    parts
}
