//! Level layout arithmetic over `(num_items, node_size)`.
//!
//! Pure functions: the same two numbers always give the same layout, which
//! is how a reader locates levels inside a serialized tree it has never seen.

use std::ops::Range;

use super::rtree_constants::{MIN_NODE_SIZE, NODE_ITEM_LEN};
use super::rtree_types::{SpatialError, SpatialResult};

/// Raises a branching factor below the minimum to [`MIN_NODE_SIZE`].
///
/// With a factor of 1 (or 0) the level count would never shrink and level
/// generation would not terminate.
pub fn clamp_node_size(node_size: u16) -> u16 {
    if node_size < MIN_NODE_SIZE {
        log::debug!(
            "Clamping node size {} to minimum {}",
            node_size,
            MIN_NODE_SIZE
        );
        MIN_NODE_SIZE
    } else {
        node_size
    }
}

/// Node count of every level, leaves first, root (count 1) last.
fn level_counts(num_items: u64, node_size: u16) -> Vec<u64> {
    if num_items == 0 {
        return Vec::new();
    }
    let node_size = u64::from(clamp_node_size(node_size));

    let mut counts = vec![num_items];
    let mut n = num_items;
    while n > 1 {
        n = n.div_ceil(node_size);
        counts.push(n);
    }
    counts
}

fn too_large(num_items: u64, node_size: u16) -> SpatialError {
    SpatialError::InvalidOperation(format!(
        "Tree of {} items with node size {} exceeds the addressable range",
        num_items, node_size
    ))
}

/// Index range of every level in the flat node array.
///
/// Levels are listed leaf level first and root level last; ranges are
/// contiguous and together cover `0..num_nodes`. Zero items yield no levels.
/// Fails with [`SpatialError::InvalidOperation`] when the total node count
/// does not fit in a `u64`.
///
/// # Example
/// ```
/// use packed_rtree::try_generate_level_bounds;
///
/// let bounds = try_generate_level_bounds(4, 2).unwrap();
/// assert_eq!(bounds, vec![0..4, 4..6, 6..7]);
/// assert!(try_generate_level_bounds(u64::MAX, 2).is_err());
/// ```
pub fn try_generate_level_bounds(num_items: u64, node_size: u16) -> SpatialResult<Vec<Range<u64>>> {
    let mut start: u64 = 0;
    level_counts(num_items, node_size)
        .into_iter()
        .map(|count| {
            let end = start
                .checked_add(count)
                .ok_or_else(|| too_large(num_items, node_size))?;
            let bounds = start..end;
            start = end;
            Ok(bounds)
        })
        .collect()
}

/// Serialized size in bytes, or an error when it does not fit in a `u64`.
pub fn try_size(num_items: u64, node_size: u16) -> SpatialResult<u64> {
    let nodes = try_generate_level_bounds(num_items, node_size)?
        .last()
        .map_or(0, |root| root.end);
    nodes
        .checked_mul(NODE_ITEM_LEN as u64)
        .ok_or_else(|| too_large(num_items, node_size))
}

/// Index range of every level in the flat node array.
///
/// Same layout as [`try_generate_level_bounds`]. Item counts whose node total
/// overflows a `u64` (more than about `u64::MAX / 2` items) saturate at
/// `u64::MAX` instead of failing.
///
/// # Example
/// ```
/// use packed_rtree::generate_level_bounds;
///
/// let bounds = generate_level_bounds(4, 2);
/// assert_eq!(bounds, vec![0..4, 4..6, 6..7]);
/// ```
pub fn generate_level_bounds(num_items: u64, node_size: u16) -> Vec<Range<u64>> {
    let mut start: u64 = 0;
    level_counts(num_items, node_size)
        .into_iter()
        .map(|count| {
            let end = start.saturating_add(count);
            let bounds = start..end;
            start = end;
            bounds
        })
        .collect()
}

/// Total node count (all levels) of a tree over `num_items` leaves.
///
/// Saturates at `u64::MAX`.
pub fn num_nodes(num_items: u64, node_size: u16) -> u64 {
    level_counts(num_items, node_size)
        .into_iter()
        .fold(0u64, |total, count| total.saturating_add(count))
}

/// Serialized size in bytes of a tree over `num_items` leaves.
///
/// Saturates at `u64::MAX`; use [`try_size`] to detect overflow.
pub fn size(num_items: u64, node_size: u16) -> u64 {
    num_nodes(num_items, node_size).saturating_mul(NODE_ITEM_LEN as u64)
}
