//! Hilbert curve utilities for spatial locality.
//!
//! The Hilbert curve is a continuous space-filling curve that maps 2D grid
//! cells to a 1D index while keeping neighbouring cells close on the curve.
//! Sorting leaves by the Hilbert index of their centers is what clusters
//! nearby items into the same packed nodes, and the same byte ranges on disk.
//!
//! The curve is evaluated on a fixed 16-bit grid per axis ([`HILBERT_MAX`]),
//! giving a 32-bit index.

use std::cmp::Reverse;

use crate::node_item::{calc_extent, Bounded, NodeItem};

/// Grid resolution per axis: coordinates are normalized into `[0, HILBERT_MAX]`.
pub const HILBERT_MAX: u32 = (1 << 16) - 1;

/// Spreads the low 16 bits of `x` so that bit `i` lands on bit `2i`.
fn interleave(mut x: u32) -> u32 {
    x = (x | (x << 8)) & 0x00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333;
    x = (x | (x << 1)) & 0x5555_5555;
    x
}

/// Maps a cell of the 16-bit grid to its position on the Hilbert curve.
///
/// Branch-free prefix-scan formulation (public domain,
/// <https://github.com/rawrunprotected/hilbert_curves>). Only the low 16 bits
/// of each coordinate are significant.
#[allow(non_snake_case)]
pub fn hilbert(x: u32, y: u32) -> u32 {
    // Initial prefix scan round, prime with x and y
    let mut a = x ^ y;
    let mut b = 0xFFFF ^ a;
    let mut c = 0xFFFF ^ (x | y);
    let mut d = x & (y ^ 0xFFFF);

    let mut A = a | (b >> 1);
    let mut B = (a >> 1) ^ a;
    let mut C = ((c >> 1) ^ (b & (d >> 1))) ^ c;
    let mut D = ((a & (c >> 1)) ^ (d >> 1)) ^ d;

    a = A;
    b = B;
    c = C;
    d = D;
    A = (a & (a >> 2)) ^ (b & (b >> 2));
    B = (a & (b >> 2)) ^ (b & ((a ^ b) >> 2));
    C ^= (a & (c >> 2)) ^ (b & (d >> 2));
    D ^= (b & (c >> 2)) ^ ((a ^ b) & (d >> 2));

    a = A;
    b = B;
    c = C;
    d = D;
    A = (a & (a >> 4)) ^ (b & (b >> 4));
    B = (a & (b >> 4)) ^ (b & ((a ^ b) >> 4));
    C ^= (a & (c >> 4)) ^ (b & (d >> 4));
    D ^= (b & (c >> 4)) ^ ((a ^ b) & (d >> 4));

    // Final round and projection
    a = A;
    b = B;
    c = C;
    d = D;
    C ^= (a & (c >> 8)) ^ (b & (d >> 8));
    D ^= (b & (c >> 8)) ^ ((a ^ b) & (d >> 8));

    // Undo transformation prefix scan
    a = C ^ (C >> 1);
    b = D ^ (D >> 1);

    // Recover index bits
    let i0 = x ^ y;
    let i1 = b | (0xFFFF ^ (i0 | a));

    (interleave(i1) << 1) | interleave(i0)
}

/// Normalizes one center coordinate onto the `[0, max]` grid axis.
///
/// A degenerate (zero-length) extent axis maps everything to cell 0.
fn grid_coordinate(center: f64, min: f64, length: f64, max: f64) -> u32 {
    if length == 0.0 {
        return 0;
    }
    (max * (center - min) / length).floor().clamp(0.0, max) as u32
}

/// Hilbert index of a box's center, normalized against `extent`.
///
/// # Arguments
/// * `node` - Box whose center is mapped
/// * `hilbert_max` - Grid resolution per axis, normally [`HILBERT_MAX`]
/// * `extent` - Box defining the coordinate space
pub fn hilbert_index_bounded(node: &NodeItem, hilbert_max: u32, extent: &NodeItem) -> u32 {
    let max = f64::from(hilbert_max);
    let x = grid_coordinate(
        (node.min_x + node.max_x) / 2.0,
        extent.min_x,
        extent.width(),
        max,
    );
    let y = grid_coordinate(
        (node.min_y + node.max_y) / 2.0,
        extent.min_y,
        extent.height(),
        max,
    );
    hilbert(x, y)
}

/// Sorts items by **descending** Hilbert index of their centers, normalized
/// against the items' own extent.
pub fn hilbert_sort<T: Bounded>(items: &mut [T]) {
    let extent = calc_extent(items.iter());
    hilbert_sort_within(items, &extent);
}

/// Sorts items by **descending** Hilbert index of their centers, normalized
/// against a caller-supplied extent.
///
/// The descending order is part of the on-disk contract: a tree packed in
/// one order is not interchangeable with one packed in the other.
pub fn hilbert_sort_within<T: Bounded>(items: &mut [T], extent: &NodeItem) {
    items.sort_by_cached_key(|item| {
        Reverse(hilbert_index_bounded(
            item.node_item(),
            HILBERT_MAX,
            extent,
        ))
    });
}
