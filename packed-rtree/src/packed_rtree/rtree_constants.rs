//! Constants for the packed R-tree layout.

/// Serialized size of one node record: four f64 coordinates and a u64 offset
pub const NODE_ITEM_LEN: usize = 40;

/// Default branching factor
pub const DEFAULT_NODE_SIZE: u16 = 16;

/// Smallest usable branching factor; anything lower is clamped up to it
pub const MIN_NODE_SIZE: u16 = 2;
