//! Packed, static R-tree stored as one flat, level-ordered node array.
//!
//! The tree is bulk-loaded once and never mutated:
//! - Leaves are Hilbert-sorted so that nearby items share nodes
//! - Parents are built bottom-up, `node_size` children at a time
//! - The array is laid out leaf level first, root last, 40 bytes per node
//! - Queries run either on the resident array or through windowed reads
//!   of a serialized tree, fetching only the node runs they descend into
//!
//! Item count and branching factor are not stored in the serialized bytes;
//! whoever persists the tree must persist those two numbers alongside it.

pub mod codec;
pub mod level_bounds;
pub mod rtree_constants;
pub mod rtree_storage;
pub mod rtree_types;
pub mod stream_search;
mod rtree_impl;

pub use level_bounds::{generate_level_bounds, num_nodes, size, try_generate_level_bounds, try_size};
pub use rtree_constants::{DEFAULT_NODE_SIZE, NODE_ITEM_LEN};
pub use rtree_impl::PackedRTree;
pub use rtree_storage::{FileNodeReader, MmapNodeReader, SliceNodeReader};
pub use rtree_types::{RTreeStats, SpatialError, SpatialResult, StreamSearchStats};
pub use stream_search::NodeReader;
