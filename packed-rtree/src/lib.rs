//! # Packed R-Tree - Static Hilbert-Ordered Spatial Index
//!
//! This crate provides a read-only, bulk-loaded R-tree packed into a single
//! flat array of fixed-size node records. The same bytes serve both in-memory
//! queries and queries against storage that is read on demand.
//!
//! ## Features
//!
//! - **Hilbert Packing**: Items are sorted along a Hilbert curve before packing
//! - **Flat Layout**: One contiguous array, leaves first, root last
//! - **Fixed Records**: 40 little-endian bytes per node, no framing
//! - **Streaming Search**: Queries a serialized tree through windowed reads
//! - **Pluggable I/O**: File, memory-mapped, slice or closure-based readers
//! - **Deterministic Order**: Both search paths return hits in the same order
//!
//! ## Quick Start
//!
//! ```rust
//! use packed_rtree::{NodeItem, PackedRTree};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let items = vec![
//!     NodeItem::with_offset(0.0, 0.0, 1.0, 1.0, 100),
//!     NodeItem::with_offset(5.0, 5.0, 6.0, 6.0, 200),
//! ];
//! let tree = PackedRTree::from_items(&items, None)?;
//!
//! let hits = tree.search(0.5, 0.5, 2.0, 2.0);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].offset, 100);
//! # Ok(())
//! # }
//! ```
//!
//! ## Streaming Search
//!
//! ```rust,no_run
//! use packed_rtree::{FileNodeReader, NodeItem, PackedRTree};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Tree written after a 64 byte header, with 10_000 items and node size 16
//! let mut reader = FileNodeReader::open("features.idx", 64)?;
//! let query = NodeItem::new(10.0, 10.0, 20.0, 20.0);
//! let hits = PackedRTree::stream_search(10_000, 16, &query, &mut reader)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod hilbert;
pub mod node_item;
pub mod packed_rtree;

pub use config::RTreeConfig;
pub use hilbert::{hilbert_sort, hilbert_sort_within, HILBERT_MAX};
pub use node_item::{calc_extent, Bounded, NodeItem, SearchResultItem};

pub use packed_rtree::{
    generate_level_bounds, num_nodes, size, FileNodeReader, MmapNodeReader, NodeReader,
    PackedRTree, RTreeStats, SliceNodeReader, SpatialError, SpatialResult, StreamSearchStats,
    try_generate_level_bounds, try_size, DEFAULT_NODE_SIZE, NODE_ITEM_LEN,
};
