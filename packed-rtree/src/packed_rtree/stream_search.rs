//! Range search over a serialized tree that is not resident in memory.
//!
//! Nodes are fetched through a [`NodeReader`] one run at a time: every
//! descent into a node reads its (at most `node_size`) children with a single
//! windowed call. Only runs whose parent intersects the query are ever read,
//! so a small query touches a handful of windows instead of the whole tree.

use crate::node_item::{NodeItem, SearchResultItem};

use super::codec;
use super::level_bounds::{clamp_node_size, try_generate_level_bounds};
use super::rtree_constants::NODE_ITEM_LEN;
use super::rtree_impl::{run_end, PackedRTree, SearchQueue};
use super::rtree_types::{SpatialResult, StreamSearchStats};

/// Source of serialized node records.
///
/// `read_nodes` must fill `buf` (exactly `count * 40` bytes) with the `count`
/// consecutive records starting at array index `node_index`. Any error is
/// returned unchanged from the query that issued the read; timeouts,
/// retries and cancellation belong in the implementation.
///
/// Closures of the matching shape implement this trait:
///
/// ```
/// use packed_rtree::{NodeItem, PackedRTree, SpatialResult};
///
/// let items = vec![NodeItem::with_offset(0.0, 0.0, 1.0, 1.0, 9)];
/// let bytes = PackedRTree::from_items(&items, None).unwrap().to_bytes().unwrap();
///
/// let mut reader = |buf: &mut [u8], node_index: u64, _count: usize| -> SpatialResult<()> {
///     let start = node_index as usize * 40;
///     buf.copy_from_slice(&bytes[start..start + buf.len()]);
///     Ok(())
/// };
/// let query = NodeItem::new(0.5, 0.5, 2.0, 2.0);
/// let hits = PackedRTree::stream_search(1, 16, &query, &mut reader).unwrap();
/// assert_eq!(hits[0].offset, 9);
/// ```
pub trait NodeReader {
    /// Reads `count` records beginning at `node_index` into `buf`.
    fn read_nodes(&mut self, buf: &mut [u8], node_index: u64, count: usize) -> SpatialResult<()>;
}

impl<F> NodeReader for F
where
    F: FnMut(&mut [u8], u64, usize) -> SpatialResult<()>,
{
    fn read_nodes(&mut self, buf: &mut [u8], node_index: u64, count: usize) -> SpatialResult<()> {
        self(buf, node_index, count)
    }
}

impl PackedRTree {
    /// Finds all leaves intersecting `query` in a serialized tree.
    ///
    /// `num_items` and `node_size` must be the values the tree was written
    /// with. Results are identical, in content and order, to
    /// [`PackedRTree::search_box`] on the same tree.
    pub fn stream_search<R: NodeReader + ?Sized>(
        num_items: u64,
        node_size: u16,
        query: &NodeItem,
        reader: &mut R,
    ) -> SpatialResult<Vec<SearchResultItem>> {
        Self::stream_search_with_stats(num_items, node_size, query, reader).map(|(results, _)| results)
    }

    /// Same as [`PackedRTree::stream_search`], also reporting the reads issued.
    pub fn stream_search_with_stats<R: NodeReader + ?Sized>(
        num_items: u64,
        node_size: u16,
        query: &NodeItem,
        reader: &mut R,
    ) -> SpatialResult<(Vec<SearchResultItem>, StreamSearchStats)> {
        let node_size = clamp_node_size(node_size);
        let level_bounds = try_generate_level_bounds(num_items, node_size)?;
        let mut results = Vec::new();
        let mut stats = StreamSearchStats::default();

        let Some(mut queue) = SearchQueue::for_levels(&level_bounds) else {
            return Ok((results, stats));
        };

        let window = usize::from(node_size);
        let mut buf = vec![0u8; window * NODE_ITEM_LEN];
        let mut nodes = vec![NodeItem::empty(0); window];

        while let Some((level, start)) = queue.pop() {
            let end = run_end(&level_bounds, level, start, node_size);
            if start >= end {
                continue;
            }
            let count = (end - start) as usize;
            let bytes = &mut buf[..count * NODE_ITEM_LEN];

            log::trace!("Reading {} nodes at index {} (level {})", count, start, level);
            reader.read_nodes(bytes, start, count)?;
            stats.reads += 1;
            stats.nodes_read += count as u64;

            let run = &mut nodes[..count];
            codec::decode_nodes_into(bytes, run)?;
            queue.visit_run(level, start, run, query, &mut results);
        }

        log::debug!(
            "Stream search over {} items: {} hits, {} reads, {} nodes read",
            num_items,
            results.len(),
            stats.reads,
            stats.nodes_read
        );
        Ok((results, stats))
    }
}
