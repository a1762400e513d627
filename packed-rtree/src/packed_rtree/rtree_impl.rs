//! PackedRTree implementation.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::io::Write;
use std::ops::Range;

use crate::config::RTreeConfig;
use crate::hilbert::hilbert_sort_within;
use crate::node_item::{calc_extent, Bounded, NodeItem, SearchResultItem};

use super::codec;
use super::level_bounds::{size, try_generate_level_bounds, try_size};
use super::rtree_types::{RTreeStats, SpatialError, SpatialResult};

/// A packed, read-only R-tree held in memory.
///
/// All nodes live in one flat array, leaf level first and root last. The
/// array is allocated once at construction, at its final size, and released
/// when the tree is dropped. Queries take `&self`, so a built tree can be
/// shared between threads without locking.
///
/// # Example
/// ```
/// use packed_rtree::{NodeItem, PackedRTree};
///
/// let items = vec![
///     NodeItem::with_offset(0.0, 0.0, 1.0, 1.0, 100),
///     NodeItem::with_offset(5.0, 5.0, 6.0, 6.0, 200),
/// ];
/// let tree = PackedRTree::from_items(&items, None).unwrap();
///
/// let hits = tree.search(4.0, 4.0, 10.0, 10.0);
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].offset, 200);
/// ```
#[derive(Debug, Clone)]
pub struct PackedRTree {
    extent: NodeItem,
    node_items: Vec<NodeItem>,
    num_items: u64,
    node_size: u16,
    level_bounds: Vec<Range<u64>>,
}

impl PackedRTree {
    /// Builds a tree from unsorted items with the default configuration.
    ///
    /// The extent is computed from the items when `None` is given.
    pub fn from_items<T: Bounded>(items: &[T], extent: Option<NodeItem>) -> SpatialResult<Self> {
        Self::from_items_with_config(items, extent, &RTreeConfig::default())
    }

    /// Builds a tree from unsorted items.
    ///
    /// Leaves are Hilbert-sorted (descending) against `extent`, or against the
    /// items' own extent when `None` is given, unless the configuration turns
    /// sorting off. Each leaf keeps its item's `offset`.
    pub fn from_items_with_config<T: Bounded>(
        items: &[T],
        extent: Option<NodeItem>,
        config: &RTreeConfig,
    ) -> SpatialResult<Self> {
        let mut tree = Self::init(items.len() as u64, config)?;
        for (leaf, item) in tree.node_items.iter_mut().zip(items) {
            *leaf = *item.node_item();
        }

        if config.hilbert_sort() {
            let extent = extent.unwrap_or_else(|| calc_extent(items.iter()));
            hilbert_sort_within(tree.leaves_mut(), &extent);
        }

        tree.generate_nodes();
        Ok(tree)
    }

    /// Builds a tree from leaves already in their final order.
    pub fn from_sorted_nodes(nodes: &[NodeItem]) -> SpatialResult<Self> {
        Self::from_sorted_nodes_with_config(nodes, &RTreeConfig::default())
    }

    /// Builds a tree from leaves already in their final order.
    ///
    /// No sorting happens regardless of the configuration.
    pub fn from_sorted_nodes_with_config(
        nodes: &[NodeItem],
        config: &RTreeConfig,
    ) -> SpatialResult<Self> {
        let mut tree = Self::init(nodes.len() as u64, config)?;
        tree.leaves_mut().copy_from_slice(nodes);
        tree.generate_nodes();
        Ok(tree)
    }

    /// Loads a serialized tree with the default node size.
    pub fn from_bytes(data: &[u8], num_items: u64) -> SpatialResult<Self> {
        Self::from_bytes_with_config(data, num_items, &RTreeConfig::default())
    }

    /// Loads a serialized tree.
    ///
    /// `num_items` and the configured node size must be the ones the tree was
    /// written with. Only the buffer length is checked: the node contents are
    /// trusted as-is, and a corrupt buffer gives meaningless query results.
    pub fn from_bytes_with_config(
        data: &[u8],
        num_items: u64,
        config: &RTreeConfig,
    ) -> SpatialResult<Self> {
        let expected = try_size(num_items, config.node_size())?;
        if (data.len() as u64) < expected {
            return Err(SpatialError::BufferTooSmall {
                expected,
                actual: data.len() as u64,
            });
        }

        let mut tree = Self::init(num_items, config)?;

        codec::decode_nodes_into(data, &mut tree.node_items)?;
        tree.extent = tree.root();
        log::debug!(
            "Loaded packed R-tree: {} items, {} nodes",
            tree.num_items,
            tree.num_nodes()
        );
        Ok(tree)
    }

    /// Builds a tree whose leaves are written by `fill`, with the default node size.
    pub fn from_fn<F>(fill: F, num_items: u64) -> SpatialResult<Self>
    where
        F: FnOnce(&mut [NodeItem]) -> SpatialResult<()>,
    {
        Self::from_fn_with_config(fill, num_items, &RTreeConfig::default())
    }

    /// Builds a tree whose leaves are written by `fill`.
    ///
    /// `fill` receives the leaf slice (exactly `num_items` slots) and must
    /// store the leaves in their final order. Parents are generated after it
    /// returns; an error from `fill` aborts construction.
    pub fn from_fn_with_config<F>(
        fill: F,
        num_items: u64,
        config: &RTreeConfig,
    ) -> SpatialResult<Self>
    where
        F: FnOnce(&mut [NodeItem]) -> SpatialResult<()>,
    {
        let mut tree = Self::init(num_items, config)?;
        fill(tree.leaves_mut())?;
        tree.generate_nodes();
        Ok(tree)
    }

    /// Allocates the node array at its final size.
    fn init(num_items: u64, config: &RTreeConfig) -> SpatialResult<Self> {
        let node_size = config.node_size();
        let level_bounds = try_generate_level_bounds(num_items, node_size)?;
        let num_nodes = level_bounds.last().map_or(0, |root| root.end);
        let len = usize::try_from(num_nodes).map_err(|_| {
            SpatialError::InvalidOperation(format!(
                "Tree of {} nodes cannot be addressed on this platform",
                num_nodes
            ))
        })?;

        Ok(Self {
            extent: NodeItem::empty(0),
            node_items: vec![NodeItem::empty(0); len],
            num_items,
            node_size,
            level_bounds,
        })
    }

    fn leaves_mut(&mut self) -> &mut [NodeItem] {
        let leaves = self.num_items as usize;
        &mut self.node_items[..leaves]
    }

    fn root(&self) -> NodeItem {
        self.node_items
            .last()
            .copied()
            .unwrap_or_else(|| NodeItem::empty(0))
    }

    /// Fills every level above the leaves, bottom-up.
    ///
    /// Each parent covers up to `node_size` consecutive nodes of the level
    /// below; its box is their union and its offset the index of the first.
    fn generate_nodes(&mut self) {
        let node_size = u64::from(self.node_size);

        for level in 1..self.level_bounds.len() {
            let children = self.level_bounds[level - 1].clone();
            let mut parent = self.level_bounds[level].start;
            let mut pos = children.start;

            while pos < children.end {
                let group_end = (pos + node_size).min(children.end);
                let node = self.node_items[pos as usize..group_end as usize]
                    .iter()
                    .fold(NodeItem::empty(pos), |acc, child| NodeItem::sum(acc, child));
                self.node_items[parent as usize] = node;
                parent += 1;
                pos = group_end;
            }
        }

        self.extent = self.root();
        log::debug!(
            "Built packed R-tree: {} items, {} nodes, {} levels, node size {}",
            self.num_items,
            self.num_nodes(),
            self.level_bounds.len(),
            self.node_size
        );
    }

    /// Finds all leaves whose box intersects the query rectangle.
    ///
    /// Results come in traversal order, which is ascending leaf index.
    pub fn search(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<SearchResultItem> {
        self.search_box(&NodeItem::new(min_x, min_y, max_x, max_y))
    }

    /// Finds all leaves whose box intersects `query`.
    pub fn search_box(&self, query: &NodeItem) -> Vec<SearchResultItem> {
        let mut results = Vec::new();
        let Some(mut queue) = SearchQueue::for_levels(&self.level_bounds) else {
            return results;
        };

        while let Some((level, start)) = queue.pop() {
            let end = run_end(&self.level_bounds, level, start, self.node_size);
            if start >= end {
                continue;
            }
            let run = &self.node_items[start as usize..end as usize];
            queue.visit_run(level, start, run, query, &mut results);
        }
        results
    }

    /// Writes every node, level by level from the leaves to the root.
    ///
    /// Exactly [`PackedRTree::size`] bytes are written. Errors from the
    /// writer are returned unchanged.
    pub fn stream_write<W: Write + ?Sized>(&self, writer: &mut W) -> SpatialResult<()> {
        for bounds in &self.level_bounds {
            let level = &self.node_items[bounds.start as usize..bounds.end as usize];
            writer.write_all(&codec::encode_nodes(level)?)?;
        }
        Ok(())
    }

    /// Serializes the whole tree into a buffer.
    pub fn to_bytes(&self) -> SpatialResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size() as usize);
        self.stream_write(&mut buf)?;
        Ok(buf)
    }

    /// Union of all leaf boxes; the root's box.
    pub fn extent(&self) -> NodeItem {
        self.extent
    }

    pub fn num_items(&self) -> u64 {
        self.num_items
    }

    pub fn num_nodes(&self) -> u64 {
        self.node_items.len() as u64
    }

    /// Effective (clamped) branching factor.
    pub fn node_size(&self) -> u16 {
        self.node_size
    }

    /// Index range of each level, leaves first.
    pub fn level_bounds(&self) -> &[Range<u64>] {
        &self.level_bounds
    }

    /// The flat node array, leaves first.
    pub fn node_items(&self) -> &[NodeItem] {
        &self.node_items
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> u64 {
        size(self.num_items, self.node_size)
    }

    pub fn stats(&self) -> RTreeStats {
        RTreeStats {
            num_items: self.num_items,
            num_nodes: self.num_nodes(),
            node_size: self.node_size,
            height: self.level_bounds.len() as u32,
            size_bytes: self.size(),
        }
    }
}

// ============================================================================
// Traversal shared by in-memory and streaming search
// ============================================================================

/// End (exclusive) of the run of nodes starting at `start` on `level`.
pub(crate) fn run_end(level_bounds: &[Range<u64>], level: usize, start: u64, node_size: u16) -> u64 {
    start
        .saturating_add(u64::from(node_size))
        .min(level_bounds[level].end)
}

/// Explicit work queue of node runs still to be visited.
///
/// Runs are drained top level first and, within a level, in increasing
/// node index, so a serialized tree is always read front to back per level.
#[derive(Debug)]
pub(crate) struct SearchQueue {
    pending: BTreeSet<(Reverse<usize>, u64)>,
}

impl SearchQueue {
    /// Queue holding the root run, or `None` for an empty tree.
    pub(crate) fn for_levels(level_bounds: &[Range<u64>]) -> Option<Self> {
        let root_level = level_bounds.len().checked_sub(1)?;
        let mut pending = BTreeSet::new();
        pending.insert((Reverse(root_level), level_bounds[root_level].start));
        Some(Self { pending })
    }

    /// Next `(level, run start)` to visit.
    pub(crate) fn pop(&mut self) -> Option<(usize, u64)> {
        self.pending
            .pop_first()
            .map(|(Reverse(level), start)| (level, start))
    }

    /// Matches one run against the query: leaves become results, internal
    /// nodes enqueue their child run.
    pub(crate) fn visit_run(
        &mut self,
        level: usize,
        start: u64,
        run: &[NodeItem],
        query: &NodeItem,
        results: &mut Vec<SearchResultItem>,
    ) {
        for (pos, node) in (start..).zip(run) {
            if !query.intersects(node) {
                continue;
            }
            if level == 0 {
                results.push(SearchResultItem {
                    offset: node.offset,
                    index: pos,
                });
            } else {
                self.pending.insert((Reverse(level - 1), node.offset));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
