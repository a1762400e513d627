//! Build configuration for [`PackedRTree`](crate::PackedRTree).

use crate::packed_rtree::level_bounds::clamp_node_size;
use crate::packed_rtree::rtree_constants::DEFAULT_NODE_SIZE;

/// Options applied when packing a tree.
///
/// # Examples
///
/// ```rust
/// use packed_rtree::RTreeConfig;
///
/// let config = RTreeConfig::new().with_node_size(8).with_hilbert_sort(false);
/// assert_eq!(config.node_size(), 8);
/// assert!(!config.hilbert_sort());
///
/// // Branching factors below 2 are clamped
/// assert_eq!(RTreeConfig::new().with_node_size(1).node_size(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RTreeConfig {
    node_size: u16,
    hilbert_sort: bool,
}

impl Default for RTreeConfig {
    fn default() -> Self {
        Self {
            node_size: DEFAULT_NODE_SIZE,
            hilbert_sort: true,
        }
    }
}

impl RTreeConfig {
    /// Node size 16, Hilbert sorting enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the branching factor (maximum children per internal node).
    #[must_use]
    pub fn with_node_size(mut self, node_size: u16) -> Self {
        self.node_size = node_size;
        self
    }

    /// Enables or disables Hilbert sorting of leaves in
    /// [`PackedRTree::from_items_with_config`](crate::PackedRTree::from_items_with_config).
    ///
    /// Disable it only when the items are already in the desired order.
    #[must_use]
    pub fn with_hilbert_sort(mut self, hilbert_sort: bool) -> Self {
        self.hilbert_sort = hilbert_sort;
        self
    }

    /// The effective branching factor, never below 2.
    pub fn node_size(&self) -> u16 {
        clamp_node_size(self.node_size)
    }

    /// Whether leaves are Hilbert-sorted before packing.
    pub fn hilbert_sort(&self) -> bool {
        self.hilbert_sort
    }
}
