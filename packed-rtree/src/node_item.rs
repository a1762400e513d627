use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A 2D bounding box plus an opaque 64-bit reference.
///
/// `NodeItem` is the atomic record of the packed R-tree. For a leaf the
/// `offset` is whatever the caller stored with the item (typically a byte
/// offset into a feature table) and is never dereferenced by the index. For
/// an internal node the `offset` is the position, in the flat node array, of
/// the first of its contiguous children on the next level down.
///
/// # Examples
///
/// ```rust
/// use packed_rtree::NodeItem;
///
/// let a = NodeItem::with_offset(0.0, 0.0, 10.0, 10.0, 7);
/// let b = NodeItem::new(5.0, 5.0, 20.0, 20.0);
///
/// assert!(a.intersects(&b));
/// let union = NodeItem::sum(a, &b);
/// assert_eq!(union.width(), 20.0);
/// ```
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct NodeItem {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
    /// Item reference (leaf) or first child index (internal node)
    pub offset: u64,
}

impl std::fmt::Display for NodeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NodeItem({}, {}, {}, {}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y, self.offset
        )
    }
}

impl NodeItem {
    /// Creates a box with a zero offset.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> NodeItem {
        Self::with_offset(min_x, min_y, max_x, max_y, 0)
    }

    /// Creates a box carrying the given offset.
    pub fn with_offset(min_x: f64, min_y: f64, max_x: f64, max_y: f64, offset: u64) -> NodeItem {
        NodeItem {
            min_x,
            min_y,
            max_x,
            max_y,
            offset,
        }
    }

    /// The identity of [`NodeItem::expand`]: an inverted, infinitely small box.
    ///
    /// Expanding it by any box yields that box, so it seeds every extent fold.
    pub fn empty(offset: u64) -> NodeItem {
        NodeItem {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            offset,
        }
    }

    /// Returns the width of the box.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Returns the height of the box.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Grows this box to the tightest box containing both `self` and `other`.
    ///
    /// The offset is left untouched.
    pub fn expand(&mut self, other: &NodeItem) -> &mut Self {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
        self
    }

    /// Returns `a` expanded by `b`, keeping `a`'s offset.
    pub fn sum(mut a: NodeItem, b: &NodeItem) -> NodeItem {
        a.expand(b);
        a
    }

    /// Checks whether two boxes overlap. Touching edges count as overlap.
    pub fn intersects(&self, other: &NodeItem) -> bool {
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    /// True for the fold identity and any other inverted box.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// The four coordinates as `[min_x, min_y, max_x, max_y]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// One matching leaf of a range query.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// The leaf's opaque reference, as supplied at build time
    pub offset: u64,
    /// The leaf's position among all leaves after sorting
    pub index: u64,
}

/// Anything that exposes a bounding box.
///
/// Lets the extent fold and the Hilbert sort work over caller item types
/// as well as bare [`NodeItem`]s.
pub trait Bounded {
    /// The item's box and opaque offset.
    fn node_item(&self) -> &NodeItem;
}

impl Bounded for NodeItem {
    fn node_item(&self) -> &NodeItem {
        self
    }
}

impl<T: Bounded + ?Sized> Bounded for &T {
    fn node_item(&self) -> &NodeItem {
        (**self).node_item()
    }
}

impl<T: Bounded + ?Sized> Bounded for Box<T> {
    fn node_item(&self) -> &NodeItem {
        (**self).node_item()
    }
}

impl<T: Bounded + ?Sized> Bounded for Rc<T> {
    fn node_item(&self) -> &NodeItem {
        (**self).node_item()
    }
}

impl<T: Bounded + ?Sized> Bounded for Arc<T> {
    fn node_item(&self) -> &NodeItem {
        (**self).node_item()
    }
}

/// Folds any sequence of boxes into their common extent.
///
/// An empty sequence yields [`NodeItem::empty`].
pub fn calc_extent<I>(items: I) -> NodeItem
where
    I: IntoIterator,
    I::Item: Bounded,
{
    items
        .into_iter()
        .fold(NodeItem::empty(0), |acc, item| NodeItem::sum(acc, item.node_item()))
}
