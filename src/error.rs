//! Error types for red-black tree and tree map operations.

use thiserror::Error;

/// Result type for red-black tree operations.
pub type Result<T> = core::result::Result<T, TreeError>;

/// Errors returned by the ordered operations of [`RbTree`](crate::RbTree).
///
/// A failed operation never mutates the tree: every error is raised by the key
/// descent, before any rotation, recolor or splice has started.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum TreeError {
    /// `put` found a node with an equal key. The tree is a pure-insert structure;
    /// use `set` (or [`TreeMap::put`](crate::TreeMap::put)) to overwrite.
    #[error("cannot insert duplicate key into red-black tree")]
    DuplicateKey,

    /// `set`, `get` or `del` found no node with an equal key.
    #[error("cannot find key in red-black tree")]
    NotFound,

    /// The tree has no comparator, so keys cannot be ordered.
    ///
    /// This is a configuration error: bind a comparator before using the tree.
    #[error("comparator is not set")]
    MissingComparator,

    /// A comparator was bound to a tree that already holds entries.
    #[error("cannot rebind the comparator of a non-empty tree")]
    ComparatorRebind,
}

/// A structural red-black invariant that does not hold.
///
/// Returned by [`RbTree::check_invariants`](crate::RbTree::check_invariants).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum InvariantViolation {
    /// The root node is red.
    #[error("root node is red")]
    RedRoot,

    /// A red node has a red child.
    #[error("red node has a red child")]
    RedRedLink,

    /// Two root-to-leaf paths pass through a different number of black nodes.
    #[error("black height mismatch: expected {expected}, found {found}")]
    BlackHeight {
        /// Black height of the leftmost path.
        expected: usize,
        /// Black height of the offending path.
        found: usize,
    },

    /// The recorded size differs from the number of reachable nodes.
    #[error("size mismatch: recorded {recorded}, reachable {reachable}")]
    SizeMismatch {
        /// The maintained element count.
        recorded: usize,
        /// The number of nodes reachable from the root.
        reachable: usize,
    },

    /// A key is not ordered relative to its ancestors.
    #[error("keys violate binary search tree order")]
    OutOfOrder,

    /// A parent link disagrees with the matching child link, or the root has a parent.
    #[error("parent link does not match child link")]
    BrokenParentLink,
}
