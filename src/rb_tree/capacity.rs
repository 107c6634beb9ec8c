use super::RbTree;
use crate::raw::RawRbTree;

impl<K, V, C> RbTree<K, V, C> {
    /// Creates an empty tree ordered by `comparator`, with room for at least
    /// `capacity` entries before the node arena reallocates.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::RbTree;
    ///
    /// let tree: RbTree<i32, i32> = RbTree::with_capacity(i32::cmp, 32);
    /// assert!(tree.is_empty());
    /// assert!(tree.capacity() >= 32);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(capacity) for memory allocation.
    #[must_use]
    pub fn with_capacity(comparator: C, capacity: usize) -> Self {
        RbTree {
            raw: RawRbTree::with_capacity(Some(comparator), capacity),
        }
    }

    /// Returns the number of entries the tree can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }
}
