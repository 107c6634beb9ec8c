use super::TreeMap;
use crate::rb_tree::RbTree;

impl<K, V, C> TreeMap<K, V, C> {
    /// Creates an empty map ordered by `comparator`, with room for at least
    /// `capacity` entries before reallocating.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::TreeMap;
    ///
    /// let map: TreeMap<u64, String> = TreeMap::with_capacity(u64::cmp, 128);
    /// assert!(map.capacity() >= 128);
    /// ```
    #[must_use]
    pub fn with_capacity(comparator: C, capacity: usize) -> Self {
        TreeMap {
            tree: RbTree::with_capacity(comparator, capacity),
        }
    }

    /// Returns the number of entries the map can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tree.capacity()
    }
}
