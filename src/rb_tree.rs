use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use crate::error::{InvariantViolation, Result, TreeError};
use crate::raw::{InsertResult, RawRbTree};

mod capacity;

/// The default comparator type: a plain function giving the three-way order of two keys.
///
/// Any `Fn(&K, &K) -> Ordering` works as a comparator; this alias only names the
/// type used when none is spelled out, e.g. by [`RbTree::unbound`].
pub type Comparator<K> = fn(&K, &K) -> Ordering;

/// An ordered key-value store backed by a [red-black tree].
///
/// Keys are ordered by a user-supplied comparator rather than by [`Ord`], so the
/// same key type can be stored under different orders. Every operation is the
/// strict version of its map counterpart:
///
/// - [`put`](RbTree::put) only inserts, and fails with [`TreeError::DuplicateKey`]
///   if an equal key exists.
/// - [`set`](RbTree::set) only overwrites, and fails with [`TreeError::NotFound`]
///   if no equal key exists.
/// - [`get`](RbTree::get) and [`del`](RbTree::del) fail with [`TreeError::NotFound`]
///   on a missing key.
///
/// A tree may be built without a comparator (see [`RbTree::unbound`]) so that a
/// wrapping type can bind one later. Until then every ordered operation fails with
/// [`TreeError::MissingComparator`]. A failed operation never changes the tree.
///
/// Use [`TreeMap`](crate::TreeMap) for the forgiving, upserting interface.
///
/// # Examples
///
/// ```
/// use rbtree_map::{RbTree, TreeError};
///
/// let mut tree = RbTree::new(|a: &i32, b: &i32| a.cmp(b));
/// for key in [5, 4, 3, 2, 1] {
///     tree.put(key, key * 10).unwrap();
/// }
///
/// assert_eq!(tree.put(3, 0), Err(TreeError::DuplicateKey));
/// assert_eq!(tree.del(&3), Ok(30));
/// assert_eq!(tree.keys(), [&1, &2, &4, &5]);
/// assert_eq!(tree.size(), 4);
/// ```
///
/// [red-black tree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
pub struct RbTree<K, V, C = Comparator<K>> {
    raw: RawRbTree<K, V, C>,
}

impl<K, V, C> RbTree<K, V, C> {
    /// Creates an empty tree ordered by `comparator`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::RbTree;
    ///
    /// // Longest strings first.
    /// let mut tree = RbTree::new(|a: &&str, b: &&str| b.len().cmp(&a.len()).then(a.cmp(b)));
    /// tree.put("fig", ()).unwrap();
    /// tree.put("banana", ()).unwrap();
    /// tree.put("kiwi", ()).unwrap();
    /// assert_eq!(tree.keys(), [&"banana", &"kiwi", &"fig"]);
    /// ```
    #[must_use]
    pub const fn new(comparator: C) -> Self {
        RbTree {
            raw: RawRbTree::new(Some(comparator)),
        }
    }

    /// Creates an empty tree with an optional comparator.
    ///
    /// Passing `None` is allowed; ordered operations then fail with
    /// [`TreeError::MissingComparator`] until [`bind_comparator`](RbTree::bind_comparator)
    /// is called.
    #[must_use]
    pub const fn with_comparator(comparator: Option<C>) -> Self {
        RbTree {
            raw: RawRbTree::new(comparator),
        }
    }

    /// Binds the comparator used to order keys.
    ///
    /// # Errors
    ///
    /// [`TreeError::ComparatorRebind`] if the tree is not empty: its existing
    /// layout was built under the previous order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::{RbTree, TreeError};
    ///
    /// let mut tree: RbTree<u8, ()> = RbTree::unbound();
    /// assert_eq!(tree.put(1, ()), Err(TreeError::MissingComparator));
    ///
    /// tree.bind_comparator(u8::cmp).unwrap();
    /// tree.put(1, ()).unwrap();
    /// assert_eq!(tree.bind_comparator(u8::cmp), Err(TreeError::ComparatorRebind));
    /// ```
    pub fn bind_comparator(&mut self, comparator: C) -> Result<()> {
        self.raw.bind_comparator(comparator)
    }

    /// Returns `true` if a comparator is bound.
    #[must_use]
    pub const fn has_comparator(&self) -> bool {
        self.raw.has_comparator()
    }

    /// Returns the number of entries in the tree.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn size(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree holds no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns every key in comparator order.
    ///
    /// # Complexity
    ///
    /// O(n) time, O(log n) auxiliary space.
    #[must_use]
    pub fn keys(&self) -> Vec<&K> {
        self.raw.keys()
    }

    /// Returns every value, ordered by key.
    #[must_use]
    pub fn values(&self) -> Vec<&V> {
        self.raw.values()
    }

    /// Returns every entry in key order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::RbTree;
    ///
    /// let mut tree = RbTree::natural();
    /// tree.put('b', 2).unwrap();
    /// tree.put('a', 1).unwrap();
    /// assert_eq!(tree.key_values(), [(&'a', &1), (&'b', &2)]);
    /// ```
    #[must_use]
    pub fn key_values(&self) -> Vec<(&K, &V)> {
        self.raw.key_values()
    }

    /// Consumes the tree, returning its entries in key order.
    #[must_use]
    pub fn into_key_values(mut self) -> Vec<(K, V)> {
        self.raw.drain_to_vec()
    }

    /// Removes every entry. The comparator stays bound.
    pub fn clear(&mut self) {
        self.raw.clear();
    }
}

impl<K, V> RbTree<K, V> {
    /// Creates an empty tree without a comparator.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::{RbTree, TreeError};
    ///
    /// let tree: RbTree<i32, i32> = RbTree::unbound();
    /// assert!(!tree.has_comparator());
    /// assert_eq!(tree.get(&1), Err(TreeError::MissingComparator));
    /// assert!(tree.keys().is_empty());
    /// ```
    #[must_use]
    pub const fn unbound() -> Self {
        Self::with_comparator(None)
    }
}

impl<K: Ord, V> RbTree<K, V> {
    /// Creates an empty tree ordered by the keys' [`Ord`] implementation.
    #[must_use]
    pub fn natural() -> Self {
        Self::new(K::cmp)
    }
}

impl<K: Ord, V> Default for RbTree<K, V> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<K, V, C> RbTree<K, V, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    /// Inserts a new entry.
    ///
    /// Never overwrites: an existing equal key is left untouched.
    ///
    /// # Errors
    ///
    /// - [`TreeError::DuplicateKey`] if an equal key exists.
    /// - [`TreeError::MissingComparator`] if no comparator is bound.
    ///
    /// # Complexity
    ///
    /// O(log n), with at most two rotations.
    pub fn put(&mut self, key: K, value: V) -> Result<()> {
        match self.raw.insert(key, value)? {
            InsertResult::Inserted => Ok(()),
            InsertResult::Duplicate(..) => Err(TreeError::DuplicateKey),
        }
    }

    /// Inserts a new entry, handing the pair back if an equal key exists.
    pub(crate) fn put_or_return(&mut self, key: K, value: V) -> Result<InsertResult<K, V>> {
        self.raw.insert(key, value)
    }

    /// Overwrites the value of an existing key, returning the previous value.
    ///
    /// The tree's shape and size do not change.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if no equal key exists; `value` is dropped.
    /// - [`TreeError::MissingComparator`] if no comparator is bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::{RbTree, TreeError};
    ///
    /// let mut tree = RbTree::natural();
    /// tree.put(1, "a").unwrap();
    /// assert_eq!(tree.put(1, "b"), Err(TreeError::DuplicateKey));
    /// assert_eq!(tree.set(&1, "b"), Ok("a"));
    /// assert_eq!(tree.get(&1), Ok(&"b"));
    /// assert_eq!(tree.set(&2, "c"), Err(TreeError::NotFound));
    /// ```
    pub fn set(&mut self, key: &K, value: V) -> Result<V> {
        self.raw.replace_value(key, value)?.ok_or(TreeError::NotFound)
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if no equal key exists.
    /// - [`TreeError::MissingComparator`] if no comparator is bound.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn get(&self, key: &K) -> Result<&V> {
        self.raw.get(key)?.ok_or(TreeError::NotFound)
    }

    /// Returns a mutable reference to the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](RbTree::get).
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        self.raw.get_mut(key)?.ok_or(TreeError::NotFound)
    }

    /// Returns `true` if an equal key is stored.
    ///
    /// # Errors
    ///
    /// [`TreeError::MissingComparator`] if no comparator is bound.
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.raw.get(key)?.is_some())
    }

    /// Removes the entry stored under `key` and returns its value.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if no equal key exists.
    /// - [`TreeError::MissingComparator`] if no comparator is bound.
    ///
    /// # Complexity
    ///
    /// O(log n), with at most three rotations.
    pub fn del(&mut self, key: &K) -> Result<V> {
        self.del_entry(key).map(|(_, value)| value)
    }

    /// Removes the entry stored under `key` and returns it, key included.
    ///
    /// # Errors
    ///
    /// Same as [`del`](RbTree::del).
    pub fn del_entry(&mut self, key: &K) -> Result<(K, V)> {
        self.raw.remove(key)?.ok_or(TreeError::NotFound)
    }

    /// Checks every structural invariant of the tree: black root, no red node with a
    /// red child, equal black height on every path, consistent parent links, size,
    /// and key order.
    ///
    /// Returns the tree's black height. A tree built only through this API always
    /// passes; this is meant for tests and debug assertions.
    ///
    /// # Errors
    ///
    /// The first [`InvariantViolation`] found.
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn check_invariants(&self) -> core::result::Result<usize, InvariantViolation> {
        self.raw.check_invariants()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for RbTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.key_values()).finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::vec;

    #[test]
    fn failed_operations_leave_tree_untouched() {
        let mut tree = RbTree::natural();
        for key in [2, 1, 3] {
            tree.put(key, key).unwrap();
        }

        assert_eq!(tree.put(2, 20), Err(TreeError::DuplicateKey));
        assert_eq!(tree.set(&4, 40), Err(TreeError::NotFound));
        assert_eq!(tree.del(&4), Err(TreeError::NotFound));
        assert_eq!(tree.get(&4), Err(TreeError::NotFound));

        assert_eq!(tree.key_values(), vec![(&1, &1), (&2, &2), (&3, &3)]);
        assert_eq!(tree.check_invariants(), Ok(1));
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut tree = RbTree::natural();
        tree.put("a", 1).unwrap();
        *tree.get_mut(&"a").unwrap() += 1;
        assert_eq!(tree.get(&"a"), Ok(&2));
        assert_eq!(tree.contains_key(&"a"), Ok(true));
        assert_eq!(tree.contains_key(&"b"), Ok(false));
    }

    #[test]
    fn del_entry_returns_stored_key() {
        // Keys compare equal on the first field only.
        let mut tree = RbTree::new(|a: &(u8, &str), b: &(u8, &str)| a.0.cmp(&b.0));
        tree.put((1, "stored"), ()).unwrap();
        assert_eq!(tree.del_entry(&(1, "lookup")), Ok(((1, "stored"), ())));
    }

    #[test]
    fn debug_lists_entries_in_order() {
        let mut tree = RbTree::natural();
        tree.put(2, 'b').unwrap();
        tree.put(1, 'a').unwrap();
        assert_eq!(format!("{tree:?}"), "{1: 'a', 2: 'b'}");
    }

    #[test]
    fn clear_keeps_comparator() {
        let mut tree = RbTree::natural();
        tree.put(1, ()).unwrap();
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.has_comparator());
        tree.put(1, ()).unwrap();
        assert_eq!(tree.size(), 1);
    }
}
