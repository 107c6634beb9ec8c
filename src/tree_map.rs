use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use log::trace;

use crate::error::{Result, TreeError};
use crate::raw::InsertResult;
use crate::rb_tree::{Comparator, RbTree};

mod capacity;

/// An ordered map over a red-black [`RbTree`].
///
/// Where the tree is strict, the map is forgiving: [`put`](TreeMap::put) inserts
/// or overwrites, and lookups and removals report a missing key as `None`.
/// A `TreeMap` always has a comparator, so none of its operations can fail.
///
/// # Examples
///
/// ```
/// use rbtree_map::TreeMap;
///
/// let mut ages = TreeMap::new(|a: &&str, b: &&str| a.cmp(b));
/// ages.put("carol", 41);
/// ages.put("alice", 30);
/// ages.put("bob", 25);
///
/// // Overwrites, returning the old value.
/// assert_eq!(ages.put("alice", 31), Some(30));
///
/// assert_eq!(ages.get(&"bob"), Some(&25));
/// assert_eq!(ages.del(&"carol"), Some(41));
/// assert_eq!(ages.del(&"carol"), None);
/// assert_eq!(ages.key_values(), [(&"alice", &31), (&"bob", &25)]);
/// ```
pub struct TreeMap<K, V, C = Comparator<K>> {
    tree: RbTree<K, V, C>,
}

impl<K, V, C> TreeMap<K, V, C> {
    /// Creates an empty map ordered by `comparator`.
    #[must_use]
    pub const fn new(comparator: C) -> Self {
        TreeMap {
            tree: RbTree::new(comparator),
        }
    }

    /// Creates an empty map from an optional comparator.
    ///
    /// # Errors
    ///
    /// [`TreeError::MissingComparator`] if `comparator` is `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::{Comparator, TreeError, TreeMap};
    ///
    /// let missing: Option<Comparator<i32>> = None;
    /// assert_eq!(TreeMap::<i32, ()>::from_comparator(missing).unwrap_err(), TreeError::MissingComparator);
    /// assert!(TreeMap::<i32, ()>::from_comparator(Some(i32::cmp)).is_ok());
    /// ```
    pub fn from_comparator(comparator: Option<C>) -> Result<Self> {
        comparator.map(Self::new).ok_or(TreeError::MissingComparator)
    }

    /// Returns the number of entries in the map.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if the map holds no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns every key in comparator order.
    #[must_use]
    pub fn keys(&self) -> Vec<&K> {
        self.tree.keys()
    }

    /// Returns every value, ordered by key.
    #[must_use]
    pub fn values(&self) -> Vec<&V> {
        self.tree.values()
    }

    /// Returns every entry in key order.
    #[must_use]
    pub fn key_values(&self) -> Vec<(&K, &V)> {
        self.tree.key_values()
    }

    /// Consumes the map, returning its entries in key order.
    #[must_use]
    pub fn into_key_values(self) -> Vec<(K, V)> {
        self.tree.into_key_values()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the underlying tree.
    #[must_use]
    pub const fn as_tree(&self) -> &RbTree<K, V, C> {
        &self.tree
    }

    /// Consumes the map, returning the underlying tree.
    #[must_use]
    pub fn into_tree(self) -> RbTree<K, V, C> {
        self.tree
    }
}

impl<K, V, C> TreeMap<K, V, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    /// Creates a map ordered by `comparator` holding `pairs`.
    ///
    /// Later pairs overwrite earlier ones with an equal key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_map::TreeMap;
    ///
    /// let map = TreeMap::with_pairs(|a: &i32, b: &i32| b.cmp(a), [(1, 'a'), (3, 'c'), (1, 'z')]);
    /// assert_eq!(map.key_values(), [(&3, &'c'), (&1, &'z')]);
    /// ```
    pub fn with_pairs<I>(comparator: C, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new(comparator);
        map.extend(pairs);
        map
    }

    /// Inserts `value` under `key`, overwriting and returning any previous value.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        match self.tree.put_or_return(key, value) {
            Ok(InsertResult::Duplicate(key, value)) => {
                trace!("key already present, overwriting its value");
                self.tree.set(&key, value).ok()
            }
            Ok(InsertResult::Inserted) => None,
            Err(_) => unreachable!("TreeMap is always constructed with a comparator"),
        }
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key).ok()
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.tree.get_mut(key).ok()
    }

    /// Returns `true` if the map holds `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains_key(key).unwrap_or(false)
    }

    /// Removes `key`, returning its value if it was present.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn del(&mut self, key: &K) -> Option<V> {
        self.tree.del(key).ok()
    }
}

impl<K: Ord, V> TreeMap<K, V> {
    /// Creates an empty map ordered by the keys' [`Ord`] implementation.
    #[must_use]
    pub fn natural() -> Self {
        Self::new(K::cmp)
    }
}

impl<K: Ord, V> Default for TreeMap<K, V> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<K, V, C> Extend<(K, V)> for TreeMap<K, V, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for TreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::with_pairs(K::cmp, iter)
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for TreeMap<K, V> {
    /// Converts a `[(K, V); N]` into a `TreeMap<K, V>` ordered by [`Ord`].
    ///
    /// ```
    /// use rbtree_map::TreeMap;
    ///
    /// let map = TreeMap::from([(2, "b"), (1, "a")]);
    /// assert_eq!(map.keys(), [&1, &2]);
    /// ```
    fn from(pairs: [(K, V); N]) -> Self {
        Self::with_pairs(K::cmp, pairs)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for TreeMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}
