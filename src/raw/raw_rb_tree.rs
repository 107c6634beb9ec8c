use alloc::vec::Vec;
use core::cmp::Ordering;

use log::{debug, trace};
use smallvec::SmallVec;

use super::arena::{Arena, Handle};
use super::node::{Color, Link, RbNode, Side};
use crate::error::{InvariantViolation, Result, TreeError};

/// A red-black tree's height never exceeds `2 * log2(len + 1)`, so this covers
/// every tree an arena of `u32` handles can hold without spilling.
type Stack<T> = SmallVec<[T; 64]>;

/// The core red-black tree backing `RbTree` and `TreeMap`.
pub(crate) struct RawRbTree<K, V, C> {
    /// Arena owning every node; links between nodes are handles into it.
    nodes: Arena<RbNode<K, V>>,
    /// Handle to the root node, if the tree is non-empty.
    root: Link,
    /// Number of key-value pairs in the tree.
    len: usize,
    /// Three-way key order. Ordered operations fail while this is unset.
    comparator: Option<C>,
}

/// Where a key descent ended.
pub(crate) enum SearchResult {
    /// A node with an equal key.
    Found(Handle),
    /// No equal key; a new node would hang off this parent on this side
    /// (`None` for an empty tree).
    NotFound(Option<(Handle, Side)>),
}

/// Result of an insertion attempt.
pub(crate) enum InsertResult<K, V> {
    /// A new node was linked in and the tree rebalanced.
    Inserted,
    /// An equal key already exists; the rejected pair is handed back untouched.
    Duplicate(K, V),
}

impl<K, V, C> RawRbTree<K, V, C> {
    pub(crate) const fn new(comparator: Option<C>) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            comparator,
        }
    }

    pub(crate) fn with_capacity(comparator: Option<C>, capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            root: None,
            len: 0,
            comparator,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub(crate) const fn has_comparator(&self) -> bool {
        self.comparator.is_some()
    }

    /// Binds `comparator`. Only an empty tree may change its order.
    pub(crate) fn bind_comparator(&mut self, comparator: C) -> Result<()> {
        if !self.is_empty() {
            debug!("refused to rebind the comparator of a tree holding {} entries", self.len);
            return Err(TreeError::ComparatorRebind);
        }
        self.comparator = Some(comparator);
        Ok(())
    }

    /// Drops every node. The comparator stays bound.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    fn comparator(&self) -> Result<&C> {
        self.comparator.as_ref().ok_or_else(|| {
            debug!("ordered operation on a tree without a comparator");
            TreeError::MissingComparator
        })
    }

    // ─── Node access ────────────────────────────────────────────────────────

    #[inline]
    fn node(&self, handle: Handle) -> &RbNode<K, V> {
        self.nodes.get(handle)
    }

    #[inline]
    fn node_mut(&mut self, handle: Handle) -> &mut RbNode<K, V> {
        self.nodes.get_mut(handle)
    }

    #[inline]
    fn parent(&self, handle: Handle) -> Link {
        self.node(handle).parent()
    }

    #[inline]
    fn child(&self, handle: Handle, side: Side) -> Link {
        self.node(handle).child(side)
    }

    #[inline]
    fn set_child(&mut self, handle: Handle, side: Side, child: Link) {
        self.node_mut(handle).set_child(side, child);
    }

    #[inline]
    fn set_color(&mut self, handle: Handle, color: Color) {
        self.node_mut(handle).set_color(color);
    }

    /// Absent children are black leaves.
    #[inline]
    fn is_red(&self, handle: Link) -> bool {
        handle.is_some_and(|h| self.node(h).color() == Color::Red)
    }

    /// The side of `parent` that `child` hangs from.
    #[inline]
    fn side_of(&self, parent: Handle, child: Link) -> Side {
        if self.child(parent, Side::Left) == child { Side::Left } else { Side::Right }
    }

    fn leftmost(&self, mut handle: Handle) -> Handle {
        while let Some(left) = self.child(handle, Side::Left) {
            handle = left;
        }
        handle
    }

    /// Points whatever referenced `old` (a parent's child link, or the root) at `new`.
    /// Does not touch `new`'s parent link.
    fn replace_child(&mut self, parent: Link, old: Handle, new: Link) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let side = self.side_of(parent, Some(old));
                self.set_child(parent, side, new);
            }
        }
    }

    // ─── Rotations ──────────────────────────────────────────────────────────

    /// Rotates `pivot` down towards `dir`, lifting its child on the opposite side.
    ///
    /// `rotate(x, Side::Left)` is the classic left rotation. In-order key order is
    /// preserved and exactly three parent/child link pairs are rewired.
    fn rotate(&mut self, pivot: Handle, dir: Side) {
        let up = self.child(pivot, dir.opposite()).expect("`RawRbTree::rotate()` - no child to lift!");
        trace!("rotate {dir:?} at slot {}", pivot.slot());

        let inner = self.child(up, dir);
        self.set_child(pivot, dir.opposite(), inner);
        if let Some(inner) = inner {
            self.node_mut(inner).set_parent(Some(pivot));
        }

        let parent = self.parent(pivot);
        self.node_mut(up).set_parent(parent);
        self.replace_child(parent, pivot, Some(up));

        self.set_child(up, dir, Some(pivot));
        self.node_mut(pivot).set_parent(Some(up));
    }

    // ─── Rebalancing ────────────────────────────────────────────────────────

    /// Restores "no red node has a red parent" after linking the red node `node`.
    fn insert_fixup(&mut self, mut node: Handle) {
        while let Some(mut parent) = self.parent(node).filter(|&p| self.is_red(Some(p))) {
            // A red node is never the root, so a red parent has a parent.
            let grandparent = self.parent(parent).expect("`RawRbTree::insert_fixup()` - red root!");
            let side = self.side_of(grandparent, Some(parent));
            let uncle = self.child(grandparent, side.opposite());

            if let Some(uncle) = uncle.filter(|&u| self.is_red(Some(u))) {
                trace!("insert fixup: red uncle, recolor and climb");
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                node = grandparent;
                continue;
            }

            if self.side_of(parent, Some(node)) != side {
                trace!("insert fixup: inner grandchild, straighten");
                self.rotate(parent, side);
                core::mem::swap(&mut node, &mut parent);
            }

            trace!("insert fixup: outer grandchild, rotate grandparent");
            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            self.rotate(grandparent, side.opposite());
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    /// Resolves the black-height deficit left at `node` after splicing out a
    /// black node from under `parent`.
    ///
    /// `node` may be `None`: the deficit then sits on a phantom leaf, identified
    /// by `parent` and whichever of its child links is empty.
    fn remove_fixup(&mut self, mut node: Link, mut parent: Link) {
        while node != self.root && !self.is_red(node) {
            let Some(p) = parent else { break };
            let side = self.side_of(p, node);
            let far = side.opposite();

            // The deficit side is one black short, so the other side cannot be empty.
            let mut sibling = self.child(p, far).expect("`RawRbTree::remove_fixup()` - missing sibling!");

            if self.is_red(Some(sibling)) {
                trace!("remove fixup: red sibling, rotate parent");
                self.set_color(sibling, Color::Black);
                self.set_color(p, Color::Red);
                self.rotate(p, side);
                sibling = self.child(p, far).expect("`RawRbTree::remove_fixup()` - missing sibling!");
            }

            let near_nephew = self.child(sibling, side);
            let far_nephew = self.child(sibling, far);

            if !self.is_red(near_nephew) && !self.is_red(far_nephew) {
                trace!("remove fixup: black nephews, push deficit up");
                self.set_color(sibling, Color::Red);
                node = Some(p);
                parent = self.parent(p);
                continue;
            }

            if !self.is_red(far_nephew) {
                trace!("remove fixup: red near nephew, rotate sibling");
                if let Some(near) = near_nephew {
                    self.set_color(near, Color::Black);
                }
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, far);
                sibling = self.child(p, far).expect("`RawRbTree::remove_fixup()` - missing sibling!");
            }

            trace!("remove fixup: red far nephew, rotate parent");
            let parent_color = self.node(p).color();
            self.set_color(sibling, parent_color);
            self.set_color(p, Color::Black);
            if let Some(far_nephew) = self.child(sibling, far) {
                self.set_color(far_nephew, Color::Black);
            }
            self.rotate(p, side);
            node = self.root;
            break;
        }

        if let Some(node) = node {
            self.set_color(node, Color::Black);
        }
    }

    // ─── Traversal ──────────────────────────────────────────────────────────

    /// Visits every node in key order without recursion.
    fn walk_in_order<'a>(&'a self, mut visit: impl FnMut(Handle, &'a RbNode<K, V>)) {
        let mut stack: Stack<Handle> = SmallVec::new();
        let mut current = self.root;

        loop {
            while let Some(handle) = current {
                stack.push(handle);
                current = self.child(handle, Side::Left);
            }
            let Some(handle) = stack.pop() else { break };
            let node = self.node(handle);
            visit(handle, node);
            current = node.right();
        }
    }

    pub(crate) fn keys(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.len);
        self.walk_in_order(|_, node| keys.push(node.key()));
        keys
    }

    pub(crate) fn values(&self) -> Vec<&V> {
        let mut values = Vec::with_capacity(self.len);
        self.walk_in_order(|_, node| values.push(node.value()));
        values
    }

    pub(crate) fn key_values(&self) -> Vec<(&K, &V)> {
        let mut entries = Vec::with_capacity(self.len);
        self.walk_in_order(|_, node| entries.push((node.key(), node.value())));
        entries
    }

    /// Moves every entry out in key order, leaving the tree empty.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<(K, V)> {
        let mut order = Vec::with_capacity(self.len);
        self.walk_in_order(|handle, _| order.push(handle));

        let entries: Vec<(K, V)> = order.into_iter().map(|handle| self.nodes.take(handle).into_entry()).collect();
        self.clear();
        entries
    }
}

impl<K, V, C> RawRbTree<K, V, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    /// Descends from the root comparing `key` against each node.
    pub(crate) fn search(&self, key: &K) -> Result<SearchResult> {
        let cmp = self.comparator()?;
        let mut parent = None;
        let mut current = self.root;

        while let Some(handle) = current {
            let node = self.node(handle);
            let side = match cmp(key, node.key()) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return Ok(SearchResult::Found(handle)),
            };
            parent = Some((handle, side));
            current = node.child(side);
        }

        Ok(SearchResult::NotFound(parent))
    }

    fn find(&self, key: &K) -> Result<Link> {
        Ok(match self.search(key)? {
            SearchResult::Found(handle) => Some(handle),
            SearchResult::NotFound(_) => None,
        })
    }

    pub(crate) fn get(&self, key: &K) -> Result<Option<&V>> {
        Ok(self.find(key)?.map(|handle| self.node(handle).value()))
    }

    pub(crate) fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>> {
        let Some(handle) = self.find(key)? else {
            return Ok(None);
        };
        Ok(Some(self.node_mut(handle).value_mut()))
    }

    /// Replaces the value stored under `key` without restructuring, returning the old one.
    pub(crate) fn replace_value(&mut self, key: &K, value: V) -> Result<Option<V>> {
        let Some(handle) = self.find(key)? else {
            return Ok(None);
        };
        Ok(Some(self.node_mut(handle).replace_value(value)))
    }

    /// Links a new red node for `key` and rebalances. Never overwrites.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<InsertResult<K, V>> {
        let parent = match self.search(&key)? {
            SearchResult::Found(_) => {
                debug!("rejected insert of a duplicate key");
                return Ok(InsertResult::Duplicate(key, value));
            }
            SearchResult::NotFound(parent) => parent,
        };

        let handle = self.nodes.alloc(RbNode::new(key, value, parent.map(|(p, _)| p)));
        self.len += 1;

        match parent {
            None => {
                self.root = Some(handle);
                self.set_color(handle, Color::Black);
            }
            Some((parent, side)) => {
                self.set_child(parent, side, Some(handle));
                self.insert_fixup(handle);
            }
        }

        Ok(InsertResult::Inserted)
    }

    /// Unlinks the node holding `key`, rebalances, and returns its entry.
    pub(crate) fn remove(&mut self, key: &K) -> Result<Option<(K, V)>> {
        let Some(target) = self.find(key)? else {
            return Ok(None);
        };

        // A node with two children trades payloads with its in-order successor,
        // which has no left child, and the successor's slot is spliced instead.
        let doomed = match (self.child(target, Side::Left), self.child(target, Side::Right)) {
            (Some(_), Some(right)) => {
                let successor = self.leftmost(right);
                let (target_node, successor_node) = self.nodes.pair_mut(target, successor);
                target_node.swap_payload(successor_node);
                successor
            }
            _ => target,
        };

        let node = self.node(doomed);
        let child = node.left().or(node.right());
        let parent = node.parent();
        let color = node.color();

        if let Some(child) = child {
            self.node_mut(child).set_parent(parent);
        }
        self.replace_child(parent, doomed, child);

        let entry = self.nodes.take(doomed).into_entry();
        self.len -= 1;

        if color == Color::Black {
            self.remove_fixup(child, parent);
        }

        Ok(Some(entry))
    }

    /// Walks the whole tree, checking every red-black and search-tree invariant.
    ///
    /// Iterative, so arbitrarily deep (i.e. corrupt) trees cannot overflow the stack.
    /// Returns the black height on success. Key order is only checked when a
    /// comparator is bound.
    pub(crate) fn check_invariants(&self) -> core::result::Result<usize, InvariantViolation> {
        struct Frame {
            handle: Handle,
            // Black nodes above this one, this one excluded.
            blacks: usize,
            lower: Link,
            upper: Link,
        }

        let Some(root) = self.root else {
            return if self.len == 0 {
                Ok(0)
            } else {
                Err(InvariantViolation::SizeMismatch { recorded: self.len, reachable: 0 })
            };
        };

        if self.node(root).color() == Color::Red {
            return Err(InvariantViolation::RedRoot);
        }
        if self.parent(root).is_some() {
            return Err(InvariantViolation::BrokenParentLink);
        }

        let mut black_height: Option<usize> = None;
        let mut reachable = 0usize;
        let mut stack: Vec<Frame> = Vec::new();
        stack.push(Frame { handle: root, blacks: 0, lower: None, upper: None });

        while let Some(Frame { handle, blacks, lower, upper }) = stack.pop() {
            reachable += 1;
            if reachable > self.nodes.len() {
                // More visits than live nodes means a link cycle.
                return Err(InvariantViolation::BrokenParentLink);
            }

            let node = self.node(handle);
            let red = node.color() == Color::Red;
            let blacks = blacks + usize::from(!red);

            if let Some(cmp) = &self.comparator {
                let above_lower = lower.is_none_or(|l| cmp(node.key(), self.node(l).key()) == Ordering::Greater);
                let below_upper = upper.is_none_or(|u| cmp(node.key(), self.node(u).key()) == Ordering::Less);
                if !above_lower || !below_upper {
                    return Err(InvariantViolation::OutOfOrder);
                }
            }

            for side in [Side::Left, Side::Right] {
                match node.child(side) {
                    None => match black_height {
                        None => black_height = Some(blacks),
                        Some(expected) if expected != blacks => {
                            return Err(InvariantViolation::BlackHeight { expected, found: blacks });
                        }
                        Some(_) => {}
                    },
                    Some(child) => {
                        if self.parent(child) != Some(handle) {
                            return Err(InvariantViolation::BrokenParentLink);
                        }
                        if red && self.is_red(Some(child)) {
                            return Err(InvariantViolation::RedRedLink);
                        }
                        let (lower, upper) = match side {
                            Side::Left => (lower, Some(handle)),
                            Side::Right => (Some(handle), upper),
                        };
                        stack.push(Frame { handle: child, blacks, lower, upper });
                    }
                }
            }
        }

        if reachable != self.len {
            return Err(InvariantViolation::SizeMismatch { recorded: self.len, reachable });
        }

        Ok(black_height.unwrap_or(0))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::collections::BTreeMap;
    use alloc::vec;
    use proptest::prelude::*;
    use super::Color::{Black, Red};

    type Cmp = fn(&i32, &i32) -> Ordering;

    fn new_tree() -> RawRbTree<i32, i32, Cmp> {
        RawRbTree::new(Some(i32::cmp as Cmp))
    }

    impl<K, V, C: Fn(&K, &K) -> Ordering> RawRbTree<K, V, C> {
        fn validate_invariants(&self) {
            if let Err(violation) = self.check_invariants() {
                panic!("Tree invariant violation: {violation}");
            }
            assert_eq!(self.nodes.len(), self.len, "arena holds unreachable nodes");
        }

        fn height(&self) -> usize {
            fn depth<K, V, C>(tree: &RawRbTree<K, V, C>, handle: Link) -> usize {
                handle.map_or(0, |h| {
                    1 + depth(tree, tree.child(h, Side::Left)).max(depth(tree, tree.child(h, Side::Right)))
                })
            }
            depth(self, self.root)
        }
    }

    // ─── Hand-built shapes ──────────────────────────────────────────────────

    /// A node description for wiring trees directly, bypassing the fixups.
    struct Shape {
        key: i32,
        color: Color,
        left: Option<Box<Shape>>,
        right: Option<Box<Shape>>,
    }

    fn leaf(key: i32, color: Color) -> Shape {
        Shape { key, color, left: None, right: None }
    }

    fn branch(key: i32, color: Color, left: Option<Shape>, right: Option<Shape>) -> Shape {
        Shape { key, color, left: left.map(Box::new), right: right.map(Box::new) }
    }

    fn build(shape: Option<Shape>) -> RawRbTree<i32, i32, Cmp> {
        fn wire(tree: &mut RawRbTree<i32, i32, Cmp>, shape: Shape, parent: Link) -> Handle {
            let mut node = RbNode::new(shape.key, shape.key, parent);
            node.set_color(shape.color);
            let handle = tree.nodes.alloc(node);
            tree.len += 1;
            for (side, child) in [(Side::Left, shape.left), (Side::Right, shape.right)] {
                let child = child.map(|c| wire(tree, *c, Some(handle)));
                tree.set_child(handle, side, child);
            }
            handle
        }

        let mut tree = new_tree();
        let root = shape.map(|s| wire(&mut tree, s, None));
        tree.root = root;
        tree
    }

    #[test]
    fn empty_tree_is_valid() {
        assert_eq!(build(None).check_invariants(), Ok(0));
    }

    #[test]
    fn black_root_is_valid() {
        assert_eq!(build(Some(leaf(1, Black))).check_invariants(), Ok(1));
    }

    #[test]
    fn red_root_is_invalid() {
        assert_eq!(build(Some(leaf(1, Red))).check_invariants(), Err(InvariantViolation::RedRoot));
    }

    #[test]
    fn root_with_single_red_child_is_valid() {
        let tree = build(Some(branch(2, Black, Some(leaf(1, Red)), None)));
        assert_eq!(tree.check_invariants(), Ok(1));
    }

    #[test]
    fn unequal_black_children_are_invalid() {
        let tree = build(Some(branch(2, Black, Some(leaf(1, Red)), Some(leaf(3, Black)))));
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::BlackHeight { expected: 2, found: 1 }));
    }

    #[test]
    fn black_children_with_single_red_grandchildren_are_valid() {
        let tree = build(Some(branch(
            3,
            Black,
            Some(branch(1, Black, None, Some(leaf(2, Red)))),
            Some(branch(5, Black, Some(leaf(4, Red)), None)),
        )));
        assert_eq!(tree.check_invariants(), Ok(2));
    }

    #[test]
    fn mixed_depth_tree_is_valid() {
        let tree = build(Some(branch(
            7,
            Black,
            Some(branch(5, Black, Some(leaf(4, Red)), Some(leaf(6, Red)))),
            Some(branch(
                10,
                Red,
                Some(branch(9, Black, Some(leaf(8, Red)), None)),
                Some(branch(12, Black, Some(leaf(11, Red)), None)),
            )),
        )));
        assert_eq!(tree.check_invariants(), Ok(2));
    }

    #[test]
    fn red_child_of_red_is_invalid() {
        let tree = build(Some(branch(3, Black, Some(branch(2, Red, Some(leaf(1, Red)), None)), None)));
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::RedRedLink));
    }

    #[test]
    fn misordered_keys_are_invalid() {
        // 4 sits left of 3 two levels down; only a bounded descent notices.
        let tree = build(Some(branch(3, Black, Some(branch(1, Black, None, Some(leaf(4, Red)))), Some(leaf(5, Black)))));
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::OutOfOrder));
    }

    #[test]
    fn stale_parent_link_is_invalid() {
        let mut tree = build(Some(branch(2, Black, Some(leaf(1, Red)), None)));
        let child = tree.child(tree.root.unwrap(), Side::Left).unwrap();
        tree.node_mut(child).set_parent(None);
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::BrokenParentLink));
    }

    #[test]
    fn wrong_len_is_invalid() {
        let mut tree = build(Some(leaf(1, Black)));
        tree.len = 2;
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::SizeMismatch { recorded: 2, reachable: 1 }));
    }

    // ─── Insertion ──────────────────────────────────────────────────────────

    fn insert_all(tree: &mut RawRbTree<i32, i32, Cmp>, keys: &[i32]) {
        for &key in keys {
            assert!(matches!(tree.insert(key, key), Ok(InsertResult::Inserted)), "insert({key})");
            tree.validate_invariants();
        }
    }

    #[test]
    fn first_insert_becomes_black_root() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[1]);
        let root = tree.root.unwrap();
        assert_eq!(tree.node(root).color(), Black);
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn second_insert_under_black_parent_needs_no_fixup() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[1, 2]);
        let root = tree.root.unwrap();
        let right = tree.child(root, Side::Right).unwrap();
        assert_eq!(tree.node(right).color(), Red);
    }

    #[test]
    fn outer_grandchild_rotates_grandparent() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[1, 2, 3]);
        let root = tree.root.unwrap();
        assert_eq!(*tree.node(root).key(), 2);
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn inner_grandchild_straightens_first() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[3, 1, 2]);
        assert_eq!(*tree.node(tree.root.unwrap()).key(), 2);

        let mut tree = new_tree();
        insert_all(&mut tree, &[1, 3, 2]);
        assert_eq!(*tree.node(tree.root.unwrap()).key(), 2);
    }

    #[test]
    fn red_uncle_recolors_up_to_root() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[2, 1, 3, 4]);
        let root = tree.root.unwrap();
        assert_eq!(tree.node(root).color(), Black);
        for side in [Side::Left, Side::Right] {
            let child = tree.child(root, side).unwrap();
            assert_eq!(tree.node(child).color(), Black);
        }
    }

    #[test]
    fn duplicate_insert_hands_pair_back() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[1]);
        match tree.insert(1, 99) {
            Ok(InsertResult::Duplicate(key, value)) => assert_eq!((key, value), (1, 99)),
            _ => panic!("expected duplicate"),
        }
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&1), Ok(Some(&1)));
    }

    #[test]
    fn ascending_inserts_stay_logarithmic() {
        let mut tree = new_tree();
        for key in 0..1024 {
            tree.insert(key, key).unwrap();
        }
        tree.validate_invariants();
        // 2 * log2(1025) rounded down.
        assert!(tree.height() <= 20, "height {}", tree.height());
    }

    // ─── Deletion ───────────────────────────────────────────────────────────

    #[test]
    fn removing_only_node_empties_tree() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[1]);
        assert_eq!(tree.remove(&1), Ok(Some((1, 1))));
        assert!(tree.root.is_none());
        assert_eq!(tree.len(), 0);
        tree.validate_invariants();
    }

    #[test]
    fn removing_node_with_two_children_keeps_successor_order() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[5, 4, 3, 2, 1]);
        assert_eq!(tree.remove(&3), Ok(Some((3, 3))));
        tree.validate_invariants();
        assert_eq!(tree.keys(), vec![&1, &2, &4, &5]);
    }

    #[test]
    fn removing_root_with_two_children() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[2, 1, 3]);
        assert_eq!(tree.remove(&2), Ok(Some((2, 2))));
        tree.validate_invariants();
        assert_eq!(*tree.node(tree.root.unwrap()).key(), 3);
        assert_eq!(tree.key_values(), vec![(&1, &1), (&3, &3)]);
    }

    #[test]
    fn removing_black_leaf_uses_phantom_deficit() {
        // 3 is a black leaf once 1..=6 settle; its removal leaves an absent child
        // carrying the deficit.
        let mut tree = new_tree();
        insert_all(&mut tree, &[1, 2, 3, 4, 5, 6]);
        let three = tree.search(&3).unwrap();
        let SearchResult::Found(three) = three else { panic!("3 is present") };
        assert_eq!(tree.node(three).color(), Black);
        assert_eq!((tree.child(three, Side::Left), tree.child(three, Side::Right)), (None, None));

        for key in [3, 1, 6, 2, 4, 5] {
            assert_eq!(tree.remove(&key), Ok(Some((key, key))), "remove({key})");
            tree.validate_invariants();
        }
        assert!(tree.is_empty());
    }

    fn color_of(tree: &RawRbTree<i32, i32, Cmp>, key: i32) -> Color {
        let Ok(SearchResult::Found(handle)) = tree.search(&key) else { panic!("{key} is present") };
        tree.node(handle).color()
    }

    fn root_key(tree: &RawRbTree<i32, i32, Cmp>) -> i32 {
        *tree.node(tree.root.expect("tree is not empty")).key()
    }

    #[test]
    fn removal_under_red_sibling_rotates_parent_first() {
        let mut tree = build(Some(branch(
            2,
            Black,
            Some(leaf(1, Black)),
            Some(branch(4, Red, Some(leaf(3, Black)), Some(leaf(5, Black)))),
        )));
        tree.validate_invariants();

        assert_eq!(tree.remove(&1), Ok(Some((1, 1))));
        tree.validate_invariants();

        assert_eq!(root_key(&tree), 4);
        assert_eq!(tree.keys(), [&2, &3, &4, &5]);
        assert_eq!(color_of(&tree, 2), Black);
        assert_eq!(color_of(&tree, 3), Red);
        assert_eq!(color_of(&tree, 5), Black);
    }

    #[test]
    fn removal_under_red_near_nephew_rotates_sibling_then_parent() {
        let mut tree = build(Some(branch(
            2,
            Black,
            Some(leaf(1, Black)),
            Some(branch(4, Black, Some(leaf(3, Red)), None)),
        )));
        tree.validate_invariants();

        assert_eq!(tree.remove(&1), Ok(Some((1, 1))));
        tree.validate_invariants();

        assert_eq!(root_key(&tree), 3);
        assert_eq!(tree.keys(), [&2, &3, &4]);
        assert_eq!([2, 3, 4].map(|key| color_of(&tree, key)), [Black; 3]);
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn removing_missing_key_is_a_no_op() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[1, 2, 3]);
        assert_eq!(tree.remove(&7), Ok(None));
        assert_eq!(tree.len(), 3);
        tree.validate_invariants();
    }

    #[test]
    fn removal_frees_arena_slot() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[1, 2, 3]);
        tree.remove(&2).unwrap();
        assert_eq!(tree.nodes.len(), 2);
        tree.insert(4, 4).unwrap();
        assert_eq!(tree.nodes.len(), 3);
        tree.validate_invariants();
    }

    // ─── Comparator handling ────────────────────────────────────────────────

    #[test]
    fn missing_comparator_fails_before_mutation() {
        let mut tree: RawRbTree<i32, i32, Cmp> = RawRbTree::new(None);
        assert!(matches!(tree.insert(1, 1), Err(TreeError::MissingComparator)));
        assert!(matches!(tree.get(&1), Err(TreeError::MissingComparator)));
        assert!(matches!(tree.remove(&1), Err(TreeError::MissingComparator)));
        assert!(matches!(tree.replace_value(&1, 2), Err(TreeError::MissingComparator)));
        assert!(tree.is_empty());
        assert!(tree.keys().is_empty());
    }

    #[test]
    fn comparator_binds_only_while_empty() {
        let mut tree: RawRbTree<i32, i32, Cmp> = RawRbTree::new(None);
        assert_eq!(tree.bind_comparator(i32::cmp), Ok(()));
        tree.insert(1, 1).unwrap();
        assert_eq!(tree.bind_comparator(|a: &i32, b: &i32| b.cmp(a)), Err(TreeError::ComparatorRebind));
    }

    #[test]
    fn reversed_comparator_reverses_extraction() {
        let mut tree = RawRbTree::new(Some(|a: &i32, b: &i32| b.cmp(a)));
        for key in [3, 1, 4, 5, 9, 2, 6] {
            tree.insert(key, ()).unwrap();
        }
        tree.validate_invariants();
        assert_eq!(tree.keys(), vec![&9, &6, &5, &4, &3, &2, &1]);
    }

    #[test]
    fn drain_returns_sorted_entries_and_empties() {
        let mut tree = new_tree();
        insert_all(&mut tree, &[3, 1, 2]);
        assert_eq!(tree.drain_to_vec(), vec![(1, 1), (2, 2), (3, 3)]);
        assert!(tree.is_empty());
        tree.validate_invariants();
        insert_all(&mut tree, &[1]);
    }

    // ─── Randomized ─────────────────────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
        Replace(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0i32..512).prop_map(Op::Insert),
            3 => (0i32..512).prop_map(Op::Remove),
            1 => (0i32..512).prop_map(Op::Replace),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn invariants_hold_after_every_operation(ops in prop::collection::vec(op_strategy(), 0..500)) {
            let mut tree = new_tree();
            let mut model: BTreeMap<i32, i32> = BTreeMap::new();
            let mut generation = 0;

            for op in ops {
                generation += 1;
                match op {
                    Op::Insert(key) => {
                        let inserted = matches!(tree.insert(key, generation), Ok(InsertResult::Inserted));
                        let expected = !model.contains_key(&key);
                        if expected {
                            model.insert(key, generation);
                        }
                        prop_assert_eq!(inserted, expected, "insert({})", key);
                    }
                    Op::Remove(key) => {
                        prop_assert_eq!(tree.remove(&key).unwrap(), model.remove_entry(&key), "remove({})", key);
                    }
                    Op::Replace(key) => {
                        let expected = model.get_mut(&key).map(|v| core::mem::replace(v, generation));
                        prop_assert_eq!(tree.replace_value(&key, generation).unwrap(), expected, "replace({})", key);
                    }
                }

                prop_assert!(tree.check_invariants().is_ok(), "{:?}", tree.check_invariants());
                prop_assert_eq!(tree.len(), model.len());
            }

            prop_assert_eq!(tree.key_values(), model.iter().collect::<Vec<_>>());
        }

        #[test]
        fn keys_are_strictly_increasing(keys in prop::collection::vec(any::<i32>(), 0..300)) {
            let mut tree = new_tree();
            for key in keys {
                let _ = tree.insert(key, key);
            }
            let extracted = tree.keys();
            prop_assert!(extracted.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
