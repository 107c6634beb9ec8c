use core::mem;

use super::arena::Handle;

/// A child or parent reference; `None` stands for the black leaf (or no parent).
pub(crate) type Link = Option<Handle>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Which child link of a node. Every fixup case has a mirror image, so the
/// algorithms are written once against a `Side` and its opposite.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

pub(crate) struct RbNode<K, V> {
    key: K,
    value: V,
    color: Color,
    // Non-owning back link; the arena owns every node.
    parent: Link,
    left: Link,
    right: Link,
}

impl<K, V> RbNode<K, V> {
    /// Creates a detached red node hanging under `parent`.
    pub(crate) const fn new(key: K, value: V, parent: Link) -> Self {
        Self {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub(crate) const fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) const fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub(crate) fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    #[inline]
    pub(crate) const fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    #[inline]
    pub(crate) const fn parent(&self) -> Link {
        self.parent
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Link) {
        self.parent = parent;
    }

    #[inline]
    pub(crate) const fn left(&self) -> Link {
        self.left
    }

    #[inline]
    pub(crate) const fn right(&self) -> Link {
        self.right
    }

    #[inline]
    pub(crate) const fn child(&self, side: Side) -> Link {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn set_child(&mut self, side: Side, child: Link) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }

    /// Exchanges key and value with `other`, leaving colors and links in place.
    pub(crate) fn swap_payload(&mut self, other: &mut Self) {
        mem::swap(&mut self.key, &mut other.key);
        mem::swap(&mut self.value, &mut other.value);
    }

    /// Replaces the value, returning the previous one.
    pub(crate) fn replace_value(&mut self, value: V) -> V {
        mem::replace(&mut self.value, value)
    }

    pub(crate) fn into_entry(self) -> (K, V) {
        (self.key, self.value)
    }
}
