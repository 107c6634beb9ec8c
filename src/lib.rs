//! A comparator-ordered red-black tree and the ordered map built on it.
//!
//! This crate provides two collections:
//!
//! - [`RbTree`] - a strict ordered store: [`put`](RbTree::put) only inserts,
//!   [`set`](RbTree::set) only overwrites, and every miss is a [`TreeError`].
//! - [`TreeMap`] - an upserting map over an `RbTree`, reporting misses as `None`.
//!
//! Keys are ordered by a comparator supplied at construction rather than by [`Ord`],
//! so one key type can be stored under any number of orders.
//!
//! # Example
//!
//! ```
//! use rbtree_map::{RbTree, TreeError, TreeMap};
//!
//! let mut tree = RbTree::new(|a: &i32, b: &i32| a.cmp(b));
//! tree.put(1, "a").unwrap();
//! assert_eq!(tree.put(1, "b"), Err(TreeError::DuplicateKey));
//! tree.set(&1, "b").unwrap();
//! assert_eq!(tree.get(&1), Ok(&"b"));
//!
//! let mut map = TreeMap::new(|a: &i32, b: &i32| a.cmp(b));
//! map.put(1, "a");
//! map.put(1, "b");
//! assert_eq!(map.get(&1), Some(&"b"));
//! ```
//!
//! # Implementation
//!
//! Nodes live in an arena owned by the tree, and child and parent links are
//! indices into it, so parent back-links never form ownership cycles. Absent
//! children are treated as black leaves and never allocated. Insertion and
//! deletion restore the red-black invariants with the classic recolor-and-rotate
//! fixups, keeping the height below `2 * log2(n + 1)`.
//!
//! The collections are not synchronized; wrap them in a lock to share them
//! between threads.

#![no_std]
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;

pub mod rb_tree;
pub mod tree_map;

pub use error::{InvariantViolation, Result, TreeError};
pub use rb_tree::{Comparator, RbTree};
pub use tree_map::TreeMap;
