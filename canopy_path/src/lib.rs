// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Path: positions in a scene graph, and sorted collections of them.
//!
//! A [`Path`] names a position in the graph as a head node plus a chain of
//! child indices, with the node at every step resolved and pinned. Paths are
//! what targeted traversals are applied to: "render exactly this subtree",
//! "the pick hit this chain of nodes".
//!
//! - [`Path`]: an owned, cheaply clonable chain. Steps count nodes, so a
//!   head-only path has length 1 and [`Path::index`] is meaningless at
//!   step 0.
//! - [`TempPath`]: the mutable scratch variant a traversal maintains as its
//!   current position. It tolerates *placeholder* steps ("descending into
//!   all children at once") and can be compared against real paths without
//!   allocation.
//! - [`PathList`]: a vector of paths with the normalisation operations
//!   targeted traversal needs: [`PathList::sort`] into traversal order and
//!   [`PathList::uniquify`], which drops duplicates and any path already
//!   covered by a kept prefix.
//!
//! ## Ordering
//!
//! Paths order by head identity ([`NodeUid`](canopy_scene::NodeUid), i.e.
//! creation order) and then lexicographically by child indices, so a prefix
//! sorts immediately before its extensions. This is a strict weak order even
//! across disjoint graphs.
//!
//! ## Quick start
//!
//! ```rust
//! use canopy_path::{Path, PathList};
//! use canopy_scene::{Node, NodeClassFlags, NodeClassRegistry};
//! use canopy_types::{TypeKey, TypeRegistry};
//!
//! # let mut types = TypeRegistry::new();
//! # let mut classes = NodeClassRegistry::new();
//! # let group = classes.register(
//! #     &mut types,
//! #     TypeKey::BAD,
//! #     "group",
//! #     NodeClassFlags::GROUP | NodeClassFlags::AFFECTS_STATE,
//! # );
//! let root = Node::new(group);
//! let a = Node::new(group);
//! let b = Node::new(group);
//! root.add_child(&a);
//! root.add_child(&b);
//!
//! let mut to_a = Path::from_head(&root);
//! to_a.append_child(&a);
//!
//! let mut to_b = Path::from_head(&root);
//! to_b.append_index(1);
//!
//! assert_eq!(to_a.len(), 2);
//! assert_eq!(to_b.index(1), Some(1));
//! assert!(to_a < to_b);
//!
//! let mut list = PathList::new();
//! list.append(to_b);
//! list.append(to_a.clone());
//! list.append(to_a);
//! list.sort();
//! list.uniquify();
//! assert_eq!(list.len(), 2);
//! ```
//!
//! ## `no_std` support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod list;
mod path;
mod temp;

pub use list::PathList;
pub use path::Path;
pub use temp::TempPath;
