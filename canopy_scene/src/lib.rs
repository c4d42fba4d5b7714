// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Scene: reference-counted scene-graph nodes and node classes.
//!
//! A scene graph here is a directed acyclic graph of run-time-typed nodes.
//! Node *classes* are registered once at startup and describe everything a
//! traversal needs to know about a kind of node without downcasting:
//!
//! - [`NodeClassRegistry`]: assigns each class a
//!   [`TypeKey`](canopy_types::TypeKey) and a dense [`MethodIndex`] used by
//!   per-action
//!   dispatch tables. Parents are always registered before children, so
//!   method indices increase down the hierarchy.
//! - [`NodeClassFlags`]: whether instances carry a child list
//!   ([`NodeClassFlags::GROUP`]) and whether traversing an instance can
//!   change traversal state that siblings observe
//!   ([`NodeClassFlags::AFFECTS_STATE`]).
//! - [`Node`]: an instance. Nodes are user-owned and shared through
//!   [`NodeRef`] (`Rc`); a traversal pins its inputs by cloning handles, so
//!   releasing a node mid-traversal can never invalidate the walk.
//!
//! Concrete node behavior (geometry, transforms, cameras, …) lives outside
//! this crate: a node carries its class, an optional display name, and an
//! optional opaque payload. Everything else is dispatch.
//!
//! ## Quick start
//!
//! ```rust
//! use canopy_scene::{Node, NodeClassFlags, NodeClassRegistry};
//! use canopy_types::{TypeKey, TypeRegistry};
//!
//! let mut types = TypeRegistry::new();
//! let mut classes = NodeClassRegistry::new();
//!
//! let base = classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::AFFECTS_STATE);
//! let group = classes.register(
//!     &mut types,
//!     base.type_key(),
//!     "group",
//!     NodeClassFlags::GROUP | NodeClassFlags::AFFECTS_STATE,
//! );
//!
//! let root = Node::new(group);
//! let leaf = Node::new(base);
//! root.add_child(&leaf);
//!
//! assert_eq!(root.child_count(), 1);
//! assert!(root.is_group());
//! assert!(!leaf.is_group());
//! ```
//!
//! ## `no_std` support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod class;
mod node;

pub use class::{MethodIndex, NodeClass, NodeClassFlags, NodeClassRegistry};
pub use node::{Node, NodeRef, NodeUid};
