// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Traverse: the action kernel for Canopy scene graphs.
//!
//! Every operation on a retained scene graph (rendering, bounds computation,
//! picking, searching, writing) is an *action*: a depth-first,
//! left-to-right walk that dispatches per node class, carries an element
//! [`State`](canopy_state::State), and can be aimed at a whole graph, a
//! single [`Path`](canopy_path::Path), or a
//! [`PathList`](canopy_path::PathList). This crate is the kernel those
//! actions share:
//!
//! - [`Runtime`]: the registries (types, node classes, elements, action
//!   classes) behind one library instance.
//! - [`ActionClassRegistry`] and [`MethodTable`]: per-action-class method
//!   registration and the dense dispatch tables built from it, inherited
//!   along both the action-class and node-class hierarchies.
//! - [`Action`]: the apply entry points, reentry bookkeeping, the
//!   [`PathCode`] state machine that tracks where the walk sits relative to
//!   the applied path(s), cooperative termination, and the element state.
//! - Child-traversal loops ([`Action::traverse_children`],
//!   [`Action::traverse_in_path`]) and the canonical [`group_method`] /
//!   [`scoped_group_method`] that group-like node classes register.
//!
//! ## Quick start
//!
//! ```rust
//! use canopy_scene::{Node, NodeClassFlags};
//! use canopy_traverse::{group_method, Action, Runtime};
//!
//! let mut runtime = Runtime::new();
//! let node = runtime.node_base();
//! let group = runtime.register_node_class(
//!     "group",
//!     node.type_key(),
//!     NodeClassFlags::GROUP | NodeClassFlags::AFFECTS_STATE,
//! );
//! let shape = runtime.register_node_class("shape", node.type_key(), NodeClassFlags::empty());
//!
//! // A tiny action that counts the nodes it visits.
//! let count = runtime.register_action_class("count", runtime.action_base());
//! runtime.add_method(count, group.type_key(), |action, node| {
//!     *action.payload_mut::<u32>().unwrap() += 1;
//!     group_method(action, node);
//! });
//! runtime.add_method(count, shape.type_key(), |action, _node| {
//!     *action.payload_mut::<u32>().unwrap() += 1;
//! });
//! let runtime = runtime.into_shared();
//!
//! let root = Node::new(group);
//! root.add_child(&Node::new(shape));
//! root.add_child(&Node::new(shape));
//!
//! let mut action = Action::with_payload(&runtime, count, Box::new(0_u32));
//! action.apply(&root);
//! assert_eq!(action.payload::<u32>(), Some(&3));
//! ```
//!
//! ## Path codes
//!
//! While an action is applied to a path or path list, the kernel classifies
//! every position as [`PathCode::InPath`] (on a strict prefix of a target),
//! [`PathCode::BelowPath`] (at or below a target's end, so everything is
//! visited), or [`PathCode::OffPath`] (irrelevant, entered only for its state
//! side-effects). Node-apply traversals stay [`PathCode::NoPath`]. Group
//! methods read [`Action::path_code`] to learn which children to descend
//! into; everything else is maintained by
//! [`Action::push_cur_path`]/[`Action::pop_cur_path`] inside the provided
//! child loops.
//!
//! ## Reentry and termination
//!
//! Node methods receive `&mut Action` and may call [`Action::apply`] (or the
//! hook-free [`Action::switch_to_node_traversal`] /
//! [`Action::switch_to_path_traversal`]) mid-walk; applied-target, path code,
//! and current path are saved and restored around every entry point.
//! [`Action::set_terminated`] requests a cooperative stop, honored between
//! children and between per-head path-list groups.
//!
//! ## `no_std` support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod action;
mod children;
mod methods;
mod runtime;

pub use action::{Action, AppliedCode, PathCode};
pub use children::{group_method, scoped_group_method};
pub use methods::{null_method, ActionClassRegistry, ActionMethod, MethodTable};
pub use runtime::{Runtime, SharedRuntime};
