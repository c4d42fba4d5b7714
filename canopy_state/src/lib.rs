// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy State: the element stack a traversal carries as it walks a graph.
//!
//! As a traversal descends through a scene graph, nodes accumulate context
//! (the current transform, the bound material, the active viewport) that must
//! behave as if it were lexically scoped: whatever a subtree changes is
//! undone when the walk leaves it. This crate provides that machinery:
//!
//! - [`Element`]: the capability trait for one unit of traversal context
//!   (`init` / `push` / `pop` / `matches` / `copy_match_info`).
//! - [`ElementRegistry`]: assigns each element class a
//!   [`TypeKey`](canopy_types::TypeKey) and a stable dense [`StackIndex`].
//!   A derived element class shares its parent's
//!   stack index; a specialisation replaces its base in the stack rather
//!   than occupying a new slot.
//! - [`EnabledElements`]: the set of element classes an action class needs
//!   during traversal; effective sets are unions over action-class ancestors,
//!   and the most-derived class wins a shared slot.
//! - [`State`]: per-index stacks of element instances with scope
//!   [`State::push`]/[`State::pop`] and copy-on-write
//!   [`State::get_writable`]: writing in a deeper scope than the current top
//!   clones the top, runs its [`Element::push`] hook, and installs the clone
//!   for the scope's duration.
//!
//! After any balanced push/pop sequence the state is observationally
//! identical to its starting point; element `pop` hooks exist so externally
//! mirrored state (a GPU binding, say) can be re-issued on unwind.
//!
//! ## Quick start
//!
//! ```rust
//! use canopy_state::{Element, ElementRegistry, EnabledElements, State};
//! use canopy_types::{TypeKey, TypeRegistry};
//! use core::any::Any;
//!
//! #[derive(Clone)]
//! struct Tint(u32);
//!
//! impl Element for Tint {
//!     fn matches(&self, other: &dyn Element) -> bool {
//!         other.as_any().downcast_ref::<Tint>().is_some_and(|o| o.0 == self.0)
//!     }
//!     fn copy_match_info(&self) -> Box<dyn Element> { Box::new(self.clone()) }
//!     fn clone_boxed(&self) -> Box<dyn Element> { Box::new(self.clone()) }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! let mut types = TypeRegistry::new();
//! let mut elements = ElementRegistry::new();
//! let base = types.create(TypeKey::BAD, "element");
//! let tint = elements.register(&mut types, base, "tint", || Box::new(Tint(0)));
//!
//! let mut enabled = EnabledElements::new();
//! enabled.enable(&types, tint.type_key(), tint.stack_index());
//!
//! let mut state = State::new(&elements, &enabled);
//! state.push();
//! state.get_writable_as::<Tint>(tint.stack_index(), None).unwrap().0 = 0xff00ff;
//! assert_eq!(state.get_as::<Tint>(tint.stack_index()).unwrap().0, 0xff00ff);
//! state.pop();
//! assert_eq!(state.get_as::<Tint>(tint.stack_index()).unwrap().0, 0);
//! ```
//!
//! ## `no_std` support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod element;
mod enabled;
mod state;

pub use element::{Element, ElementClass, ElementFactory, ElementRegistry, StackIndex};
pub use enabled::EnabledElements;
pub use state::State;
