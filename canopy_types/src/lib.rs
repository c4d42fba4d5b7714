// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Types: the run-time type registry shared by the Canopy crates.
//!
//! Scene graphs are heterogeneous: node classes, traversal-state element
//! classes, and action classes are all open sets that applications extend at
//! startup. This crate provides the single-inheritance run-time type system
//! those extensions hang off:
//!
//! - [`TypeKey`]: a dense, copyable handle for a registered type.
//! - [`TypeRegistry`]: name → key lookup, parent links, and derivation
//!   queries ([`TypeRegistry::is_derived_from`] is reflexive and transitive).
//! - Optional per-type factories for creating instances by key.
//!
//! ## Quick start
//!
//! ```rust
//! use canopy_types::{TypeKey, TypeRegistry};
//!
//! let mut types = TypeRegistry::new();
//! let base = types.create(TypeKey::BAD, "node");
//! let group = types.create(base, "group");
//!
//! assert!(types.is_derived_from(group, base));
//! assert!(!types.is_derived_from(base, group));
//! assert_eq!(types.from_name("group"), group);
//! assert!(types.from_name("no-such-type").is_bad());
//! ```
//!
//! ## Registration contract
//!
//! Types are registered once, before the first traversal, typically from a
//! single-threaded init path. Creation is idempotent by name: re-creating a
//! name with the same parent returns the existing key, while re-creating it
//! with a *different* parent panics. [`TypeKey::BAD`] is the unique "no such
//! type" sentinel; it is its own parent and is never returned for a
//! successfully registered type.
//!
//! ## `no_std` support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod registry;

pub use registry::{Factory, TypeKey, TypeRegistry};
