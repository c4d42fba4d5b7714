// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type keys and the registry that assigns them.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use hashbrown::HashMap;

/// Factory callback attached to a type, producing a fresh instance.
///
/// The concrete type behind the `dyn Any` is whatever the registering
/// subsystem decided; callers downcast on their side of the seam.
pub type Factory = fn() -> Box<dyn Any>;

/// A run-time type identifier.
///
/// This is a lightweight dense handle (u16) into a [`TypeRegistry`]. Keys are
/// assigned in registration order and are stable for the life of the
/// registry. Index `0` is reserved for the [`TypeKey::BAD`] sentinel.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey(u16);

impl TypeKey {
    /// The unique "no such type" sentinel.
    ///
    /// The bad type is its own parent, is never the key of a successfully
    /// registered type, and is what name lookups return on a miss.
    pub const BAD: Self = Self(0);

    pub(crate) const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the underlying dense index of this key.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Returns `true` if this is the [`TypeKey::BAD`] sentinel.
    #[must_use]
    #[inline]
    pub const fn is_bad(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.0).finish()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.0)
    }
}

struct TypeEntry {
    name: &'static str,
    parent: TypeKey,
    factory: Option<Factory>,
}

/// A registry of run-time types with single inheritance.
///
/// The registry is append-only: types are created during application init and
/// never removed. Reads after init are cheap and take `&self`.
///
/// # Example
///
/// ```rust
/// use canopy_types::{TypeKey, TypeRegistry};
///
/// let mut types = TypeRegistry::new();
/// let base = types.create(TypeKey::BAD, "element");
/// let derived = types.create(base, "transform-element");
///
/// assert_eq!(types.parent(derived), base);
/// assert_eq!(types.name(derived), "transform-element");
/// assert!(types.is_derived_from(derived, derived));
/// ```
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_name: HashMap<&'static str, TypeKey>,
}

impl TypeRegistry {
    /// Creates a registry holding only the bad-type sentinel.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        };
        // Slot 0: the sentinel, parent of itself.
        registry.entries.push(TypeEntry {
            name: "<bad>",
            parent: TypeKey::BAD,
            factory: None,
        });
        registry
    }

    /// Creates a new type derived from `parent`.
    ///
    /// Creation is idempotent by name: if `name` is already registered with
    /// the same parent, the existing key is returned (and any previously
    /// attached factory is kept).
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered with a *different* parent, or
    /// if more than 65,535 types are registered.
    pub fn create(&mut self, parent: TypeKey, name: &'static str) -> TypeKey {
        self.create_impl(parent, name, None)
    }

    /// Like [`TypeRegistry::create`], additionally attaching an instance
    /// factory to the type.
    pub fn create_with(&mut self, parent: TypeKey, name: &'static str, factory: Factory) -> TypeKey {
        self.create_impl(parent, name, Some(factory))
    }

    fn create_impl(
        &mut self,
        parent: TypeKey,
        name: &'static str,
        factory: Option<Factory>,
    ) -> TypeKey {
        if let Some(&existing) = self.by_name.get(name) {
            assert!(
                self.parent(existing) == parent,
                "type '{name}' is already registered with a different parent"
            );
            return existing;
        }
        assert!(
            (parent.index() as usize) < self.entries.len(),
            "parent key {parent} is not registered"
        );
        assert!(
            self.entries.len() < u16::MAX as usize,
            "too many types registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let key = TypeKey::new(self.entries.len() as u16);
        self.entries.push(TypeEntry {
            name,
            parent,
            factory,
        });
        self.by_name.insert(name, key);
        key
    }

    /// Looks up a type by name, returning [`TypeKey::BAD`] on a miss.
    #[must_use]
    pub fn from_name(&self, name: &str) -> TypeKey {
        self.by_name.get(name).copied().unwrap_or(TypeKey::BAD)
    }

    /// Returns the display name of `key` (`"<bad>"` for the sentinel or an
    /// out-of-range key).
    #[must_use]
    pub fn name(&self, key: TypeKey) -> &'static str {
        self.entries
            .get(key.index() as usize)
            .map_or("<bad>", |e| e.name)
    }

    /// Returns the parent of `key`. The sentinel is its own parent.
    #[must_use]
    pub fn parent(&self, key: TypeKey) -> TypeKey {
        self.entries
            .get(key.index() as usize)
            .map_or(TypeKey::BAD, |e| e.parent)
    }

    /// Returns `true` if `key` is `ancestor` or transitively derived from it.
    ///
    /// The relation is reflexive: every key (including the sentinel) is
    /// derived from itself.
    #[must_use]
    pub fn is_derived_from(&self, key: TypeKey, ancestor: TypeKey) -> bool {
        let mut cur = key;
        loop {
            if cur == ancestor {
                return true;
            }
            if cur.is_bad() {
                return false;
            }
            cur = self.parent(cur);
        }
    }

    /// Returns the factory attached to `key`, if any.
    #[must_use]
    pub fn factory(&self, key: TypeKey) -> Option<Factory> {
        self.entries.get(key.index() as usize).and_then(|e| e.factory)
    }

    /// Creates an instance of `key` through its factory.
    ///
    /// Returns `None` when the type has no factory attached.
    #[must_use]
    pub fn create_instance(&self, key: TypeKey) -> Option<Box<dyn Any>> {
        self.factory(key).map(|f| f())
    }

    /// Returns the number of registered types, including the sentinel.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if only the sentinel is present.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("count", &self.entries.len())
            .field("types", &self.by_name.keys().collect::<Vec<_>>())
            .finish()
    }
}
