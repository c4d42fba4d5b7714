// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The element capability trait and the registry of element classes.

use alloc::boxed::Box;
use core::any::Any;
use core::fmt;

use hashbrown::HashMap;

use canopy_types::{TypeKey, TypeRegistry};

/// Dense index of an element class's slot in the traversal state.
///
/// Stack indices are stable within a process and are how the state finds an
/// element in O(1). Derived element classes share their parent's index.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackIndex(u16);

impl StackIndex {
    /// Creates a stack index from its raw value.
    ///
    /// Normally obtained from [`ElementClass::stack_index`] instead.
    #[must_use]
    #[inline]
    pub const fn from_raw(index: u16) -> Self {
        Self(index)
    }

    /// Returns the underlying dense index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for StackIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StackIndex").field(&self.0).finish()
    }
}

/// Factory producing a fresh, uninitialised element instance.
pub type ElementFactory = fn() -> Box<dyn Element>;

/// One unit of stackable traversal context.
///
/// Concrete elements are plain structs (a transform matrix, a draw style, a
/// viewport) implementing this capability set. The state drives the
/// lifecycle:
///
/// - [`Element::init`] runs once when the bottom instance is lazily created.
/// - [`Element::push`] runs on the copy installed when a deeper scope first
///   writes the element; the copy already carries the prior top's content.
/// - [`Element::pop`] runs on the newly exposed top when a scope closes,
///   receiving the instance that was just discarded. Elements mirroring
///   external state (GPU bindings and the like) re-issue it here.
/// - [`Element::matches`] / [`Element::copy_match_info`] support cache
///   validation layers; the traversal kernel itself never calls them.
pub trait Element: Any {
    /// Resets this instance to its default, ready for use at the bottom of
    /// the stack.
    fn init(&mut self) {}

    /// Hook run on a fresh top created for a deeper scope, after its content
    /// was copied from the previous top.
    fn push(&mut self) {}

    /// Hook run when a scope closes, on the instance that becomes the top
    /// again. `popped` is the instance being discarded.
    fn pop(&mut self, popped: &dyn Element) {
        let _ = popped;
    }

    /// Returns `true` if `other` carries equivalent content.
    fn matches(&self, other: &dyn Element) -> bool;

    /// Returns a copy carrying whatever content [`Element::matches`] needs.
    fn copy_match_info(&self) -> Box<dyn Element>;

    /// Returns a full copy of this instance.
    fn clone_boxed(&self) -> Box<dyn Element>;

    /// Upcast for downcasting to the concrete element type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete element type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Descriptor of a registered element class.
#[derive(Copy, Clone, Debug)]
pub struct ElementClass {
    key: TypeKey,
    stack_index: StackIndex,
}

impl ElementClass {
    /// Returns the run-time type of this element class.
    #[must_use]
    #[inline]
    pub const fn type_key(self) -> TypeKey {
        self.key
    }

    /// Returns the state slot this class occupies.
    #[must_use]
    #[inline]
    pub const fn stack_index(self) -> StackIndex {
        self.stack_index
    }
}

struct ElementRegistration {
    stack_index: StackIndex,
    factory: ElementFactory,
}

/// Registry of element classes.
///
/// Registration creates the class's run-time type and decides its
/// [`StackIndex`]: a class whose parent is itself a registered element class
/// inherits the parent's index (it specialises the same slot), anything else
/// opens a new slot.
#[derive(Default)]
pub struct ElementRegistry {
    by_type: HashMap<TypeKey, ElementRegistration>,
    stack_count: u16,
}

impl ElementRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an element class with its instance factory.
    ///
    /// Registering the same name again returns the existing class.
    ///
    /// # Panics
    ///
    /// Panics if more than 65,535 distinct stack slots are opened, or if the
    /// type registry rejects the name (parent collision).
    pub fn register(
        &mut self,
        types: &mut TypeRegistry,
        parent: TypeKey,
        name: &'static str,
        factory: ElementFactory,
    ) -> ElementClass {
        let key = types.create(parent, name);
        if let Some(existing) = self.by_type.get(&key) {
            return ElementClass {
                key,
                stack_index: existing.stack_index,
            };
        }

        let stack_index = match self.by_type.get(&parent) {
            Some(parent_reg) => parent_reg.stack_index,
            None => {
                assert!(
                    self.stack_count < u16::MAX,
                    "too many element stack slots (max {})",
                    u16::MAX
                );
                let index = StackIndex(self.stack_count);
                self.stack_count += 1;
                index
            }
        };
        self.by_type
            .insert(key, ElementRegistration { stack_index, factory });
        ElementClass { key, stack_index }
    }

    /// Returns the class registered for `key`, if any.
    #[must_use]
    pub fn class(&self, key: TypeKey) -> Option<ElementClass> {
        self.by_type.get(&key).map(|reg| ElementClass {
            key,
            stack_index: reg.stack_index,
        })
    }

    /// Returns the stack slot of `key`, if it is a registered element class.
    #[must_use]
    pub fn stack_index(&self, key: TypeKey) -> Option<StackIndex> {
        self.by_type.get(&key).map(|reg| reg.stack_index)
    }

    /// Returns the factory of `key`, if it is a registered element class.
    #[must_use]
    pub fn factory(&self, key: TypeKey) -> Option<ElementFactory> {
        self.by_type.get(&key).map(|reg| reg.factory)
    }

    /// Returns the number of distinct stack slots opened so far.
    #[must_use]
    #[inline]
    pub fn stack_count(&self) -> usize {
        self.stack_count as usize
    }

    /// Returns the number of registered element classes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns `true` if no element classes are registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("classes", &self.by_type.len())
            .field("stack_count", &self.stack_count)
            .finish()
    }
}
