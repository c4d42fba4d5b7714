// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node classes: run-time type plus traversal metadata.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use canopy_types::{TypeKey, TypeRegistry};

/// Dense per-node-class index into an action's dispatch table.
///
/// Indices are assigned in registration order. Because a class's parent must
/// be registered before the class itself, a parent's index is always smaller
/// than its children's, which lets dispatch tables resolve inheritance in a
/// single ascending pass.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodIndex(u16);

impl MethodIndex {
    /// Returns the underlying dense index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for MethodIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodIndex").field(&self.0).finish()
    }
}

bitflags::bitflags! {
    /// Per-class traversal capabilities.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeClassFlags: u8 {
        /// Instances carry a child list and traversals may descend into it.
        const GROUP = 0b0000_0001;
        /// Traversing an instance can change traversal state observed by
        /// later siblings. Off-path instances of such classes are still
        /// entered during in-path traversal; classes without this flag are
        /// skipped entirely when off-path.
        const AFFECTS_STATE = 0b0000_0010;
    }
}

impl Default for NodeClassFlags {
    fn default() -> Self {
        Self::AFFECTS_STATE
    }
}

/// Descriptor of a registered node class.
///
/// Small and copyable; nodes embed one so traversal never needs a registry
/// lookup on the hot path.
#[derive(Copy, Clone, Debug)]
pub struct NodeClass {
    key: TypeKey,
    method_index: MethodIndex,
    flags: NodeClassFlags,
}

impl NodeClass {
    /// Returns the run-time type of this class.
    #[must_use]
    #[inline]
    pub const fn type_key(self) -> TypeKey {
        self.key
    }

    /// Returns the dense dispatch index of this class.
    #[must_use]
    #[inline]
    pub const fn method_index(self) -> MethodIndex {
        self.method_index
    }

    /// Returns the class flags.
    #[must_use]
    #[inline]
    pub const fn flags(self) -> NodeClassFlags {
        self.flags
    }

    /// Returns `true` if instances carry a child list.
    #[must_use]
    #[inline]
    pub fn is_group(self) -> bool {
        self.flags.contains(NodeClassFlags::GROUP)
    }

    /// Returns `true` if traversing an instance can affect sibling-visible
    /// traversal state.
    #[must_use]
    #[inline]
    pub fn affects_state(self) -> bool {
        self.flags.contains(NodeClassFlags::AFFECTS_STATE)
    }
}

/// Registry of node classes.
///
/// Registration creates the class's run-time type (idempotently, through the
/// shared [`TypeRegistry`]) and assigns the dense [`MethodIndex`]. A version
/// counter bumps on every registration so cached dispatch tables can detect
/// staleness.
#[derive(Default)]
pub struct NodeClassRegistry {
    classes: Vec<NodeClass>,
    by_type: HashMap<TypeKey, u16>,
    version: u64,
}

impl NodeClassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node class.
    ///
    /// `parent` must be [`TypeKey::BAD`] (for the root node class) or the
    /// type of an already-registered node class. Registering the same name
    /// again with identical parent and flags returns the existing class.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is neither the sentinel nor a registered node
    /// class, if the name is re-registered with different flags, or if more
    /// than 65,535 classes are registered.
    pub fn register(
        &mut self,
        types: &mut TypeRegistry,
        parent: TypeKey,
        name: &'static str,
        flags: NodeClassFlags,
    ) -> NodeClass {
        assert!(
            parent.is_bad() || self.by_type.contains_key(&parent),
            "parent type '{}' is not a registered node class",
            types.name(parent)
        );

        let key = types.create(parent, name);
        if let Some(&dense) = self.by_type.get(&key) {
            let existing = self.classes[dense as usize];
            assert!(
                existing.flags == flags,
                "node class '{name}' is already registered with different flags"
            );
            return existing;
        }
        assert!(
            self.classes.len() < u16::MAX as usize,
            "too many node classes registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let dense = self.classes.len() as u16;
        let class = NodeClass {
            key,
            method_index: MethodIndex(dense),
            flags,
        };
        self.classes.push(class);
        self.by_type.insert(key, dense);
        self.version += 1;
        class
    }

    /// Returns the class registered for `key`, if any.
    #[must_use]
    pub fn get(&self, key: TypeKey) -> Option<NodeClass> {
        self.by_type
            .get(&key)
            .map(|&dense| self.classes[dense as usize])
    }

    /// Returns the dispatch index of `key`, if it is a registered class.
    #[must_use]
    pub fn method_index(&self, key: TypeKey) -> Option<MethodIndex> {
        self.get(key).map(NodeClass::method_index)
    }

    /// Returns the number of registered classes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no classes are registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns the registration version, bumped on every [`register`] call.
    ///
    /// [`register`]: NodeClassRegistry::register
    #[must_use]
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Iterates classes in dense (registration) order.
    pub fn iter(&self) -> impl Iterator<Item = NodeClass> + '_ {
        self.classes.iter().copied()
    }
}

impl fmt::Debug for NodeClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClassRegistry")
            .field("count", &self.classes.len())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (TypeRegistry, NodeClassRegistry) {
        (TypeRegistry::new(), NodeClassRegistry::new())
    }

    #[test]
    fn register_assigns_dense_indices() {
        let (mut types, mut classes) = registry();
        let base = classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        let group = classes.register(
            &mut types,
            base.type_key(),
            "group",
            NodeClassFlags::GROUP | NodeClassFlags::AFFECTS_STATE,
        );
        let shape = classes.register(
            &mut types,
            base.type_key(),
            "shape",
            NodeClassFlags::empty(),
        );

        assert_eq!(base.method_index().index(), 0);
        assert_eq!(group.method_index().index(), 1);
        assert_eq!(shape.method_index().index(), 2);
        assert!(group.is_group());
        assert!(!shape.is_group());
        assert!(!shape.affects_state());
    }

    #[test]
    fn register_is_idempotent() {
        let (mut types, mut classes) = registry();
        let base = classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        let again = classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        assert_eq!(base.method_index(), again.method_index());
        assert_eq!(classes.len(), 1);
    }

    #[test]
    #[should_panic(expected = "not a registered node class")]
    fn register_rejects_unregistered_parent() {
        let (mut types, mut classes) = registry();
        let loose = types.create(TypeKey::BAD, "loose");
        let _ = classes.register(&mut types, loose, "child", NodeClassFlags::default());
    }

    #[test]
    fn version_bumps_per_registration() {
        let (mut types, mut classes) = registry();
        let v0 = classes.version();
        let base = classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        let v1 = classes.version();
        classes.register(&mut types, base.type_key(), "group", NodeClassFlags::GROUP);
        let v2 = classes.version();

        assert!(v0 < v1 && v1 < v2);
        // Idempotent re-registration does not bump.
        classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        assert_eq!(classes.version(), v2);
    }

    #[test]
    fn lookup_by_type_key() {
        let (mut types, mut classes) = registry();
        let base = classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        assert_eq!(
            classes.method_index(base.type_key()),
            Some(base.method_index())
        );
        assert!(classes.method_index(TypeKey::BAD).is_none());
    }
}
