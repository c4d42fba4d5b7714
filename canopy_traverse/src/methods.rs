// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Action classes and their per-node-class dispatch tables.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use canopy_scene::{MethodIndex, NodeClassRegistry, NodeRef};
use canopy_state::{ElementClass, EnabledElements};
use canopy_types::{TypeKey, TypeRegistry};

use crate::action::Action;

/// A node method: what an action does when traversal reaches a node of some
/// class.
///
/// Plain function pointers keep dispatch a single indexed load; per-instance
/// data lives in the action's payload, per-node data in the node's.
pub type ActionMethod = fn(&mut Action, &NodeRef);

/// The no-op method filling every dispatch slot nobody registered for.
pub fn null_method(_action: &mut Action, _node: &NodeRef) {}

struct ActionClassData {
    enabled: EnabledElements,
    methods: Vec<(TypeKey, ActionMethod)>,
    begin: Option<ActionMethod>,
    end: Option<ActionMethod>,
}

impl ActionClassData {
    fn new() -> Self {
        Self {
            enabled: EnabledElements::new(),
            methods: Vec::new(),
            begin: None,
            end: None,
        }
    }
}

/// Registry of action classes.
///
/// An action class is a run-time type plus what its traversals need: the
/// elements it enables, its per-node-class method registrations, and optional
/// begin/end hooks. Everything is inherited along the action-class hierarchy;
/// registrations on a derived class shadow its ancestors'.
///
/// Two version counters let action instances cache derived structures: the
/// method counter bumps on method/hook changes, the element counter on
/// [`ActionClassRegistry::enable_element`].
#[derive(Default)]
pub struct ActionClassRegistry {
    classes: HashMap<TypeKey, ActionClassData>,
    methods_version: u64,
    elements_version: u64,
}

impl ActionClassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action class derived from `parent`.
    ///
    /// `parent` must be [`TypeKey::BAD`] (for the root action class) or an
    /// already-registered action class. Re-registering a name returns the
    /// existing key.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is neither the sentinel nor a registered action
    /// class.
    pub fn register(
        &mut self,
        types: &mut TypeRegistry,
        parent: TypeKey,
        name: &'static str,
    ) -> TypeKey {
        assert!(
            parent.is_bad() || self.classes.contains_key(&parent),
            "parent type '{}' is not a registered action class",
            types.name(parent)
        );
        let key = types.create(parent, name);
        self.classes.entry(key).or_insert_with(ActionClassData::new);
        key
    }

    /// Returns `true` if `key` is a registered action class.
    #[must_use]
    pub fn contains(&self, key: TypeKey) -> bool {
        self.classes.contains_key(&key)
    }

    /// Registers the method run for nodes of `node_type` (and node classes
    /// derived from it, unless they register their own).
    ///
    /// # Panics
    ///
    /// Panics if `class` is not a registered action class.
    pub fn add_method(&mut self, class: TypeKey, node_type: TypeKey, method: ActionMethod) {
        self.data_mut(class).methods.push((node_type, method));
        self.methods_version += 1;
    }

    /// Enables an element for traversals of `class` and everything derived
    /// from it.
    ///
    /// # Panics
    ///
    /// Panics if `class` is not a registered action class.
    pub fn enable_element(&mut self, types: &TypeRegistry, class: TypeKey, element: ElementClass) {
        self.data_mut(class)
            .enabled
            .enable(types, element.type_key(), element.stack_index());
        self.elements_version += 1;
    }

    /// Installs the hook run instead of plain `traverse` at the start of an
    /// apply. The hook owns the decision to traverse.
    ///
    /// # Panics
    ///
    /// Panics if `class` is not a registered action class.
    pub fn set_begin_traversal(&mut self, class: TypeKey, hook: ActionMethod) {
        self.data_mut(class).begin = Some(hook);
        self.methods_version += 1;
    }

    /// Installs the hook run after traversal completes.
    ///
    /// # Panics
    ///
    /// Panics if `class` is not a registered action class.
    pub fn set_end_traversal(&mut self, class: TypeKey, hook: ActionMethod) {
        self.data_mut(class).end = Some(hook);
        self.methods_version += 1;
    }

    /// Returns the method registrations made directly on `class`.
    #[must_use]
    pub fn methods_of(&self, class: TypeKey) -> &[(TypeKey, ActionMethod)] {
        match self.classes.get(&class) {
            Some(data) => data.methods.as_slice(),
            None => &[],
        }
    }

    /// Returns the version counter covering methods and hooks.
    #[must_use]
    #[inline]
    pub fn methods_version(&self) -> u64 {
        self.methods_version
    }

    /// Returns the version counter covering enabled elements.
    #[must_use]
    #[inline]
    pub fn elements_version(&self) -> u64 {
        self.elements_version
    }

    /// Computes the effective enabled-element set of `class`: the union over
    /// the class and its action-class ancestors.
    #[must_use]
    pub fn effective_enabled(&self, types: &TypeRegistry, class: TypeKey) -> EnabledElements {
        let mut enabled = EnabledElements::new();
        for key in self.ancestry(types, class) {
            if let Some(data) = self.classes.get(&key) {
                enabled.merge_from(types, &data.enabled);
            }
        }
        enabled
    }

    /// Resolves the begin-traversal hook for `class`: its own, or the nearest
    /// ancestor's.
    #[must_use]
    pub fn resolve_begin(&self, types: &TypeRegistry, class: TypeKey) -> Option<ActionMethod> {
        self.resolve_hook(types, class, |data| data.begin)
    }

    /// Resolves the end-traversal hook for `class`.
    #[must_use]
    pub fn resolve_end(&self, types: &TypeRegistry, class: TypeKey) -> Option<ActionMethod> {
        self.resolve_hook(types, class, |data| data.end)
    }

    fn resolve_hook(
        &self,
        types: &TypeRegistry,
        class: TypeKey,
        select: impl Fn(&ActionClassData) -> Option<ActionMethod>,
    ) -> Option<ActionMethod> {
        let mut cur = class;
        while !cur.is_bad() {
            if let Some(hook) = self.classes.get(&cur).and_then(|data| select(data)) {
                return Some(hook);
            }
            cur = types.parent(cur);
        }
        None
    }

    /// Walks `class` up to its root, returned base-first.
    fn ancestry(&self, types: &TypeRegistry, class: TypeKey) -> Vec<TypeKey> {
        let mut chain = Vec::new();
        let mut cur = class;
        while !cur.is_bad() {
            chain.push(cur);
            cur = types.parent(cur);
        }
        chain.reverse();
        chain
    }

    fn data_mut(&mut self, class: TypeKey) -> &mut ActionClassData {
        match self.classes.get_mut(&class) {
            Some(data) => data,
            None => panic!("type key {class} is not a registered action class"),
        }
    }
}

impl fmt::Debug for ActionClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionClassRegistry")
            .field("classes", &self.classes.len())
            .field("methods_version", &self.methods_version)
            .field("elements_version", &self.elements_version)
            .finish()
    }
}

/// A built dispatch table: one method slot per registered node class.
///
/// Built lazily from the registries and cached against their version
/// counters. Slot resolution follows two inheritance axes:
///
/// 1. Registrations are applied from the action class's root ancestor down,
///    so the closest action ancestor wins a node type registered twice.
/// 2. A node class nobody registered for inherits its nearest node-class
///    ancestor's slot. Dense indices are assigned parents-first, so one
///    ascending pass resolves the whole hierarchy.
///
/// Unresolved slots (and out-of-range indices, e.g. a node class registered
/// after the table was built) dispatch to [`null_method`].
pub struct MethodTable {
    slots: Vec<ActionMethod>,
    built: Option<(u64, u64)>,
}

impl MethodTable {
    /// Creates an empty, unbuilt table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            built: None,
        }
    }

    /// Returns the method for a node class's dispatch index.
    #[must_use]
    pub fn get(&self, index: MethodIndex) -> ActionMethod {
        self.slots
            .get(index.index() as usize)
            .copied()
            .unwrap_or(null_method)
    }

    /// Returns `true` if the table was built and is current for the given
    /// registries.
    #[must_use]
    pub fn is_current(&self, nodes: &NodeClassRegistry, actions: &ActionClassRegistry) -> bool {
        self.built == Some((nodes.version(), actions.methods_version()))
    }

    /// (Re)builds the table for `class` if the registries changed since the
    /// last build.
    pub fn set_up(
        &mut self,
        types: &TypeRegistry,
        nodes: &NodeClassRegistry,
        actions: &ActionClassRegistry,
        class: TypeKey,
    ) {
        let versions = (nodes.version(), actions.methods_version());
        if self.built == Some(versions) {
            return;
        }

        let count = nodes.len();
        let mut slots = vec![null_method as ActionMethod; count];
        let mut filled = vec![false; count];

        // Base-first, so a derived action's registration overwrites its
        // ancestors' for the same node type.
        let mut chain = Vec::new();
        let mut cur = class;
        while !cur.is_bad() {
            chain.push(cur);
            cur = types.parent(cur);
        }
        for action_class in chain.iter().rev() {
            for (node_type, method) in actions.methods_of(*action_class) {
                if let Some(index) = nodes.method_index(*node_type) {
                    slots[index.index() as usize] = *method;
                    filled[index.index() as usize] = true;
                }
            }
        }

        // Dense order is parents-first, so a single pass resolves node-class
        // inheritance transitively.
        for node_class in nodes.iter() {
            let slot = node_class.method_index().index() as usize;
            if filled[slot] {
                continue;
            }
            let parent = types.parent(node_class.type_key());
            if let Some(parent_index) = nodes.method_index(parent) {
                slots[slot] = slots[parent_index.index() as usize];
                filled[slot] = filled[parent_index.index() as usize];
            }
        }

        self.slots = slots;
        self.built = Some(versions);
    }
}

impl Default for MethodTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("slots", &self.slots.len())
            .field("built", &self.built)
            .finish()
    }
}
