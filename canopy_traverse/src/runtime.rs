// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The runtime aggregate: every registry a traversal needs, in one place.

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use canopy_scene::{NodeClass, NodeClassFlags, NodeClassRegistry};
use canopy_state::{ElementClass, ElementFactory, ElementRegistry};
use canopy_types::{TypeKey, TypeRegistry};

use crate::methods::{ActionClassRegistry, ActionMethod};

/// Shared handle to a [`Runtime`].
///
/// Actions hold one of these; borrows during traversal are short-lived reads,
/// so node methods may freely query the runtime (and even re-enter `apply`).
/// Registering classes while a traversal is running is a contract violation.
pub type SharedRuntime = Rc<RefCell<Runtime>>;

/// The process-wide registries backing a scene-graph library instance: types,
/// node classes, element classes, and action classes.
///
/// A runtime is built mutably during application init, then moved behind
/// [`Runtime::into_shared`] for the traversal phase. Three base classes are
/// pre-registered so every hierarchy has a root:
///
/// - [`Runtime::node_base`]: the root node class (not a group).
/// - [`Runtime::action_base`]: the root action class.
/// - [`Runtime::element_base`]: the root element *type* (element classes
///   derive from it or from each other).
pub struct Runtime {
    types: TypeRegistry,
    nodes: NodeClassRegistry,
    elements: ElementRegistry,
    actions: ActionClassRegistry,
    node_base: NodeClass,
    action_base: TypeKey,
    element_base: TypeKey,
}

impl Runtime {
    /// Creates a runtime with the base classes registered.
    #[must_use]
    pub fn new() -> Self {
        let mut types = TypeRegistry::new();
        let mut nodes = NodeClassRegistry::new();
        let elements = ElementRegistry::new();
        let mut actions = ActionClassRegistry::new();

        let node_base = nodes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        let action_base = actions.register(&mut types, TypeKey::BAD, "action");
        let element_base = types.create(TypeKey::BAD, "element");

        Self {
            types,
            nodes,
            elements,
            actions,
            node_base,
            action_base,
            element_base,
        }
    }

    /// Wraps the runtime for sharing with actions.
    #[must_use]
    pub fn into_shared(self) -> SharedRuntime {
        Rc::new(RefCell::new(self))
    }

    /// Returns the root node class.
    #[must_use]
    #[inline]
    pub fn node_base(&self) -> NodeClass {
        self.node_base
    }

    /// Returns the root action class.
    #[must_use]
    #[inline]
    pub fn action_base(&self) -> TypeKey {
        self.action_base
    }

    /// Returns the root element type.
    #[must_use]
    #[inline]
    pub fn element_base(&self) -> TypeKey {
        self.element_base
    }

    /// Registers a node class. `parent` must be a registered node class
    /// (start from [`Runtime::node_base`]).
    pub fn register_node_class(
        &mut self,
        name: &'static str,
        parent: TypeKey,
        flags: NodeClassFlags,
    ) -> NodeClass {
        self.nodes.register(&mut self.types, parent, name, flags)
    }

    /// Registers an element class with its factory. `parent` is another
    /// element class (sharing its stack slot) or [`Runtime::element_base`]
    /// (opening a new slot).
    pub fn register_element(
        &mut self,
        name: &'static str,
        parent: TypeKey,
        factory: ElementFactory,
    ) -> ElementClass {
        self.elements
            .register(&mut self.types, parent, name, factory)
    }

    /// Registers an action class. `parent` must be a registered action class
    /// (start from [`Runtime::action_base`]).
    pub fn register_action_class(&mut self, name: &'static str, parent: TypeKey) -> TypeKey {
        self.actions.register(&mut self.types, parent, name)
    }

    /// Registers the method `class` runs for nodes of `node_type`.
    pub fn add_method(&mut self, class: TypeKey, node_type: TypeKey, method: ActionMethod) {
        self.actions.add_method(class, node_type, method);
    }

    /// Enables an element for traversals of `class`.
    pub fn enable_element(&mut self, class: TypeKey, element: ElementClass) {
        self.actions.enable_element(&self.types, class, element);
    }

    /// Installs a begin-traversal hook on `class`.
    pub fn set_begin_traversal(&mut self, class: TypeKey, hook: ActionMethod) {
        self.actions.set_begin_traversal(class, hook);
    }

    /// Installs an end-traversal hook on `class`.
    pub fn set_end_traversal(&mut self, class: TypeKey, hook: ActionMethod) {
        self.actions.set_end_traversal(class, hook);
    }

    /// Returns the type registry.
    #[must_use]
    #[inline]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Returns the node-class registry.
    #[must_use]
    #[inline]
    pub fn nodes(&self) -> &NodeClassRegistry {
        &self.nodes
    }

    /// Returns the element-class registry.
    #[must_use]
    #[inline]
    pub fn elements(&self) -> &ElementRegistry {
        &self.elements
    }

    /// Returns the action-class registry.
    #[must_use]
    #[inline]
    pub fn actions(&self) -> &ActionClassRegistry {
        &self.actions
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("types", &self.types.len())
            .field("node_classes", &self.nodes.len())
            .field("element_classes", &self.elements.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::null_method;

    #[test]
    fn base_classes_are_seeded() {
        let runtime = Runtime::new();
        assert!(!runtime.node_base().type_key().is_bad());
        assert!(!runtime.action_base().is_bad());
        assert!(!runtime.element_base().is_bad());
        assert!(!runtime.node_base().is_group());
        assert!(runtime.node_base().affects_state());
    }

    #[test]
    fn registration_wires_the_registries() {
        let mut runtime = Runtime::new();
        let node_base = runtime.node_base();
        let group = runtime.register_node_class(
            "group",
            node_base.type_key(),
            NodeClassFlags::GROUP | NodeClassFlags::AFFECTS_STATE,
        );
        let action = runtime.register_action_class("probe", runtime.action_base());
        runtime.add_method(action, group.type_key(), null_method);

        assert!(runtime
            .types()
            .is_derived_from(group.type_key(), node_base.type_key()));
        assert!(runtime.actions().contains(action));
        assert_eq!(runtime.actions().methods_of(action).len(), 1);
    }

    #[test]
    fn enabled_elements_union_over_ancestors() {
        let mut runtime = Runtime::new();
        let elem_a = runtime.register_element("a", runtime.element_base(), || {
            unreachable!("factory is never run in this test")
        });
        let elem_b = runtime.register_element("b", runtime.element_base(), || {
            unreachable!("factory is never run in this test")
        });

        let parent = runtime.register_action_class("parent", runtime.action_base());
        let child = runtime.register_action_class("child", parent);
        runtime.enable_element(parent, elem_a);
        runtime.enable_element(child, elem_b);

        let effective = runtime
            .actions()
            .effective_enabled(runtime.types(), child);
        assert_eq!(effective.get(elem_a.stack_index()), Some(elem_a.type_key()));
        assert_eq!(effective.get(elem_b.stack_index()), Some(elem_b.type_key()));

        let parent_only = runtime
            .actions()
            .effective_enabled(runtime.types(), parent);
        assert!(parent_only.get(elem_b.stack_index()).is_none());
    }
}
