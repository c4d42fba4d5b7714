// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-graph nodes.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use canopy_types::TypeKey;

use crate::class::{MethodIndex, NodeClass};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// A process-unique, monotonically increasing node identifier.
///
/// Uids order nodes by creation time and provide the stable identity used by
/// path sorting; unlike an address, a uid is never reused.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeUid(u64);

impl NodeUid {
    fn next() -> Self {
        Self(NEXT_UID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier value.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeUid").field(&self.0).finish()
    }
}

impl fmt::Display for NodeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to a [`Node`].
///
/// Cloning the handle is how callers pin a node: a traversal clones handles
/// to everything it was applied to, so user code releasing its own handles
/// mid-traversal cannot free the graph under the walk.
pub type NodeRef = Rc<Node>;

/// A vertex of the scene graph.
///
/// A node is its class plus identity: run-time dispatch happens through the
/// class's [`MethodIndex`], children exist only on group-like classes, and
/// concrete node data (owned by code outside this crate) rides along as an
/// opaque payload.
///
/// The graph is single-threaded; interior mutability uses `Cell`/`RefCell`.
/// Child-list borrows are never held across traversal callbacks, so node
/// methods are free to edit siblings.
pub struct Node {
    uid: NodeUid,
    class: NodeClass,
    name: Cell<Option<&'static str>>,
    children: Option<RefCell<Vec<NodeRef>>>,
    payload: RefCell<Option<Box<dyn Any>>>,
}

impl Node {
    /// Creates a node of the given class.
    #[must_use]
    pub fn new(class: NodeClass) -> NodeRef {
        Rc::new(Self {
            uid: NodeUid::next(),
            class,
            name: Cell::new(None),
            children: class.is_group().then(|| RefCell::new(Vec::new())),
            payload: RefCell::new(None),
        })
    }

    /// Creates a named node of the given class.
    #[must_use]
    pub fn named(class: NodeClass, name: &'static str) -> NodeRef {
        let node = Self::new(class);
        node.set_name(name);
        node
    }

    /// Returns this node's unique identifier.
    #[must_use]
    #[inline]
    pub fn uid(&self) -> NodeUid {
        self.uid
    }

    /// Returns this node's class descriptor.
    #[must_use]
    #[inline]
    pub fn class(&self) -> NodeClass {
        self.class
    }

    /// Returns this node's run-time type.
    #[must_use]
    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.class.type_key()
    }

    /// Returns this node's dense dispatch index.
    #[must_use]
    #[inline]
    pub fn method_index(&self) -> MethodIndex {
        self.class.method_index()
    }

    /// Returns `true` if this node carries a child list.
    #[must_use]
    #[inline]
    pub fn is_group(&self) -> bool {
        self.children.is_some()
    }

    /// Returns `true` if traversing this node can affect sibling-visible
    /// traversal state.
    #[must_use]
    #[inline]
    pub fn affects_state(&self) -> bool {
        self.class.affects_state()
    }

    /// Returns the display name, if one was set.
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        self.name.get()
    }

    /// Sets the display name.
    pub fn set_name(&self, name: &'static str) {
        self.name.set(Some(name));
    }

    /// Returns the number of children (zero for non-group nodes).
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, |c| c.borrow().len())
    }

    /// Returns a cloned handle to the child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<NodeRef> {
        self.children
            .as_ref()
            .and_then(|c| c.borrow().get(index).cloned())
    }

    /// Appends a child.
    ///
    /// # Panics
    ///
    /// Panics if this node's class is not group-like.
    pub fn add_child(&self, child: &NodeRef) {
        self.children_mut().push(child.clone());
    }

    /// Inserts a child at `index`, shifting later children right.
    ///
    /// # Panics
    ///
    /// Panics if this node is not group-like or `index` is past the end.
    pub fn insert_child(&self, index: usize, child: &NodeRef) {
        self.children_mut().insert(index, child.clone());
    }

    /// Removes and returns the child at `index`, if it exists.
    pub fn remove_child(&self, index: usize) -> Option<NodeRef> {
        let children = self.children.as_ref()?;
        let mut children = children.borrow_mut();
        (index < children.len()).then(|| children.remove(index))
    }

    /// Replaces the child at `index`, returning the previous occupant.
    pub fn replace_child(&self, index: usize, child: &NodeRef) -> Option<NodeRef> {
        let children = self.children.as_ref()?;
        let mut children = children.borrow_mut();
        let slot = children.get_mut(index)?;
        Some(core::mem::replace(slot, child.clone()))
    }

    /// Returns the index of `child` in this node's child list.
    #[must_use]
    pub fn find_child(&self, child: &NodeRef) -> Option<usize> {
        self.children
            .as_ref()?
            .borrow()
            .iter()
            .position(|c| Rc::ptr_eq(c, child))
    }

    /// Attaches an opaque payload, returning the previous one.
    pub fn set_payload(&self, payload: Box<dyn Any>) -> Option<Box<dyn Any>> {
        self.payload.borrow_mut().replace(payload)
    }

    /// Removes and returns the payload.
    pub fn take_payload(&self) -> Option<Box<dyn Any>> {
        self.payload.borrow_mut().take()
    }

    /// Runs `f` against the payload downcast to `T`.
    ///
    /// Returns `None` if there is no payload or it is not a `T`.
    pub fn with_payload<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.payload
            .borrow()
            .as_ref()
            .and_then(|p| p.downcast_ref::<T>())
            .map(f)
    }

    fn children_mut(&self) -> core::cell::RefMut<'_, Vec<NodeRef>> {
        match &self.children {
            Some(children) => children.borrow_mut(),
            None => panic!(
                "node {} of class '{:?}' is not group-like and cannot hold children",
                self.uid, self.class
            ),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("uid", &self.uid).field("type", &self.type_key());
        if let Some(name) = self.name() {
            s.field("name", &name);
        }
        if self.is_group() {
            s.field("children", &self.child_count());
        }
        s.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{NodeClassFlags, NodeClassRegistry};
    use canopy_types::TypeRegistry;

    fn fixture() -> (NodeClass, NodeClass) {
        let mut types = TypeRegistry::new();
        let mut classes = NodeClassRegistry::new();
        let base = classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        let group = classes.register(
            &mut types,
            base.type_key(),
            "group",
            NodeClassFlags::GROUP | NodeClassFlags::AFFECTS_STATE,
        );
        (base, group)
    }

    #[test]
    fn uids_are_unique_and_monotonic() {
        let (base, _) = fixture();
        let a = Node::new(base);
        let b = Node::new(base);
        assert!(a.uid() < b.uid());
    }

    #[test]
    fn child_editing() {
        let (base, group) = fixture();
        let root = Node::new(group);
        let a = Node::new(base);
        let b = Node::new(base);

        root.add_child(&a);
        root.add_child(&b);
        assert_eq!(root.child_count(), 2);
        assert_eq!(root.find_child(&b), Some(1));

        let c = Node::new(base);
        root.insert_child(1, &c);
        assert_eq!(root.find_child(&b), Some(2));

        let removed = root.remove_child(1).unwrap();
        assert!(Rc::ptr_eq(&removed, &c));
        assert_eq!(root.child_count(), 2);

        let old = root.replace_child(0, &c).unwrap();
        assert!(Rc::ptr_eq(&old, &a));
        assert!(root.remove_child(5).is_none());
    }

    #[test]
    #[should_panic(expected = "not group-like")]
    fn leaf_rejects_children() {
        let (base, _) = fixture();
        let leaf = Node::new(base);
        let other = Node::new(base);
        leaf.add_child(&other);
    }

    #[test]
    fn names_and_payloads() {
        let (base, _) = fixture();
        let node = Node::named(base, "camera");
        assert_eq!(node.name(), Some("camera"));

        assert!(node.set_payload(Box::new(7_i64)).is_none());
        assert_eq!(node.with_payload::<i64, _>(|v| *v), Some(7));
        assert_eq!(node.with_payload::<u8, _>(|v| *v), None);
        assert!(node.take_payload().is_some());
        assert_eq!(node.with_payload::<i64, _>(|v| *v), None);
    }

    #[test]
    fn child_handles_pin_nodes() {
        let (base, group) = fixture();
        let root = Node::new(group);
        let child = Node::new(base);
        root.add_child(&child);

        let before = Rc::strong_count(&child);
        drop(root.remove_child(0));
        assert_eq!(Rc::strong_count(&child), before - 1);
    }
}
