// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owned paths: a head node plus resolved child-index steps.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use canopy_scene::NodeRef;

#[derive(Clone)]
pub(crate) struct Step {
    pub(crate) index: usize,
    pub(crate) node: NodeRef,
}

/// A root-rooted position in a scene graph.
///
/// Conceptually a head node and a chain of child indices; the node reached at
/// every step is resolved at append time and pinned, so a path stays valid
/// even if the graph is edited after it was built.
///
/// Lengths count *nodes*: an empty path has length 0, a head-only path
/// length 1. [`Path::index`] is the child index that led *to* a step, so it
/// is `None` at step 0.
///
/// Cloning is cheap (handle bumps only).
#[derive(Clone, Default)]
pub struct Path {
    head: Option<NodeRef>,
    steps: Vec<Step>,
}

impl Path {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a path holding only `head`.
    #[must_use]
    pub fn from_head(head: &NodeRef) -> Self {
        Self {
            head: Some(head.clone()),
            steps: Vec::new(),
        }
    }

    /// Sets the head, truncating any existing steps.
    pub fn set_head(&mut self, head: &NodeRef) {
        self.head = Some(head.clone());
        self.steps.clear();
    }

    /// Empties the path.
    pub fn clear(&mut self) {
        self.head = None;
        self.steps.clear();
    }

    /// Returns the head node.
    #[must_use]
    pub fn head(&self) -> Option<&NodeRef> {
        self.head.as_ref()
    }

    /// Returns the number of nodes on the path (head counts as one).
    #[must_use]
    pub fn len(&self) -> usize {
        if self.head.is_some() {
            1 + self.steps.len()
        } else {
            0
        }
    }

    /// Returns `true` if the path has no head.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns the child index taken to reach `step`.
    ///
    /// `None` at step 0 (the head was not reached through an index) and past
    /// the end.
    #[must_use]
    pub fn index(&self, step: usize) -> Option<usize> {
        if step == 0 {
            return None;
        }
        self.steps.get(step - 1).map(|s| s.index)
    }

    /// Returns the node at `step` (`node(0)` is the head).
    #[must_use]
    pub fn node(&self, step: usize) -> Option<&NodeRef> {
        if step == 0 {
            return self.head.as_ref();
        }
        self.steps.get(step - 1).map(|s| &s.node)
    }

    /// Returns the deepest node on the path.
    #[must_use]
    pub fn tail(&self) -> Option<&NodeRef> {
        self.steps.last().map_or(self.head.as_ref(), |s| Some(&s.node))
    }

    /// Appends `child`, which the caller asserts is child `index` of the
    /// current tail. Debug builds verify the claim.
    ///
    /// # Panics
    ///
    /// Panics if the path is empty.
    pub fn append(&mut self, child: &NodeRef, index: usize) {
        let tail = self.tail().cloned();
        let Some(tail) = tail else {
            panic!("cannot append to an empty path");
        };
        debug_assert!(
            tail.child(index).is_some_and(|c| Rc::ptr_eq(&c, child)),
            "appended node is not child {index} of the path tail"
        );
        self.steps.push(Step {
            index,
            node: child.clone(),
        });
    }

    /// Appends the tail's child at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the path is empty or `index` is not a valid child of the
    /// tail.
    pub fn append_index(&mut self, index: usize) {
        let tail = self.tail().cloned();
        let Some(tail) = tail else {
            panic!("cannot append to an empty path");
        };
        let Some(child) = tail.child(index) else {
            panic!("path tail {} has no child {index}", tail.uid());
        };
        self.steps.push(Step { index, node: child });
    }

    /// Appends `child` by locating it in the tail's child list.
    ///
    /// # Panics
    ///
    /// Panics if the path is empty or `child` is not a child of the tail.
    pub fn append_child(&mut self, child: &NodeRef) {
        let tail = self.tail().cloned();
        let Some(tail) = tail else {
            panic!("cannot append to an empty path");
        };
        let Some(index) = tail.find_child(child) else {
            panic!("appended node is not a child of the path tail {}", tail.uid());
        };
        self.steps.push(Step {
            index,
            node: child.clone(),
        });
    }

    /// Removes the deepest step; removing the last step leaves the head, and
    /// popping a head-only path empties it.
    pub fn pop(&mut self) {
        if self.steps.pop().is_none() {
            self.head = None;
        }
    }

    /// Shortens the path to `len` nodes. No-op if already shorter.
    pub fn truncate(&mut self, len: usize) {
        if len == 0 {
            self.clear();
        } else {
            self.steps.truncate(len - 1);
        }
    }

    /// Returns `true` if `other` is a prefix of this path: same head node and
    /// matching child indices over all of `other`'s steps.
    ///
    /// An empty `other` is never a prefix.
    #[must_use]
    pub fn contains_path(&self, other: &Self) -> bool {
        let (Some(head), Some(other_head)) = (self.head(), other.head()) else {
            return false;
        };
        if !Rc::ptr_eq(head, other_head) || other.len() > self.len() {
            return false;
        }
        (1..other.len()).all(|step| self.index(step) == other.index(step))
    }

    /// Compares two paths in traversal order: head identity first (creation
    /// order), then child indices lexicographically. A prefix sorts before
    /// its extensions; empty paths sort first.
    #[must_use]
    pub fn cmp_traversal(&self, other: &Self) -> Ordering {
        let head = self.head().map(|h| h.uid());
        let other_head = other.head().map(|h| h.uid());
        head.cmp(&other_head).then_with(|| {
            let indices = self.steps.iter().map(|s| s.index);
            let other_indices = other.steps.iter().map(|s| s.index);
            indices.cmp(other_indices)
        })
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_traversal(other) == Ordering::Equal
    }
}

impl Eq for Path {}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_traversal(other)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path(")?;
        match self.head() {
            Some(head) => write!(f, "{}", head.uid())?,
            None => write!(f, "-")?,
        }
        for step in &self.steps {
            write!(f, "/{}", step.index)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_scene::{Node, NodeClass, NodeClassFlags, NodeClassRegistry};
    use canopy_types::{TypeKey, TypeRegistry};

    fn group_class() -> NodeClass {
        let mut types = TypeRegistry::new();
        let mut classes = NodeClassRegistry::new();
        classes.register(
            &mut types,
            TypeKey::BAD,
            "group",
            NodeClassFlags::GROUP | NodeClassFlags::AFFECTS_STATE,
        )
    }

    fn chain(depth: usize) -> (NodeRef, Path) {
        let group = group_class();
        let root = Node::new(group);
        let mut path = Path::from_head(&root);
        let mut cur = root.clone();
        for _ in 0..depth {
            let child = Node::new(group);
            cur.add_child(&child);
            path.append_child(&child);
            cur = child;
        }
        (root, path)
    }

    #[test]
    fn empty_path_basics() {
        let path = Path::new();
        assert!(path.is_empty());
        assert_eq!(path.len(), 0);
        assert!(path.head().is_none());
        assert!(path.tail().is_none());
        assert!(path.node(0).is_none());
    }

    #[test]
    fn lengths_count_nodes() {
        let (root, path) = chain(2);
        assert_eq!(path.len(), 3);
        assert!(Rc::ptr_eq(path.node(0).unwrap(), &root));
        assert!(path.index(0).is_none());
        assert_eq!(path.index(1), Some(0));
        assert_eq!(path.index(2), Some(0));
        assert!(path.index(3).is_none());
    }

    #[test]
    fn set_head_truncates() {
        let (root, mut path) = chain(2);
        path.set_head(&root);
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn pop_and_truncate() {
        let (_root, mut path) = chain(3);
        path.pop();
        assert_eq!(path.len(), 3);
        path.truncate(1);
        assert_eq!(path.len(), 1);
        path.pop();
        assert!(path.is_empty());
        path.pop();
        assert!(path.is_empty());
    }

    #[test]
    fn append_variants_agree() {
        let group = group_class();
        let root = Node::new(group);
        let a = Node::new(group);
        let b = Node::new(group);
        root.add_child(&a);
        root.add_child(&b);

        let mut by_node = Path::from_head(&root);
        by_node.append_child(&b);
        let mut by_index = Path::from_head(&root);
        by_index.append_index(1);
        let mut by_pair = Path::from_head(&root);
        by_pair.append(&b, 1);

        assert_eq!(by_node, by_index);
        assert_eq!(by_node, by_pair);
    }

    #[test]
    #[should_panic(expected = "empty path")]
    fn append_to_empty_panics() {
        let group = group_class();
        let node = Node::new(group);
        Path::new().append_child(&node);
    }

    #[test]
    fn paths_pin_their_nodes() {
        let (_root, path) = chain(1);
        let tail = path.tail().unwrap().clone();
        let count = Rc::strong_count(&tail);
        drop(path);
        assert_eq!(Rc::strong_count(&tail), count - 1);
    }

    #[test]
    fn containment_is_prefix_comparison() {
        let group = group_class();
        let root = Node::new(group);
        let a = Node::new(group);
        let b = Node::new(group);
        let a0 = Node::new(group);
        root.add_child(&a);
        root.add_child(&b);
        a.add_child(&a0);

        let mut deep = Path::from_head(&root);
        deep.append_child(&a);
        deep.append_child(&a0);

        let mut to_a = Path::from_head(&root);
        to_a.append_child(&a);

        let mut to_b = Path::from_head(&root);
        to_b.append_child(&b);

        assert!(deep.contains_path(&to_a));
        assert!(deep.contains_path(&deep.clone()));
        assert!(!deep.contains_path(&to_b));
        assert!(!to_a.contains_path(&deep));
        assert!(!deep.contains_path(&Path::new()));
        // Same shape, different head: not a prefix.
        let other_root = Node::new(group);
        assert!(!deep.contains_path(&Path::from_head(&other_root)));
    }

    #[test]
    fn traversal_order_is_head_then_indices() {
        let group = group_class();
        let first = Node::new(group);
        let second = Node::new(group);
        for root in [&first, &second] {
            for _ in 0..2 {
                root.add_child(&Node::new(group));
            }
        }

        let mut a0 = Path::from_head(&first);
        a0.append_index(0);
        let mut a1 = Path::from_head(&first);
        a1.append_index(1);
        let head_only = Path::from_head(&first);
        let other = Path::from_head(&second);

        assert!(a0 < a1);
        assert!(head_only < a0);
        assert!(a1 < other);
        assert!(Path::new() < head_only);
        assert_eq!(a0.cmp_traversal(&a0.clone()), Ordering::Equal);
    }
}
