// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scratch paths maintained by a running traversal.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use canopy_scene::NodeRef;

use crate::path::Path;

#[derive(Clone)]
struct TempStep {
    index: Option<usize>,
    node: Option<NodeRef>,
}

/// The current position of a traversal.
///
/// Shaped like a [`Path`] but built for constant churn: steps are pushed and
/// popped as the walk descends and returns, and a step may be a *placeholder*
/// ("all children at once"), pushed by nodes that traverse every child while
/// knowing the path relation cannot change underneath them.
///
/// Nodes recorded at each step are pinned, so a node removed from its parent
/// by a traversal callback remains valid for the rest of the visit without
/// re-lookup.
#[derive(Clone, Default)]
pub struct TempPath {
    head: Option<NodeRef>,
    steps: Vec<TempStep>,
}

impl TempPath {
    /// Creates an empty scratch path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scratch path with room for `depth` steps.
    #[must_use]
    pub fn with_capacity(depth: usize) -> Self {
        Self {
            head: None,
            steps: Vec::with_capacity(depth),
        }
    }

    /// Sets the head, truncating any existing steps.
    pub fn set_head(&mut self, head: &NodeRef) {
        self.head = Some(head.clone());
        self.steps.clear();
    }

    /// Returns the head node.
    #[must_use]
    pub fn head(&self) -> Option<&NodeRef> {
        self.head.as_ref()
    }

    /// Returns the number of nodes on the path, placeholders included.
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

    /// Returns the child index taken to reach `step`; `None` at step 0, past
    /// the end, or for a placeholder step.
    #[must_use]
    pub fn index(&self, step: usize) -> Option<usize> {
        if step == 0 {
            return None;
        }
        self.steps.get(step - 1).and_then(|s| s.index)
    }

    /// Returns the node at `step`, if resolved.
    #[must_use]
    pub fn node(&self, step: usize) -> Option<&NodeRef> {
        if step == 0 {
            return self.head.as_ref();
        }
        self.steps.get(step - 1).and_then(|s| s.node.as_ref())
    }

    /// Returns the node at the deepest step, if resolved (`None` when the
    /// deepest step is a placeholder or the path is empty).
    #[must_use]
    pub fn tail(&self) -> Option<&NodeRef> {
        self.steps.last().map_or(self.head.as_ref(), |s| s.node.as_ref())
    }

    /// Pushes a step for descending into child `index`. Passing the resolved
    /// child pins it for the duration of the visit.
    pub fn append(&mut self, index: usize, node: Option<&NodeRef>) {
        debug_assert!(self.head.is_some(), "appending to a headless scratch path");
        self.steps.push(TempStep {
            index: Some(index),
            node: node.cloned(),
        });
    }

    /// Pushes a placeholder step ("all children").
    pub fn append_placeholder(&mut self) {
        debug_assert!(self.head.is_some(), "appending to a headless scratch path");
        self.steps.push(TempStep {
            index: None,
            node: None,
        });
    }

    /// Removes the deepest step; popping a head-only path empties it.
    pub fn pop(&mut self) {
        if self.steps.pop().is_none() {
            self.head = None;
        }
    }

    /// Returns `true` if this position is a prefix of `path`: identical head
    /// and matching indices over all of this path's steps. Placeholder steps
    /// never match.
    #[must_use]
    pub fn is_prefix_of(&self, path: &Path) -> bool {
        let (Some(head), Some(path_head)) = (self.head(), path.head()) else {
            return false;
        };
        if !Rc::ptr_eq(head, path_head) || self.len() > path.len() {
            return false;
        }
        (1..self.len()).all(|step| {
            self.index(step)
                .is_some_and(|index| path.index(step) == Some(index))
        })
    }

    /// Materialises the current position as an owned [`Path`].
    ///
    /// Returns `None` if the path is empty or any step is a placeholder or
    /// was pushed without its resolved node.
    #[must_use]
    pub fn snapshot(&self) -> Option<Path> {
        let head = self.head()?;
        let mut path = Path::from_head(head);
        for step in &self.steps {
            let (Some(index), Some(node)) = (step.index, step.node.as_ref()) else {
                return None;
            };
            path.append(node, index);
        }
        Some(path)
    }
}

impl fmt::Debug for TempPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TempPath(")?;
        match self.head() {
            Some(head) => write!(f, "{}", head.uid())?,
            None => write!(f, "-")?,
        }
        for step in &self.steps {
            match step.index {
                Some(index) => write!(f, "/{index}")?,
                None => write!(f, "/*")?,
            }
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

    #[test]
    fn push_pop_mirrors_descent() {
        let group = group_class();
        let root = Node::new(group);
        let child = Node::new(group);
        root.add_child(&child);

        let mut temp = TempPath::with_capacity(8);
        temp.set_head(&root);
        assert_eq!(temp.len(), 1);

        temp.append(0, Some(&child));
        assert_eq!(temp.len(), 2);
        assert_eq!(temp.index(1), Some(0));
        assert!(Rc::ptr_eq(temp.tail().unwrap(), &child));

        temp.pop();
        assert_eq!(temp.len(), 1);
        temp.pop();
        assert!(temp.is_empty());
    }

    #[test]
    fn placeholders_count_but_do_not_resolve() {
        let group = group_class();
        let root = Node::new(group);
        let mut temp = TempPath::new();
        temp.set_head(&root);
        temp.append_placeholder();

        assert_eq!(temp.len(), 2);
        assert!(temp.index(1).is_none());
        assert!(temp.node(1).is_none());
        assert!(temp.tail().is_none());
        assert!(temp.snapshot().is_none());
    }

    #[test]
    fn prefix_queries_against_real_paths() {
        let group = group_class();
        let root = Node::new(group);
        let a = Node::new(group);
        let a0 = Node::new(group);
        root.add_child(&a);
        a.add_child(&a0);

        let mut target = Path::from_head(&root);
        target.append_child(&a);
        target.append_child(&a0);

        let mut temp = TempPath::new();
        temp.set_head(&root);
        assert!(temp.is_prefix_of(&target));
        temp.append(0, Some(&a));
        assert!(temp.is_prefix_of(&target));
        temp.append(1, Some(&a0));
        assert!(!temp.is_prefix_of(&target));

        temp.pop();
        temp.append_placeholder();
        assert!(!temp.is_prefix_of(&target));
        assert!(!TempPath::new().is_prefix_of(&target));
    }

    #[test]
    fn snapshot_round_trips() {
        let group = group_class();
        let root = Node::new(group);
        let a = Node::new(group);
        root.add_child(&a);

        let mut temp = TempPath::new();
        temp.set_head(&root);
        temp.append(0, Some(&a));

        let path = temp.snapshot().unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.index(1), Some(0));
        assert!(Rc::ptr_eq(path.tail().unwrap(), &a));
    }

    #[test]
    fn pinned_nodes_survive_detachment() {
        let group = group_class();
        let root = Node::new(group);
        let a = Node::new(group);
        root.add_child(&a);

        let mut temp = TempPath::new();
        temp.set_head(&root);
        temp.append(0, Some(&a));

        root.remove_child(0);
        assert!(Rc::ptr_eq(temp.node(1).unwrap(), &a));
    }
}
