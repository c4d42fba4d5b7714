// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The traversal kernel.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::mem;

use canopy_path::{Path, PathList, TempPath};
use canopy_scene::NodeRef;
use canopy_state::State;
use canopy_types::TypeKey;

use crate::methods::{ActionMethod, MethodTable};
use crate::runtime::SharedRuntime;

/// What an action is currently applied to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AppliedCode {
    /// A whole graph, rooted at a node.
    Node,
    /// A single path.
    Path,
    /// A list of paths.
    PathList,
}

/// Where the current traversal position lies relative to the applied
/// path(s).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PathCode {
    /// Applied to a node; no path is relevant anywhere.
    NoPath,
    /// On a strict prefix of at least one applied path: some children are on
    /// a path, the rest are off it.
    InPath,
    /// At or below the end of an applied path: every descendant is relevant.
    BelowPath,
    /// Off every applied path. Nodes are only entered here to keep traversal
    /// state correct for on-path right siblings.
    OffPath,
}

/// The traversal target plus whatever pins it alive.
enum Applied {
    Node(Option<NodeRef>),
    Path(Rc<Path>),
    PathList {
        original: Rc<PathList>,
        active: Rc<PathList>,
    },
}

impl Default for Applied {
    fn default() -> Self {
        Self::Node(None)
    }
}

struct SavedTraversal {
    applied: Applied,
    code: PathCode,
    path: TempPath,
}

/// A traversal action instance.
///
/// An action is an instance of a registered action *class*: the class decides
/// dispatch (which method runs per node class), enabled elements, and
/// begin/end hooks. The instance carries the transient traversal machinery
/// (the element [`State`], the current path and path code, the termination
/// flag) plus an optional payload for concrete-action data such as search
/// criteria or accumulated results.
///
/// Apply the same instance as often as needed; dispatch tables and the state
/// are cached between applies and rebuilt only when the registries change.
/// Node methods receive `&mut Action` and may re-enter [`Action::apply`] on
/// another subgraph: every entry point saves and restores the applied target,
/// path code, and current path around the traversal.
pub struct Action {
    runtime: SharedRuntime,
    class: TypeKey,
    payload: Option<Box<dyn Any>>,
    table: MethodTable,
    begin: Option<ActionMethod>,
    end: Option<ActionMethod>,
    state: Option<State>,
    state_version: u64,
    applied: Applied,
    cur_path: TempPath,
    cur_code: PathCode,
    terminated: bool,
    scratch: Vec<Vec<usize>>,
}

impl Action {
    /// Creates an instance of the action class `class`.
    ///
    /// # Panics
    ///
    /// Panics if `class` is not a registered action class.
    #[must_use]
    pub fn new(runtime: &SharedRuntime, class: TypeKey) -> Self {
        assert!(
            runtime.borrow().actions().contains(class),
            "type key {class} is not a registered action class"
        );
        Self {
            runtime: runtime.clone(),
            class,
            payload: None,
            table: MethodTable::new(),
            begin: None,
            end: None,
            state: None,
            state_version: 0,
            applied: Applied::default(),
            cur_path: TempPath::with_capacity(8),
            cur_code: PathCode::NoPath,
            terminated: false,
            scratch: Vec::new(),
        }
    }

    /// [`Action::new`] with a payload attached.
    #[must_use]
    pub fn with_payload(runtime: &SharedRuntime, class: TypeKey, payload: Box<dyn Any>) -> Self {
        let mut action = Self::new(runtime, class);
        action.payload = Some(payload);
        action
    }

    /// Returns this instance's action class.
    #[must_use]
    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.class
    }

    /// Returns `true` if this instance's class is `ancestor` or derived from
    /// it.
    #[must_use]
    pub fn is_of_type(&self, ancestor: TypeKey) -> bool {
        self.runtime
            .borrow()
            .types()
            .is_derived_from(self.class, ancestor)
    }

    /// Returns the shared runtime this action dispatches against.
    #[must_use]
    #[inline]
    pub fn runtime(&self) -> &SharedRuntime {
        &self.runtime
    }

    /// Returns the payload downcast to `T`.
    #[must_use]
    pub fn payload<T: 'static>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref())
    }

    /// Returns the payload downcast to `T`, mutably.
    pub fn payload_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.payload.as_deref_mut().and_then(|p| p.downcast_mut())
    }

    /// Replaces the payload, returning the previous one.
    pub fn set_payload(&mut self, payload: Box<dyn Any>) -> Option<Box<dyn Any>> {
        self.payload.replace(payload)
    }

    /// Removes and returns the payload.
    pub fn take_payload(&mut self) -> Option<Box<dyn Any>> {
        self.payload.take()
    }

    // ------------------------------------------------------------------
    // Applying.

    /// Applies this action to the graph rooted at `root`.
    pub fn apply(&mut self, root: &NodeRef) {
        let saved = self.save_traversal();
        self.set_up();
        self.terminated = false;
        self.cur_code = PathCode::NoPath;
        self.applied = Applied::Node(Some(root.clone()));
        self.cur_path.set_head(root);
        self.begin_traversal(root);
        self.end_traversal(root);
        self.restore_traversal(saved);
    }

    /// Applies this action along a single path. Applying an empty path is a
    /// no-op.
    pub fn apply_path(&mut self, path: &Path) {
        let saved = self.save_traversal();
        self.set_up();
        self.terminated = false;
        let target = Rc::new(path.clone());
        self.cur_code = if target.len() > 1 {
            PathCode::InPath
        } else {
            PathCode::BelowPath
        };
        let head = target.head().cloned();
        self.applied = Applied::Path(target);
        if let Some(head) = head {
            self.cur_path.set_head(&head);
            self.begin_traversal(&head);
            self.end_traversal(&head);
        }
        self.restore_traversal(saved);
    }

    /// Applies this action to a list of paths.
    ///
    /// With `obeys_rules` the caller asserts the list is already normalised
    /// (single head, traversal order, no duplicates, no path a prefix of
    /// another) and it is traversed as-is. Otherwise the list is cloned,
    /// sorted, and uniquified first; if the normalised list spans several
    /// heads, one traversal runs per head in sorted order, stopping early
    /// once the action is terminated.
    pub fn apply_path_list(&mut self, paths: &PathList, obeys_rules: bool) {
        self.set_up();
        if paths.is_empty() {
            return;
        }
        let saved = self.save_traversal();
        self.terminated = false;
        let original = Rc::new(paths.clone());

        if obeys_rules {
            self.run_path_list(original.clone(), original, true);
        } else {
            let mut sorted = paths.clone();
            sorted.sort();
            sorted.uniquify();
            let count = sorted.len();
            let single_head = match (
                sorted.get(0).and_then(Path::head),
                sorted.get(count - 1).and_then(Path::head),
            ) {
                (Some(first), Some(last)) => Rc::ptr_eq(first, last),
                _ => false,
            };
            if single_head {
                self.run_path_list(original, Rc::new(sorted), true);
            } else {
                let mut i = 0;
                while i < count && !self.terminated {
                    let Some(head) = sorted[i].head().cloned() else {
                        i += 1;
                        continue;
                    };
                    let mut group = PathList::new();
                    while i < count
                        && sorted[i].head().is_some_and(|h| Rc::ptr_eq(h, &head))
                    {
                        group.append(sorted[i].clone());
                        i += 1;
                    }
                    self.run_path_list(original.clone(), Rc::new(group), false);
                }
            }
        }
        self.restore_traversal(saved);
    }

    fn run_path_list(&mut self, original: Rc<PathList>, active: Rc<PathList>, with_end: bool) {
        let Some(head) = active.get(0).and_then(Path::head).cloned() else {
            return;
        };
        self.cur_code = if active[0].len() > 1 {
            PathCode::InPath
        } else {
            PathCode::BelowPath
        };
        self.applied = Applied::PathList { original, active };
        self.cur_path.set_head(&head);
        self.begin_traversal(&head);
        if with_end {
            self.end_traversal(&head);
        }
    }

    // ------------------------------------------------------------------
    // Reentry.

    /// Saves traversal context, walks `path`, and restores. Unlike
    /// [`Action::apply_path`] this never runs the begin/end hooks, so a node
    /// method can redirect the current traversal without re-triggering
    /// one-time setup.
    pub fn switch_to_path_traversal(&mut self, path: &Path) {
        let Some(head) = path.head().cloned() else {
            return;
        };
        let saved = self.save_traversal();
        self.cur_code = if path.len() > 1 {
            PathCode::InPath
        } else {
            PathCode::BelowPath
        };
        self.applied = Applied::Path(Rc::new(path.clone()));
        self.cur_path.set_head(&head);
        self.traverse(&head);
        self.restore_traversal(saved);
    }

    /// Saves traversal context, walks the graph under `node`, and restores.
    /// Never runs the begin/end hooks.
    pub fn switch_to_node_traversal(&mut self, node: &NodeRef) {
        let saved = self.save_traversal();
        self.cur_code = PathCode::NoPath;
        self.applied = Applied::Node(Some(node.clone()));
        self.cur_path.set_head(node);
        self.traverse(node);
        self.restore_traversal(saved);
    }

    fn save_traversal(&mut self) -> SavedTraversal {
        SavedTraversal {
            applied: mem::take(&mut self.applied),
            code: self.cur_code,
            path: mem::take(&mut self.cur_path),
        }
    }

    fn restore_traversal(&mut self, saved: SavedTraversal) {
        self.applied = saved.applied;
        self.cur_code = saved.code;
        self.cur_path = saved.path;
    }

    // ------------------------------------------------------------------
    // Traversal machinery.

    /// Dispatches `node` through this action's method table.
    pub fn traverse(&mut self, node: &NodeRef) {
        let method = self.table.get(node.method_index());
        method(self, node);
    }

    /// Records descent into child `child_index` and updates the path code.
    /// Returns the previous code for the matching [`Action::pop_cur_path`].
    ///
    /// Passing the resolved child pins it on the current path; pass `None`
    /// only when the caller guarantees nobody queries the node at this step.
    pub fn push_cur_path(&mut self, child_index: usize, child: Option<&NodeRef>) -> PathCode {
        let prev = self.cur_code;
        self.cur_path.append(child_index, child);
        if self.cur_code == PathCode::InPath {
            let curlen = self.cur_path.len();
            let next = match &self.applied {
                Applied::Path(target) => {
                    debug_assert!(curlen <= target.len());
                    if self.cur_path.index(curlen - 1) != target.index(curlen - 1) {
                        PathCode::OffPath
                    } else if curlen == target.len() {
                        PathCode::BelowPath
                    } else {
                        PathCode::InPath
                    }
                }
                Applied::PathList { active, .. } => {
                    // Linear containment scan; lists applied this way are
                    // small in practice.
                    let mut containing = None;
                    for path in active.iter() {
                        if path.len() >= curlen && self.cur_path.is_prefix_of(path) {
                            containing = Some(path.len());
                            break;
                        }
                    }
                    match containing {
                        None => PathCode::OffPath,
                        Some(len) if len == curlen => PathCode::BelowPath,
                        Some(_) => PathCode::InPath,
                    }
                }
                Applied::Node(_) => PathCode::InPath,
            };
            self.cur_code = next;
        }
        prev
    }

    /// Undoes the matching [`Action::push_cur_path`], restoring `prev_code`.
    pub fn pop_cur_path(&mut self, prev_code: PathCode) {
        self.cur_path.pop();
        self.cur_code = prev_code;
    }

    /// Records descent into *all* children at once (a placeholder step).
    /// Only valid when the path code cannot change below this node.
    pub fn push_cur_path_all(&mut self) {
        debug_assert!(
            self.cur_code != PathCode::InPath,
            "placeholder descent would lose in-path tracking"
        );
        self.cur_path.append_placeholder();
    }

    /// Replaces the deepest step for a sibling transition under a
    /// placeholder descent.
    pub fn pop_push_cur_path(&mut self, child_index: usize, child: Option<&NodeRef>) {
        self.cur_path.pop();
        self.cur_path.append(child_index, child);
    }

    /// Undoes a [`Action::push_cur_path_all`] (or the deepest sibling step
    /// under one).
    pub fn pop_cur_path_all(&mut self) {
        self.cur_path.pop();
    }

    /// Returns the current path code and, when [`PathCode::InPath`], the
    /// child indices at the current depth that lie on an applied path, in
    /// traversal order without duplicates.
    ///
    /// The slice lives in a per-depth scratch buffer owned by the action;
    /// copy it out before traversing children.
    pub fn path_code(&mut self) -> (PathCode, &[usize]) {
        if self.cur_code != PathCode::InPath {
            return (self.cur_code, &[]);
        }
        let curlen = self.cur_path.len();
        debug_assert!(curlen > 0, "in-path traversal with an empty current path");
        while self.scratch.len() < curlen {
            self.scratch.push(Vec::new());
        }
        let slot = curlen - 1;
        let buf = &mut self.scratch[slot];
        buf.clear();
        match &self.applied {
            Applied::Path(target) => {
                if let Some(index) = target.index(curlen) {
                    buf.push(index);
                }
            }
            Applied::PathList { active, .. } => {
                let mut prev = None;
                for path in active.iter() {
                    if path.len() > curlen && self.cur_path.is_prefix_of(path) {
                        if let Some(index) = path.index(curlen) {
                            if prev != Some(index) {
                                buf.push(index);
                                prev = Some(index);
                            }
                        }
                    }
                }
            }
            Applied::Node(_) => {}
        }
        (PathCode::InPath, &self.scratch[slot])
    }

    /// Returns the current path code without computing on-path indices.
    #[must_use]
    #[inline]
    pub fn cur_path_code(&self) -> PathCode {
        self.cur_code
    }

    /// Returns the traversal's current position, from the applied head to
    /// the node being visited.
    #[must_use]
    #[inline]
    pub fn cur_path(&self) -> &TempPath {
        &self.cur_path
    }

    /// Returns the node at the tip of the current path, if resolved.
    #[must_use]
    pub fn cur_path_tail(&self) -> Option<&NodeRef> {
        self.cur_path.tail()
    }

    // ------------------------------------------------------------------
    // Termination.

    /// Returns `true` if the action was cooperatively terminated.
    ///
    /// The flag stays `false` when a traversal simply runs to completion;
    /// only [`Action::set_terminated`] raises it.
    #[must_use]
    #[inline]
    pub fn has_terminated(&self) -> bool {
        self.terminated
    }

    /// Sets the termination flag. Child-traversal loops and multi-head
    /// path-list traversal poll it and stop; the kernel never aborts a
    /// method already running.
    pub fn set_terminated(&mut self, terminated: bool) {
        self.terminated = terminated;
    }

    // ------------------------------------------------------------------
    // State.

    /// Returns the element state, creating it on first use from this action
    /// class's effective enabled-element set.
    pub fn state(&mut self) -> &mut State {
        if self.state.is_none() {
            let runtime = self.runtime.clone();
            let runtime = runtime.borrow();
            let enabled = runtime
                .actions()
                .effective_enabled(runtime.types(), self.class);
            self.state = Some(State::new(runtime.elements(), &enabled));
            self.state_version = runtime.actions().elements_version();
        }
        match &mut self.state {
            Some(state) => state,
            None => unreachable!("state was just created"),
        }
    }

    /// Drops the cached state; the next apply recreates it.
    pub fn invalidate_state(&mut self) {
        self.state = None;
    }

    // ------------------------------------------------------------------
    // Applied-target accessors.

    /// Returns what kind of target the action is applied to.
    #[must_use]
    pub fn what_applied_to(&self) -> AppliedCode {
        match &self.applied {
            Applied::Node(_) => AppliedCode::Node,
            Applied::Path(_) => AppliedCode::Path,
            Applied::PathList { .. } => AppliedCode::PathList,
        }
    }

    /// Returns the node applied to, when applied to a node.
    #[must_use]
    pub fn node_applied_to(&self) -> Option<&NodeRef> {
        match &self.applied {
            Applied::Node(node) => node.as_ref(),
            _ => None,
        }
    }

    /// Returns the path applied to, when applied to a path.
    #[must_use]
    pub fn path_applied_to(&self) -> Option<&Path> {
        match &self.applied {
            Applied::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the path list being traversed, when applied to one.
    ///
    /// This may be a normalised copy of the list handed to
    /// [`Action::apply_path_list`], or one per-head group of it.
    #[must_use]
    pub fn path_list_applied_to(&self) -> Option<&PathList> {
        match &self.applied {
            Applied::PathList { active, .. } => Some(active),
            _ => None,
        }
    }

    /// Returns the path list originally handed to
    /// [`Action::apply_path_list`].
    #[must_use]
    pub fn original_path_list_applied_to(&self) -> Option<&PathList> {
        match &self.applied {
            Applied::PathList { original, .. } => Some(original),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Internals.

    /// Rebuilds cached dispatch structures if the registries changed, and
    /// makes sure the state exists before traversal starts.
    fn set_up(&mut self) {
        let runtime = self.runtime.clone();
        let runtime = runtime.borrow();
        self.table.set_up(
            runtime.types(),
            runtime.nodes(),
            runtime.actions(),
            self.class,
        );
        self.begin = runtime.actions().resolve_begin(runtime.types(), self.class);
        self.end = runtime.actions().resolve_end(runtime.types(), self.class);

        let elements_version = runtime.actions().elements_version();
        if self.state.is_some() && self.state_version != elements_version {
            self.state = None;
        }
        if self.state.is_none() {
            let enabled = runtime
                .actions()
                .effective_enabled(runtime.types(), self.class);
            self.state = Some(State::new(runtime.elements(), &enabled));
            self.state_version = elements_version;
        }
    }

    fn begin_traversal(&mut self, node: &NodeRef) {
        match self.begin {
            Some(hook) => hook(self, node),
            None => self.traverse(node),
        }
    }

    fn end_traversal(&mut self, node: &NodeRef) {
        if let Some(hook) = self.end {
            hook(self, node);
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("class", &self.class)
            .field("applied", &self.what_applied_to())
            .field("path_code", &self.cur_code)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    #[test]
    fn fresh_action_defaults() {
        let runtime = Runtime::new().into_shared();
        let class = {
            let mut rt = runtime.borrow_mut();
            let base = rt.action_base();
            rt.register_action_class("probe", base)
        };
        let action = Action::new(&runtime, class);

        assert_eq!(action.what_applied_to(), AppliedCode::Node);
        assert!(action.node_applied_to().is_none());
        assert!(action.path_applied_to().is_none());
        assert!(action.path_list_applied_to().is_none());
        assert_eq!(action.cur_path_code(), PathCode::NoPath);
        assert!(!action.has_terminated());
        assert!(action.cur_path().is_empty());
    }

    #[test]
    #[should_panic(expected = "not a registered action class")]
    fn unknown_class_is_rejected() {
        let runtime = Runtime::new().into_shared();
        let _ = Action::new(&runtime, TypeKey::BAD);
    }

    #[test]
    fn payload_round_trip() {
        let runtime = Runtime::new().into_shared();
        let class = {
            let mut rt = runtime.borrow_mut();
            let base = rt.action_base();
            rt.register_action_class("probe", base)
        };
        let mut action = Action::with_payload(&runtime, class, Box::new(3_i32));
        assert_eq!(action.payload::<i32>(), Some(&3));
        *action.payload_mut::<i32>().unwrap() = 4;
        assert_eq!(action.payload::<i32>(), Some(&4));
        assert!(action.payload::<u8>().is_none());
        assert!(action.take_payload().is_some());
        assert!(action.payload::<i32>().is_none());
    }
}
