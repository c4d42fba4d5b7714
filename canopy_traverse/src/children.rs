// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child-traversal loops and the canonical group methods built on them.

use smallvec::SmallVec;

use canopy_scene::NodeRef;

use crate::action::{Action, PathCode};

impl Action {
    /// Traverses every child of `node`, polling termination between
    /// children.
    ///
    /// Uses a placeholder descent, so only valid when the path code cannot
    /// change below `node` (anything but [`PathCode::InPath`]); in-path
    /// traversal goes through [`Action::traverse_in_path`].
    pub fn traverse_children(&mut self, node: &NodeRef) {
        let count = node.child_count();
        if count > 0 {
            self.traverse_children_range(node, 0, count - 1);
        }
    }

    /// Traverses the children of `node` from `first` through `last`
    /// inclusive, polling termination between children.
    pub fn traverse_children_range(&mut self, node: &NodeRef, first: usize, last: usize) {
        if first > last {
            return;
        }
        if first == last {
            if self.has_terminated() {
                return;
            }
            if let Some(child) = node.child(first) {
                let prev = self.push_cur_path(first, Some(&child));
                self.traverse(&child);
                self.pop_cur_path(prev);
            }
        } else {
            self.push_cur_path_all();
            for index in first..=last {
                if self.has_terminated() {
                    break;
                }
                let Some(child) = node.child(index) else {
                    break;
                };
                self.pop_push_cur_path(index, Some(&child));
                self.traverse(&child);
            }
            self.pop_cur_path_all();
        }
    }

    /// In-path child traversal: walks children `0..=last on-path index`,
    /// entering off-path children only when their class affects traversal
    /// state, and skipping everything after the last on-path child.
    ///
    /// `on_path` is the index slice produced by [`Action::path_code`] at this
    /// node (copied out of the scratch buffer by the caller).
    pub fn traverse_in_path(&mut self, node: &NodeRef, on_path: &[usize]) {
        debug_assert_eq!(self.cur_path_code(), PathCode::InPath);
        let Some(&last) = on_path.last() else {
            return;
        };
        for index in 0..=last {
            if self.has_terminated() {
                break;
            }
            let Some(child) = node.child(index) else {
                break;
            };
            let prev = self.push_cur_path(index, Some(&child));
            if self.cur_path_code() != PathCode::OffPath || child.affects_state() {
                self.traverse(&child);
            }
            self.pop_cur_path(prev);
        }
    }
}

/// The canonical method for group-like node classes: descend according to
/// the current path code.
///
/// - [`PathCode::InPath`]: traverse on-path children, plus off-path left
///   siblings whose class affects state.
/// - [`PathCode::OffPath`]: skip the children entirely; the group was only
///   entered so it could update state, and nothing below it is relevant.
/// - Otherwise: traverse every child.
///
/// Register it directly, or call it from a class-specific method after
/// custom per-group work.
pub fn group_method(action: &mut Action, node: &NodeRef) {
    let (code, on_path) = action.path_code();
    match code {
        PathCode::InPath => {
            let picks: SmallVec<[usize; 8]> = SmallVec::from_slice(on_path);
            action.traverse_in_path(node, &picks);
        }
        PathCode::OffPath => {}
        PathCode::NoPath | PathCode::BelowPath => action.traverse_children(node),
    }
}

/// [`group_method`] inside its own state scope: whatever the subtree writes
/// into traversal state is undone when the group is left.
pub fn scoped_group_method(action: &mut Action, node: &NodeRef) {
    action.state().push();
    group_method(action, node);
    action.state().pop();
}
