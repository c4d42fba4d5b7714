// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The traversal state: scoped stacks of element instances.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use canopy_scene::NodeUid;

use crate::element::{Element, ElementFactory, ElementRegistry, StackIndex};
use crate::enabled::EnabledElements;

struct StackEntry {
    depth: usize,
    writer: Option<NodeUid>,
    element: Box<dyn Element>,
}

struct ElementStack {
    factory: Option<ElementFactory>,
    entries: Vec<StackEntry>,
}

/// The stack of element instances maintained during one traversal.
///
/// The state holds one stack per [`StackIndex`], but only slots that were
/// enabled when it was created are usable. Scopes are opened and closed with
/// [`State::push`]/[`State::pop`]; node code reads through [`State::get`]
/// and writes through [`State::get_writable`], which transparently installs
/// a copy-on-write top when the write happens in a scope deeper than the
/// current top's.
///
/// The bottom instance of each slot is created lazily from the enabled
/// class's factory and initialised with [`Element::init`]; it always lives
/// at depth 0, so a balanced push/pop sequence leaves every slot exactly as
/// it was.
pub struct State {
    stacks: Vec<ElementStack>,
    depth: usize,
}

impl State {
    /// Creates a state for the given enabled set.
    ///
    /// Slots present in `registry` but absent from `enabled` exist unusable;
    /// touching them is a contract violation and panics.
    #[must_use]
    pub fn new(registry: &ElementRegistry, enabled: &EnabledElements) -> Self {
        let stacks = (0..registry.stack_count())
            .map(|slot| {
                #[expect(clippy::cast_possible_truncation, reason = "slot count fits u16")]
                let index = StackIndex::from_raw(slot as u16);
                let factory = enabled.get(index).and_then(|key| registry.factory(key));
                ElementStack {
                    factory,
                    entries: Vec::new(),
                }
            })
            .collect();
        Self { stacks, depth: 0 }
    }

    /// Returns the number of currently open scopes.
    #[must_use]
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` if `index` was enabled when this state was created.
    #[must_use]
    pub fn is_enabled(&self, index: StackIndex) -> bool {
        self.stacks
            .get(index.index() as usize)
            .is_some_and(|s| s.factory.is_some())
    }

    /// Returns the current top element at `index`, creating and initialising
    /// the bottom instance on first access.
    ///
    /// # Panics
    ///
    /// Panics if `index` was not enabled for this state.
    pub fn get(&mut self, index: StackIndex) -> &dyn Element {
        let stack = self.stack_mut(index);
        Self::ensure_bottom(stack, index);
        match stack.entries.last() {
            Some(entry) => entry.element.as_ref(),
            None => unreachable!("bottom entry was just ensured"),
        }
    }

    /// [`State::get`], downcast to the concrete element type.
    pub fn get_as<E: Element>(&mut self, index: StackIndex) -> Option<&E> {
        self.get(index).as_any().downcast_ref()
    }

    /// Returns a writable top element at `index` for the current scope.
    ///
    /// If the current top belongs to a shallower scope, it is cloned, the
    /// clone's [`Element::push`] hook runs, and the clone becomes the top
    /// until the scope closes. `writer` is recorded on the entry for cache
    /// validation layers.
    ///
    /// # Panics
    ///
    /// Panics if `index` was not enabled for this state.
    pub fn get_writable(
        &mut self,
        index: StackIndex,
        writer: Option<NodeUid>,
    ) -> &mut dyn Element {
        let depth = self.depth;
        let stack = self.stack_mut(index);
        Self::ensure_bottom(stack, index);
        let top_depth = stack.entries.last().map_or(0, |e| e.depth);
        debug_assert!(top_depth <= depth, "element stack deeper than the state");
        if top_depth < depth {
            let mut element = match stack.entries.last() {
                Some(entry) => entry.element.clone_boxed(),
                None => unreachable!("bottom entry was just ensured"),
            };
            element.push();
            stack.entries.push(StackEntry {
                depth,
                writer,
                element,
            });
        }
        match stack.entries.last_mut() {
            Some(entry) => {
                entry.writer = writer;
                entry.element.as_mut()
            }
            None => unreachable!("bottom entry was just ensured"),
        }
    }

    /// [`State::get_writable`], downcast to the concrete element type.
    pub fn get_writable_as<E: Element>(
        &mut self,
        index: StackIndex,
        writer: Option<NodeUid>,
    ) -> Option<&mut E> {
        self.get_writable(index, writer).as_any_mut().downcast_mut()
    }

    /// Returns the uid recorded by the last write to the top entry at
    /// `index`, if any.
    #[must_use]
    pub fn writer(&self, index: StackIndex) -> Option<NodeUid> {
        self.stacks
            .get(index.index() as usize)
            .and_then(|s| s.entries.last())
            .and_then(|e| e.writer)
    }

    /// Opens a scope.
    pub fn push(&mut self) {
        self.depth += 1;
    }

    /// Closes the current scope, discarding every element pushed in it and
    /// running the [`Element::pop`] hook on each newly exposed top.
    ///
    /// Popping with no open scope is a debug assertion; release builds
    /// saturate at depth 0.
    pub fn pop(&mut self) {
        debug_assert!(self.depth > 0, "state scope underflow");
        if self.depth == 0 {
            return;
        }
        for stack in &mut self.stacks {
            let at_depth = stack
                .entries
                .last()
                .is_some_and(|entry| entry.depth == self.depth);
            if at_depth {
                let popped = match stack.entries.pop() {
                    Some(entry) => entry,
                    None => unreachable!("entry existence was just checked"),
                };
                if let Some(top) = stack.entries.last_mut() {
                    top.element.pop(popped.element.as_ref());
                }
            }
        }
        self.depth -= 1;
    }

    fn stack_mut(&mut self, index: StackIndex) -> &mut ElementStack {
        let slot = index.index() as usize;
        match self.stacks.get_mut(slot) {
            Some(stack) if stack.factory.is_some() || !stack.entries.is_empty() => stack,
            _ => panic!("element slot {index:?} was not enabled for this traversal"),
        }
    }

    fn ensure_bottom(stack: &mut ElementStack, index: StackIndex) {
        if !stack.entries.is_empty() {
            return;
        }
        let Some(factory) = stack.factory else {
            panic!("element slot {index:?} was not enabled for this traversal");
        };
        let mut element = factory();
        element.init();
        stack.entries.push(StackEntry {
            depth: 0,
            writer: None,
            element,
        });
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("depth", &self.depth)
            .field("slots", &self.stacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec;
    use canopy_types::{TypeKey, TypeRegistry};
    use core::cell::RefCell;

    /// Test element: an integer plus a shared log of pop-hook invocations.
    #[derive(Clone, Default)]
    struct Counter {
        value: i32,
        pops: Option<Rc<RefCell<Vec<i32>>>>,
    }

    impl Element for Counter {
        fn init(&mut self) {
            self.value = 0;
        }
        fn pop(&mut self, popped: &dyn Element) {
            if let (Some(log), Some(popped)) =
                (&self.pops, popped.as_any().downcast_ref::<Self>())
            {
                log.borrow_mut().push(popped.value);
            }
        }
        fn matches(&self, other: &dyn Element) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|o| o.value == self.value)
        }
        fn copy_match_info(&self) -> Box<dyn Element> {
            Box::new(Self {
                value: self.value,
                pops: None,
            })
        }
        fn clone_boxed(&self) -> Box<dyn Element> {
            Box::new(self.clone())
        }
        fn as_any(&self) -> &dyn core::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
            self
        }
    }

    fn make() -> Box<dyn Element> {
        Box::new(Counter::default())
    }

    fn fixture() -> (State, StackIndex) {
        let mut types = TypeRegistry::new();
        let mut registry = ElementRegistry::new();
        let base = types.create(TypeKey::BAD, "element");
        let class = registry.register(&mut types, base, "counter", make);
        let mut enabled = EnabledElements::new();
        enabled.enable(&types, class.type_key(), class.stack_index());
        (State::new(&registry, &enabled), class.stack_index())
    }

    #[test]
    fn lazy_bottom_initialisation() {
        let (mut state, index) = fixture();
        assert!(state.is_enabled(index));
        assert_eq!(state.get_as::<Counter>(index).unwrap().value, 0);
    }

    #[test]
    fn writes_at_depth_zero_stick() {
        let (mut state, index) = fixture();
        state.get_writable_as::<Counter>(index, None).unwrap().value = 5;
        assert_eq!(state.get_as::<Counter>(index).unwrap().value, 5);
    }

    #[test]
    fn scoped_writes_are_undone_by_pop() {
        let (mut state, index) = fixture();
        state.get_writable_as::<Counter>(index, None).unwrap().value = 1;

        state.push();
        assert_eq!(state.depth(), 1);
        state.get_writable_as::<Counter>(index, None).unwrap().value = 2;
        assert_eq!(state.get_as::<Counter>(index).unwrap().value, 2);

        state.push();
        state.get_writable_as::<Counter>(index, None).unwrap().value = 3;
        state.pop();
        assert_eq!(state.get_as::<Counter>(index).unwrap().value, 2);

        state.pop();
        assert_eq!(state.get_as::<Counter>(index).unwrap().value, 1);
        assert_eq!(state.depth(), 0);
    }

    #[test]
    fn copy_on_write_happens_once_per_scope() {
        let (mut state, index) = fixture();
        state.push();
        let first = state.get_writable_as::<Counter>(index, None).unwrap() as *const Counter;
        let second = state.get_writable_as::<Counter>(index, None).unwrap() as *const Counter;
        assert_eq!(first, second);
        state.pop();
    }

    #[test]
    fn pop_hook_sees_the_discarded_element() {
        let (mut state, index) = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));
        state
            .get_writable_as::<Counter>(index, None)
            .unwrap()
            .pops = Some(log.clone());

        state.push();
        state.get_writable_as::<Counter>(index, None).unwrap().value = 7;
        state.pop();

        assert_eq!(*log.borrow(), vec![7]);
    }

    #[test]
    fn unwritten_scopes_pop_for_free() {
        let (mut state, index) = fixture();
        state.get_writable_as::<Counter>(index, None).unwrap().value = 4;
        state.push();
        state.push();
        state.pop();
        state.pop();
        assert_eq!(state.get_as::<Counter>(index).unwrap().value, 4);
    }

    #[test]
    fn writer_uids_are_recorded() {
        use canopy_scene::{Node, NodeClassFlags, NodeClassRegistry};

        let mut types = TypeRegistry::new();
        let mut classes = NodeClassRegistry::new();
        let class = classes.register(&mut types, TypeKey::BAD, "node", NodeClassFlags::default());
        let node = Node::new(class);

        let (mut state, index) = fixture();
        assert!(state.writer(index).is_none());
        state.get_writable(index, Some(node.uid()));
        assert_eq!(state.writer(index), Some(node.uid()));

        // A deeper scope gets its own writer slot; popping restores the old one.
        state.push();
        state.get_writable(index, None);
        assert!(state.writer(index).is_none());
        state.pop();
        assert_eq!(state.writer(index), Some(node.uid()));
    }

    #[test]
    #[should_panic(expected = "not enabled")]
    fn disabled_slot_panics() {
        let mut types = TypeRegistry::new();
        let mut registry = ElementRegistry::new();
        let base = types.create(TypeKey::BAD, "element");
        let class = registry.register(&mut types, base, "counter", make);
        // Empty enabled set: the slot exists but is unusable.
        let mut state = State::new(&registry, &EnabledElements::new());
        let _ = state.get(class.stack_index());
    }
}
