// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enabled-element sets.

use alloc::vec::Vec;
use core::fmt;

use canopy_types::{TypeKey, TypeRegistry};

use crate::element::StackIndex;

/// The set of element classes enabled for traversal, one slot per
/// [`StackIndex`].
///
/// Action classes each carry one of these; the *effective* set of an action
/// is the union over its ancestor classes, built with
/// [`EnabledElements::merge_from`]. When two related element classes land on
/// the same slot the more derived one wins: a specialisation supersedes its
/// base.
#[derive(Clone, Default)]
pub struct EnabledElements {
    slots: Vec<Option<TypeKey>>,
}

impl EnabledElements {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables element type `key` at `index`.
    ///
    /// # Panics
    ///
    /// Panics if an unrelated element type already occupies the slot; related
    /// types resolve to the more derived one.
    pub fn enable(&mut self, types: &TypeRegistry, key: TypeKey, index: StackIndex) {
        let slot = index.index() as usize;
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, None);
        }
        match self.slots[slot] {
            None => self.slots[slot] = Some(key),
            Some(existing) => {
                if types.is_derived_from(key, existing) {
                    self.slots[slot] = Some(key);
                } else {
                    assert!(
                        types.is_derived_from(existing, key),
                        "unrelated element types '{}' and '{}' share stack slot {index:?}",
                        types.name(existing),
                        types.name(key)
                    );
                }
            }
        }
    }

    /// Unions `other` into this set, resolving shared slots to the more
    /// derived type.
    pub fn merge_from(&mut self, types: &TypeRegistry, other: &Self) {
        for (index, key) in other.iter() {
            self.enable(types, key, index);
        }
    }

    /// Returns the element type enabled at `index`, if any.
    #[must_use]
    pub fn get(&self, index: StackIndex) -> Option<TypeKey> {
        self.slots.get(index.index() as usize).copied().flatten()
    }

    /// Returns `true` if no slots are enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Iterates enabled `(slot, element type)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (StackIndex, TypeKey)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, key)| {
            #[expect(clippy::cast_possible_truncation, reason = "slots never exceed u16")]
            let index = StackIndex::from_raw(i as u16);
            key.map(|key| (index, key))
        })
    }
}

impl fmt::Debug for EnabledElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(index, key)| (index.index(), key)))
            .finish()
    }
}
