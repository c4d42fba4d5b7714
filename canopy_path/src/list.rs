// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path lists and their normalisation.

use alloc::vec::Vec;
use core::fmt;
use core::ops::Index;

use crate::path::Path;

/// A vector of [`Path`]s with the normalisation rules targeted traversal
/// relies on.
///
/// A list is *normalised* when it is sorted in traversal order, contains no
/// duplicates, and no path is a prefix of another. [`PathList::sort`]
/// followed by [`PathList::uniquify`] establishes this; both are idempotent.
/// Uniquify keeps the *shortest* of a prefix chain, since visiting everything
/// below a prefix subsumes visits to its extensions.
#[derive(Clone, Default)]
pub struct PathList {
    paths: Vec<Path>,
}

impl PathList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a path.
    pub fn append(&mut self, path: Path) {
        self.paths.push(path);
    }

    /// Returns the number of paths.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if the list holds no paths.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns the path at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index)
    }

    /// Iterates the paths in list order.
    pub fn iter(&self) -> core::slice::Iter<'_, Path> {
        self.paths.iter()
    }

    /// Keeps only the first `len` paths.
    pub fn truncate(&mut self, len: usize) {
        self.paths.truncate(len);
    }

    /// Removes all paths.
    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /// Returns the position of the first path equal to `path`.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<usize> {
        self.paths.iter().position(|p| p == path)
    }

    /// Sorts the list into traversal order (head identity, then child
    /// indices lexicographically).
    pub fn sort(&mut self) {
        self.paths.sort();
    }

    /// On a sorted list, removes duplicates and any path that extends a kept
    /// predecessor, so that no remaining path is a prefix of another.
    pub fn uniquify(&mut self) {
        debug_assert!(
            self.paths.windows(2).all(|w| w[0] <= w[1]),
            "uniquify requires a sorted list"
        );
        let mut kept: Vec<Path> = Vec::with_capacity(self.paths.len());
        for path in self.paths.drain(..) {
            match kept.last() {
                Some(prev) if *prev == path || path.contains_path(prev) => {}
                _ => kept.push(path),
            }
        }
        self.paths = kept;
    }
}

impl Index<usize> for PathList {
    type Output = Path;

    fn index(&self, index: usize) -> &Path {
        &self.paths[index]
    }
}

impl<'a> IntoIterator for &'a PathList {
    type Item = &'a Path;
    type IntoIter = core::slice::Iter<'a, Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl FromIterator<Path> for PathList {
    fn from_iter<I: IntoIterator<Item = Path>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl Extend<Path> for PathList {
    fn extend<I: IntoIterator<Item = Path>>(&mut self, iter: I) {
        self.paths.extend(iter);
    }
}

impl fmt::Debug for PathList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.paths.iter()).finish()
    }
}
