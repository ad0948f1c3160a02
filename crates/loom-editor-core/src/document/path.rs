//! Path addressing.
//!
//! A path is the list of sibling indices from the root to a node. It is the
//! only way to name a node: after any structural mutation a stored path must
//! be re-derived (or transformed) before it is used again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sibling-index address of a node. Ordering is lexicographic, which is
/// document order with ancestors sorting before their descendants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Index at the given depth, if the path is that deep.
    pub fn at(&self, depth: usize) -> Option<usize> {
        self.0.get(depth).copied()
    }

    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            return None;
        }
        Some(Path(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// Path of the next sibling slot (which may not exist yet).
    pub fn next(&self) -> Option<Path> {
        let last = self.last()?;
        let mut indices = self.0.clone();
        *indices.last_mut()? = last + 1;
        Some(Path(indices))
    }

    pub fn previous(&self) -> Option<Path> {
        let last = self.last()?;
        if last == 0 {
            return None;
        }
        let mut indices = self.0.clone();
        *indices.last_mut()? = last - 1;
        Some(Path(indices))
    }

    pub fn has_previous(&self) -> bool {
        self.last().is_some_and(|last| last > 0)
    }

    /// Top-level block index this path lives under.
    pub fn top(&self) -> Option<usize> {
        self.0.first().copied()
    }

    /// Strict prefix check.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Prefix check that includes equality.
    pub fn contains(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn is_sibling_of(&self, other: &Path) -> bool {
        self.0.len() == other.0.len() && self.parent() == other.parent() && self != other
    }

    /// Path truncated to `depth` indices.
    pub fn truncated(&self, depth: usize) -> Path {
        Path(self.0[..depth.min(self.0.len())].to_vec())
    }

    /// Rebase this path from under `from` to under `to`.
    ///
    /// Returns `None` when `from` is not a prefix of this path.
    pub fn rebase(&self, from: &Path, to: &Path) -> Option<Path> {
        if !from.contains(self) {
            return None;
        }
        let mut indices = to.0.clone();
        indices.extend_from_slice(&self.0[from.0.len()..]);
        Some(Path(indices))
    }

    /// Re-derive this path after the node at `removed` was taken out.
    ///
    /// Returns `None` when this path pointed at the removed node or inside it.
    pub fn transform_remove(&self, removed: &Path) -> Option<Path> {
        if removed.contains(self) {
            return None;
        }
        let depth = removed.len() - 1;
        let mut indices = self.0.clone();
        if self.0.len() > depth
            && self.0[..depth] == removed.0[..depth]
            && self.0[depth] > removed.0[depth]
        {
            indices[depth] -= 1;
        }
        Some(Path(indices))
    }

    /// Re-derive this path after a node was inserted at `inserted`.
    pub fn transform_insert(&self, inserted: &Path) -> Path {
        let Some(depth) = inserted.len().checked_sub(1) else {
            return self.clone();
        };
        let mut indices = self.0.clone();
        if self.0.len() > depth
            && self.0[..depth] == inserted.0[..depth]
            && self.0[depth] >= inserted.0[depth]
        {
            indices[depth] += 1;
        }
        Path(indices)
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
