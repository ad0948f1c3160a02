//! Cursor and selection types.
//!
//! A point is a (leaf path, char offset) pair. A selection is an anchor/focus
//! pair of points; it is only meaningful while both paths still resolve to
//! leaves, so callers re-validate after every mutation.

use serde::{Deserialize, Serialize};

use crate::document::Path;

/// A position inside a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Path to a leaf.
    pub path: Path,
    /// Char offset in the leaf text (NOT a byte offset).
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.path
            .cmp(&other.path)
            .then(self.offset.cmp(&other.offset))
    }
}

/// Selection with anchor and focus points.
///
/// The anchor is where the selection started, the focus is where the cursor is
/// now. They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// Collapsed selection at `offset` in the leaf at `path`.
    pub fn caret(path: impl Into<Path>, offset: usize) -> Self {
        Self::collapsed(Point::new(path, offset))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> &Point {
        std::cmp::min(&self.anchor, &self.focus)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> &Point {
        std::cmp::max(&self.anchor, &self.focus)
    }

    /// Check if the selection is backwards (focus before anchor).
    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }
}
