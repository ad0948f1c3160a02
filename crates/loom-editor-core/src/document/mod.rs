//! The document tree.
//!
//! `Document` owns the top-level blocks. Nodes have no identity beyond their
//! current [`Path`]; every lookup is a fresh walk from the root. All mutation
//! goes through the structural primitives in [`transforms`], composed inside
//! [`Document::transact`] so a failed composition never leaves a half-applied
//! tree behind.

mod node;
mod normalize;
mod path;
pub mod transforms;
pub mod traverse;

pub use node::{Align, CodeKey, Element, ElementKind, Leaf, Marks, Node};
pub use path::Path;
pub use traverse::InsertTarget;

use crate::error::DocumentError;
use crate::types::{Point, Selection};

pub type Result<T, E = DocumentError> = std::result::Result<T, E>;

/// The document root and its top-level blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    children: Vec<Node>,
    next_key: u64,
}

impl Default for Document {
    /// A document with one empty paragraph.
    fn default() -> Self {
        Self {
            children: vec![Element::empty_paragraph().into()],
            next_key: 1,
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from top-level nodes, normalizing the shape and
    /// assigning code identities.
    pub fn from_nodes(children: Vec<Node>) -> Self {
        let mut doc = Self {
            children,
            next_key: 1,
        };
        doc.normalize();
        let mut next_key = doc.next_key;
        for child in &mut doc.children {
            assign_keys(child, &mut next_key);
        }
        doc.next_key = next_key;
        doc
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Concatenated text of the whole document (no separators).
    pub fn text(&self) -> String {
        self.children.iter().map(Node::text).collect()
    }

    /// Number of nodes at `parent`, where the root is the empty path.
    pub fn child_count(&self, parent: &Path) -> Option<usize> {
        if parent.is_root() {
            return Some(self.children.len());
        }
        self.element(parent).map(|el| el.children.len())
    }

    pub fn node(&self, path: &Path) -> Option<&Node> {
        let (first, rest) = path.as_slice().split_first()?;
        let mut node = self.children.get(*first)?;
        for idx in rest {
            node = node.as_element()?.children.get(*idx)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &Path) -> Option<&mut Node> {
        let (first, rest) = path.as_slice().split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for idx in rest {
            node = node.as_element_mut()?.children.get_mut(*idx)?;
        }
        Some(node)
    }

    pub fn element(&self, path: &Path) -> Option<&Element> {
        self.node(path).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, path: &Path) -> Option<&mut Element> {
        self.node_mut(path).and_then(Node::as_element_mut)
    }

    pub fn leaf(&self, path: &Path) -> Option<&Leaf> {
        self.node(path).and_then(Node::as_leaf)
    }

    pub fn leaf_mut(&mut self, path: &Path) -> Option<&mut Leaf> {
        self.node_mut(path).and_then(Node::as_leaf_mut)
    }

    pub fn kind(&self, path: &Path) -> Option<&ElementKind> {
        self.element(path).map(|el| &el.kind)
    }

    /// Element at `path` or an `InvalidPath`/`NotAnElement` error.
    pub fn expect_element(&self, path: &Path) -> Result<&Element> {
        match self.node(path) {
            Some(Node::Element(el)) => Ok(el),
            Some(Node::Leaf(_)) => Err(DocumentError::NotAnElement(path.clone())),
            None => Err(DocumentError::InvalidPath(path.clone())),
        }
    }

    pub fn expect_leaf(&self, path: &Path) -> Result<&Leaf> {
        match self.node(path) {
            Some(Node::Leaf(leaf)) => Ok(leaf),
            Some(Node::Element(_)) => Err(DocumentError::NotALeaf(path.clone())),
            None => Err(DocumentError::InvalidPath(path.clone())),
        }
    }

    /// Does `point` resolve to a leaf, with the offset inside its text?
    pub fn is_valid_point(&self, point: &Point) -> bool {
        self.leaf(&point.path)
            .is_some_and(|leaf| point.offset <= leaf.len())
    }

    pub fn is_valid_selection(&self, selection: &Selection) -> bool {
        self.is_valid_point(&selection.anchor) && self.is_valid_point(&selection.focus)
    }

    /// Clamp a point onto the tree: offsets are clamped to the leaf length and
    /// dangling paths fall back to the nearest leaf before them.
    pub fn clamp_point(&self, point: &Point) -> Point {
        if let Some(leaf) = self.leaf(&point.path) {
            return Point::new(point.path.clone(), point.offset.min(leaf.len()));
        }
        let leaves = self.leaf_paths();
        let fallback = leaves
            .iter()
            .rev()
            .find(|path| **path < point.path)
            .or_else(|| leaves.first());
        match fallback {
            Some(path) => {
                let len = self.leaf(path).map(Leaf::len).unwrap_or(0);
                Point::new(path.clone(), len)
            }
            None => Point::new([0, 0], 0),
        }
    }

    pub fn clamp_selection(&self, selection: &Selection) -> Selection {
        Selection::new(
            self.clamp_point(&selection.anchor),
            self.clamp_point(&selection.focus),
        )
    }

    /// Run `f` against a draft copy. On success the draft is normalized and
    /// committed; on error the document is left exactly as it was.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let mut draft = self.clone();
        let out = f(&mut draft)?;
        draft.normalize();
        *self = draft;
        Ok(out)
    }

    /// Hand out a fresh code identity.
    pub(crate) fn fresh_key(&mut self) -> CodeKey {
        let key = CodeKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Assign fresh code identities to every code block under `node`.
    pub(crate) fn adopt(&mut self, node: &mut Node) {
        let mut next_key = self.next_key;
        assign_keys_always(node, &mut next_key);
        self.next_key = next_key;
    }
}

fn assign_keys(node: &mut Node, next_key: &mut u64) {
    if let Node::Element(el) = node {
        if let ElementKind::Code { key, .. } = &mut el.kind {
            if !key.is_assigned() {
                *key = CodeKey(*next_key);
                *next_key += 1;
            }
        }
        for child in &mut el.children {
            assign_keys(child, next_key);
        }
    }
}

fn assign_keys_always(node: &mut Node, next_key: &mut u64) {
    if let Node::Element(el) = node {
        if let ElementKind::Code { key, .. } = &mut el.kind {
            *key = CodeKey(*next_key);
            *next_key += 1;
        }
        for child in &mut el.children {
            assign_keys_always(child, next_key);
        }
    }
}
