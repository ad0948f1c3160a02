//! The private structured clipboard fragment.
//!
//! A fragment is a JSON array of block nodes plus a format version. Code
//! identities are not serialized; pasted code blocks get fresh ones.

use serde::{Deserialize, Serialize};

use crate::document::{Document, Element, Node, Path};
use crate::error::PasteError;
use crate::text_helpers::{char_len, split_at_char};
use crate::types::{Point, Selection};

pub const FRAGMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub version: u32,
    pub nodes: Vec<Node>,
}

impl Fragment {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            version: FRAGMENT_VERSION,
            nodes,
        }
    }

    /// Copy of the selected part of `doc`.
    pub fn from_selection(doc: &Document, selection: &Selection) -> Self {
        Self::new(slice(doc, selection))
    }

    pub fn to_json(&self) -> Result<String, PasteError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PasteError> {
        let fragment: Fragment = serde_json::from_str(json)?;
        if fragment.version > FRAGMENT_VERSION {
            return Err(PasteError::FragmentVersion(fragment.version));
        }
        Ok(fragment)
    }
}

/// The selected range of `doc` as normalized block nodes. Containers cut by
/// the range keep their kind with only the selected part of their content.
pub fn slice(doc: &Document, selection: &Selection) -> Vec<Node> {
    if selection.is_collapsed() || !doc.is_valid_selection(selection) {
        return Vec::new();
    }
    let range = (selection.start().clone(), selection.end().clone());
    let nodes = slice_children(doc.children(), &Path::root(), &range);
    Document::from_nodes(nodes).into_children()
}

fn slice_children(children: &[Node], parent: &Path, range: &(Point, Point)) -> Vec<Node> {
    let (start, end) = range;
    let mut out = Vec::new();
    for (idx, child) in children.iter().enumerate() {
        let path = parent.child(idx);
        let holds_start = path.contains(&start.path);
        let holds_end = path.contains(&end.path);
        let inside = path > start.path && path < end.path;
        if !(holds_start || holds_end || inside) {
            continue;
        }
        match child {
            Node::Leaf(leaf) => {
                let len = leaf.len();
                let from = if holds_start { start.offset.min(len) } else { 0 };
                let to = if holds_end { end.offset.min(len) } else { len };
                let (_, tail) = split_at_char(&leaf.text, from);
                let (text, _) = split_at_char(tail, to.saturating_sub(from));
                let mut cut = leaf.clone();
                cut.text = text.to_string();
                out.push(cut.into());
            }
            Node::Element(el) if el.kind.is_void() || !(holds_start || holds_end) => {
                out.push(child.clone())
            }
            Node::Element(el) => {
                let inner = slice_children(&el.children, &path, range);
                if !inner.is_empty() {
                    out.push(Element::new(el.kind.clone(), inner).into());
                }
            }
        }
    }
    out
}

/// Plain text of a run of blocks, one line per text block.
pub fn plain_text(nodes: &[Node]) -> String {
    let mut lines = Vec::new();
    collect_lines(nodes, &mut lines);
    lines.join("\n")
}

fn collect_lines(nodes: &[Node], lines: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Element(el) if el.kind.is_text_block() => lines.push(el.text()),
            Node::Element(el) => collect_lines(&el.children, lines),
            Node::Leaf(leaf) if char_len(&leaf.text) > 0 => lines.push(leaf.text.clone()),
            Node::Leaf(_) => {}
        }
    }
}
