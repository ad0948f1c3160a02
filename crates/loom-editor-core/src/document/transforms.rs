//! Structural primitives.
//!
//! Every mutation of the tree is a composition of these: insert, remove,
//! move, merge, split and property setters, plus the text and range helpers
//! built on top of them. None of them normalize; compose them inside
//! [`Document::transact`] so the result is repaired and committed atomically.

use super::node::{Element, ElementKind, Leaf, Marks, Node};
use super::path::Path;
use super::{Document, Result};
use crate::error::DocumentError;
use crate::text_helpers::{insert_at_char, remove_char_range, split_at_char};
use crate::types::Point;

impl Document {
    fn siblings_mut(&mut self, parent: &Path) -> Result<&mut Vec<Node>> {
        if parent.is_root() {
            return Ok(self.children_mut());
        }
        match self.node_mut(parent) {
            Some(Node::Element(el)) => Ok(&mut el.children),
            Some(Node::Leaf(_)) => Err(DocumentError::NotAnElement(parent.clone())),
            None => Err(DocumentError::InvalidPath(parent.clone())),
        }
    }

    /// Insert `node` so that it ends up at `path`. Code blocks inside the
    /// inserted subtree receive fresh identities.
    pub fn insert_node(&mut self, path: &Path, mut node: Node) -> Result<()> {
        let parent = path.parent().ok_or_else(|| DocumentError::InvalidPath(path.clone()))?;
        let index = path.last().ok_or_else(|| DocumentError::InvalidPath(path.clone()))?;
        self.adopt(&mut node);
        let siblings = self.siblings_mut(&parent)?;
        if index > siblings.len() {
            return Err(DocumentError::InvalidPath(path.clone()));
        }
        siblings.insert(index, node);
        Ok(())
    }

    /// Insert `nodes` consecutively starting at `path`. Returns the path one
    /// past the last inserted node.
    pub fn insert_nodes(&mut self, path: &Path, nodes: Vec<Node>) -> Result<Path> {
        let mut at = path.clone();
        for node in nodes {
            self.insert_node(&at, node)?;
            at = at.next().ok_or_else(|| DocumentError::InvalidPath(at.clone()))?;
        }
        Ok(at)
    }

    pub fn remove_node(&mut self, path: &Path) -> Result<Node> {
        let parent = path.parent().ok_or_else(|| DocumentError::InvalidPath(path.clone()))?;
        let index = path.last().ok_or_else(|| DocumentError::InvalidPath(path.clone()))?;
        let siblings = self.siblings_mut(&parent)?;
        if index >= siblings.len() {
            return Err(DocumentError::InvalidPath(path.clone()));
        }
        Ok(siblings.remove(index))
    }

    /// Move the node at `from` so that it ends up at `to`. `to` is the final
    /// path, resolved after the node has been taken out. Code identities
    /// travel with the node.
    pub fn move_node(&mut self, from: &Path, to: &Path) -> Result<()> {
        if from.is_ancestor_of(to) {
            return Err(DocumentError::unsupported("move a node into itself", from));
        }
        let node = self.remove_node(from)?;
        let parent = to.parent().ok_or_else(|| DocumentError::InvalidPath(to.clone()))?;
        let index = to.last().ok_or_else(|| DocumentError::InvalidPath(to.clone()))?;
        let siblings = self.siblings_mut(&parent)?;
        if index > siblings.len() {
            return Err(DocumentError::InvalidPath(to.clone()));
        }
        siblings.insert(index, node);
        Ok(())
    }

    /// Merge the node at `path` into its previous sibling. Leaves concatenate
    /// their text (the previous leaf keeps its marks); elements append their
    /// children. Returns the merge position: the previous leaf's char length
    /// or the previous element's child count before the merge.
    pub fn merge_node(&mut self, path: &Path) -> Result<usize> {
        let prev = path
            .previous()
            .ok_or_else(|| DocumentError::unsupported("merge without a previous sibling", path))?;
        let node = self.remove_node(path)?;
        match (self.node_mut(&prev), node) {
            (Some(Node::Leaf(target)), Node::Leaf(leaf)) => {
                let at = target.len();
                target.text.push_str(&leaf.text);
                Ok(at)
            }
            (Some(Node::Element(target)), Node::Element(el)) => {
                let at = target.children.len();
                target.children.extend(el.children);
                Ok(at)
            }
            (Some(_), _) => Err(DocumentError::unsupported("merge a leaf with an element", path)),
            (None, _) => Err(DocumentError::InvalidPath(prev)),
        }
    }

    /// Split the node at `path`. Leaves split at a char offset, elements at a
    /// child index; the second half becomes the next sibling. A split code
    /// block hands its second half a fresh identity.
    pub fn split_node(&mut self, path: &Path, position: usize) -> Result<()> {
        let next = path.next().ok_or_else(|| DocumentError::InvalidPath(path.clone()))?;
        let second: Node = match self.node_mut(path) {
            Some(Node::Leaf(leaf)) => {
                let (head, tail) = split_at_char(&leaf.text, position);
                let tail = Leaf::with_marks(tail, leaf.marks.clone());
                leaf.text = head.to_string();
                tail.into()
            }
            Some(Node::Element(el)) => {
                if el.kind.is_void() {
                    return Err(DocumentError::unsupported("split a void element", path));
                }
                let at = position.min(el.children.len());
                let mut tail = el.children.split_off(at);
                if el.kind.is_text_block() {
                    if el.children.is_empty() {
                        el.children.push(Leaf::empty().into());
                    }
                    if tail.is_empty() {
                        tail.push(Leaf::empty().into());
                    }
                }
                Element::new(el.kind.clone(), tail).into()
            }
            None => return Err(DocumentError::InvalidPath(path.clone())),
        };
        // insert_node adopts, so a split code block gets a new key.
        self.insert_node(&next, second)
    }

    /// Replace the kind of the element at `path`, returning the old kind.
    pub fn set_kind(&mut self, path: &Path, kind: ElementKind) -> Result<ElementKind> {
        let el = self
            .element_mut(path)
            .ok_or_else(|| DocumentError::NotAnElement(path.clone()))?;
        Ok(std::mem::replace(&mut el.kind, kind))
    }

    pub fn set_marks(&mut self, path: &Path, marks: Marks) -> Result<Marks> {
        let leaf = self
            .leaf_mut(path)
            .ok_or_else(|| DocumentError::NotALeaf(path.clone()))?;
        Ok(std::mem::replace(&mut leaf.marks, marks))
    }

    /// Insert `text` at `point` and return the point after it.
    pub fn insert_text(&mut self, point: &Point, text: &str) -> Result<Point> {
        if self.is_void_leaf(&point.path) {
            return Err(DocumentError::unsupported("insert text into a void", &point.path));
        }
        let leaf = self
            .leaf_mut(&point.path)
            .ok_or_else(|| DocumentError::NotALeaf(point.path.clone()))?;
        let offset = point.offset.min(leaf.len());
        insert_at_char(&mut leaf.text, offset, text);
        Ok(Point::new(
            point.path.clone(),
            offset + crate::text_helpers::char_len(text),
        ))
    }

    /// Remove chars `start..end` from the leaf at `path`.
    pub fn delete_text(&mut self, path: &Path, start: usize, end: usize) -> Result<()> {
        let leaf = self
            .leaf_mut(path)
            .ok_or_else(|| DocumentError::NotALeaf(path.clone()))?;
        remove_char_range(&mut leaf.text, start, end);
        Ok(())
    }

    /// Is the leaf at `path` the filler leaf of a void element?
    pub fn is_void_leaf(&self, path: &Path) -> bool {
        path.parent()
            .and_then(|parent| self.kind(&parent))
            .is_some_and(ElementKind::is_void)
    }

    /// Split from the leaf at `point` up to and including the ancestor at
    /// `top`. Returns the path of the second half of `top`.
    pub fn split_at_point(&mut self, point: &Point, top: &Path) -> Result<Path> {
        if !top.contains(&point.path) || top.is_root() {
            return Err(DocumentError::unsupported("split outside its ancestor", top));
        }
        self.split_node(&point.path, point.offset)?;
        let mut position = point.path.last().map_or(0, |i| i + 1);
        let mut current = point.path.parent();
        while let Some(path) = current {
            if path.len() < top.len() {
                break;
            }
            self.split_node(&path, position)?;
            position = path.last().map_or(0, |i| i + 1);
            current = path.parent();
        }
        top.next().ok_or_else(|| DocumentError::InvalidPath(top.clone()))
    }

    /// Delete everything between two points, merging the text blocks at both
    /// edges when they differ. Returns the collapsed point where the range
    /// started.
    pub fn delete_range(&mut self, start: &Point, end: &Point) -> Result<Point> {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.expect_leaf(&start.path)?;
        self.expect_leaf(&end.path)?;
        if start.path == end.path {
            self.delete_text(&start.path, start.offset, end.offset)?;
            return Ok(start.clone());
        }

        let sp = start.path.as_slice();
        let ep = end.path.as_slice();
        let depth = sp.iter().zip(ep).take_while(|(a, b)| a == b).count();
        if depth >= sp.len() || depth >= ep.len() {
            return Err(DocumentError::unsupported("delete a range over a leaf", &start.path));
        }

        let start_len = self.expect_leaf(&start.path)?.len();
        self.delete_text(&end.path, 0, end.offset)?;
        self.delete_text(&start.path, start.offset, start_len)?;

        // Start branch: drop everything after the start, deepest level first.
        for level in (depth + 1..sp.len()).rev() {
            let parent = Path::from(&sp[..level]);
            let keep = sp[level] + 1;
            self.siblings_mut(&parent)?.truncate(keep);
        }
        // Common ancestor: drop the siblings strictly between both branches.
        let common = Path::from(&sp[..depth]);
        let siblings = self.siblings_mut(&common)?;
        siblings.drain(sp[depth] + 1..ep[depth]);
        // End branch: drop everything before the end.
        let mut end_path = common.child(sp[depth] + 1);
        for &idx in &ep[depth + 1..] {
            self.siblings_mut(&end_path)?.drain(..idx);
            end_path = end_path.child(0);
        }

        let start_block = self.text_block(&start.path);
        let end_block = self.text_block(&end_path);
        if let (Some(sb), Some(eb)) = (start_block, end_block) {
            let mergeable = |doc: &Document, p: &Path| {
                doc.kind(p)
                    .is_some_and(|k| !matches!(k, ElementKind::TableCell { .. }))
            };
            if sb != eb && mergeable(self, &sb) && mergeable(self, &eb) {
                let moved = match self.remove_node(&eb)? {
                    Node::Element(el) => el.children,
                    Node::Leaf(_) => return Err(DocumentError::NotAnElement(eb)),
                };
                self.element_mut(&sb)
                    .ok_or_else(|| DocumentError::NotAnElement(sb.clone()))?
                    .children
                    .extend(moved);
                self.prune_empty_ancestors(&eb)?;
            }
        }
        Ok(start.clone())
    }

    /// After removing the node at `removed`, remove ancestors left without
    /// children.
    pub(crate) fn prune_empty_ancestors(&mut self, removed: &Path) -> Result<()> {
        let mut current = removed.parent();
        while let Some(path) = current {
            if path.is_root() {
                break;
            }
            let empty = self
                .element(&path)
                .is_some_and(|el| el.children.is_empty());
            if !empty {
                break;
            }
            self.remove_node(&path)?;
            current = path.parent();
        }
        Ok(())
    }

    /// Replace every top-level block with a single empty paragraph.
    pub fn clear(&mut self) -> Point {
        *self.children_mut() = vec![Element::empty_paragraph().into()];
        Point::new([0, 0], 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::CodeKey;

    fn para(text: &str) -> Node {
        Element::text_paragraph(text).into()
    }

    #[test]
    fn test_insert_and_remove() {
        let mut doc = Document::from_nodes(vec![para("a"), para("c")]);
        doc.insert_node(&Path::from([1]), para("b")).unwrap();
        assert_eq!(doc.text(), "abc");
        let removed = doc.remove_node(&Path::from([0])).unwrap();
        assert_eq!(removed.text(), "a");
        assert!(doc.insert_node(&Path::from([5]), para("x")).is_err());
    }

    #[test]
    fn test_move_node_final_path() {
        let mut doc = Document::from_nodes(vec![para("a"), para("b"), para("c")]);
        doc.move_node(&Path::from([0]), &Path::from([2])).unwrap();
        assert_eq!(doc.text(), "bca");
        assert!(doc.move_node(&Path::from([0]), &Path::from([0, 0])).is_err());
    }

    #[test]
    fn test_merge_and_split_leaf() {
        let mut doc = Document::from_nodes(vec![Element::paragraph(vec![
            Leaf::new("foo").into(),
            Leaf::with_marks("bar", Marks::bold()).into(),
        ])
        .into()]);
        assert_eq!(doc.merge_node(&Path::from([0, 1])).unwrap(), 3);
        assert_eq!(doc.leaf(&Path::from([0, 0])), Some(&Leaf::new("foobar")));

        doc.split_node(&Path::from([0, 0]), 2).unwrap();
        assert_eq!(doc.leaf(&Path::from([0, 1])).map(|l| l.text.as_str()), Some("obar"));
    }

    #[test]
    fn test_split_text_block_at_point() {
        let mut doc = Document::from_nodes(vec![para("hello")]);
        let second = doc
            .split_at_point(&Point::new([0, 0], 2), &Path::from([0]))
            .unwrap();
        assert_eq!(second, Path::from([1]));
        assert_eq!(doc.element(&Path::from([0])).unwrap().text(), "he");
        assert_eq!(doc.element(&Path::from([1])).unwrap().text(), "llo");
    }

    #[test]
    fn test_split_code_gets_fresh_key() {
        let mut doc = Document::from_nodes(vec![Element::code(None, "a\nb").into()]);
        doc.split_node(&Path::from([0]), 1).unwrap();
        let key = |p: [usize; 1]| match doc.kind(&Path::from(p)) {
            Some(ElementKind::Code { key, .. }) => *key,
            _ => CodeKey::UNASSIGNED,
        };
        assert_ne!(key([0]), key([1]));
        assert!(key([1]).is_assigned());
    }

    #[test]
    fn test_delete_range_merges_blocks() {
        let mut doc = Document::from_nodes(vec![para("hello"), para("middle"), para("world")]);
        let at = doc
            .delete_range(&Point::new([2, 0], 2), &Point::new([0, 0], 3))
            .unwrap();
        doc.normalize();
        assert_eq!(at, Point::new([0, 0], 3));
        assert_eq!(doc.children().len(), 1);
        assert_eq!(doc.text(), "helrld");
    }

    #[test]
    fn test_delete_range_out_of_list() {
        let list = Element::list(
            false,
            vec![
                Element::list_item(None, vec![para("one")]).into(),
                Element::list_item(None, vec![para("two")]).into(),
            ],
        );
        let mut doc = Document::from_nodes(vec![para("intro"), list.into()]);
        doc.delete_range(&Point::new([0, 0], 2), &Point::new([1, 0, 0, 0], 1))
            .unwrap();
        doc.normalize();
        doc.validate().unwrap();
        assert_eq!(doc.element(&Path::from([0])).unwrap().text(), "inne");
        // The emptied first item is gone, the second survives.
        assert_eq!(doc.element(&Path::from([1])).unwrap().children.len(), 1);
        assert_eq!(doc.text(), "innetwo");
    }

    #[test]
    fn test_insert_text_rejects_void() {
        let mut doc = Document::from_nodes(vec![Element::void(ElementKind::HorizontalRule).into()]);
        assert!(doc.insert_text(&Point::new([0, 0], 0), "x").is_err());
    }
}
