//! Tree walks over paths.
//!
//! Every helper here re-derives its answer from the current tree; nothing is
//! cached between calls.

use super::node::{ElementKind, Node};
use super::path::Path;
use super::Document;
use crate::types::Point;

/// Where a new void node should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertTarget {
    /// Insert a card-wrapped block at this path.
    Block(Path),
    /// Insert an inline void at this path inside a text block.
    Inline(Path),
}

impl Document {
    /// Paths of every leaf in document order.
    pub fn leaf_paths(&self) -> Vec<Path> {
        let mut out = Vec::new();
        collect_leaves(self.children(), &Path::root(), &mut out);
        out
    }

    /// First leaf at or under `path`.
    pub fn first_leaf(&self, path: &Path) -> Option<Path> {
        let mut path = path.clone();
        loop {
            match self.node(&path)? {
                Node::Leaf(_) => return Some(path),
                Node::Element(el) if el.children.is_empty() => return None,
                Node::Element(_) => path = path.child(0),
            }
        }
    }

    /// Last leaf at or under `path`.
    pub fn last_leaf(&self, path: &Path) -> Option<Path> {
        let mut path = path.clone();
        loop {
            match self.node(&path)? {
                Node::Leaf(_) => return Some(path),
                Node::Element(el) => {
                    let last = el.children.len().checked_sub(1)?;
                    path = path.child(last);
                }
            }
        }
    }

    pub fn start_point(&self, path: &Path) -> Option<Point> {
        self.first_leaf(path).map(|leaf| Point::new(leaf, 0))
    }

    pub fn end_point(&self, path: &Path) -> Option<Point> {
        let leaf = self.last_leaf(path)?;
        let len = self.leaf(&leaf)?.len();
        Some(Point::new(leaf, len))
    }

    /// Point at the very start of the document.
    pub fn document_start(&self) -> Option<Point> {
        self.start_point(&Path::from([0]))
    }

    /// Point at the very end of the document.
    pub fn document_end(&self) -> Option<Point> {
        let last = self.children().len().checked_sub(1)?;
        self.end_point(&Path::from([last]))
    }

    /// Next leaf in document order, skipping horizontal rules.
    pub fn next_leaf(&self, path: &Path) -> Option<Path> {
        let leaves = self.leaf_paths();
        let pos = leaves.iter().position(|p| p == path)?;
        leaves[pos + 1..]
            .iter()
            .find(|p| !self.is_inside_rule(p))
            .cloned()
    }

    /// Previous leaf in document order, skipping horizontal rules.
    pub fn previous_leaf(&self, path: &Path) -> Option<Path> {
        let leaves = self.leaf_paths();
        let pos = leaves.iter().position(|p| p == path)?;
        leaves[..pos]
            .iter()
            .rev()
            .find(|p| !self.is_inside_rule(p))
            .cloned()
    }

    fn is_inside_rule(&self, leaf: &Path) -> bool {
        leaf.parent()
            .and_then(|parent| self.kind(&parent).cloned())
            .is_some_and(|kind| kind == ElementKind::HorizontalRule)
    }

    /// Next sibling of `path`, or of its nearest ancestor that has one.
    /// Horizontal rules are transparent and never returned.
    pub fn next_path(&self, path: &Path) -> Option<Path> {
        let mut current = path.clone();
        loop {
            let mut sibling = current.next()?;
            while let Some(node) = self.node(&sibling) {
                if node.kind() != Some(&ElementKind::HorizontalRule) {
                    return Some(sibling);
                }
                sibling = sibling.next()?;
            }
            current = current.parent()?;
            if current.is_root() {
                return None;
            }
        }
    }

    /// Previous sibling of `path`, or of its nearest ancestor that has one.
    /// Horizontal rules are transparent and never returned.
    pub fn previous_path(&self, path: &Path) -> Option<Path> {
        let mut current = path.clone();
        loop {
            let mut sibling = current.previous();
            while let Some(candidate) = sibling {
                match self.node(&candidate) {
                    Some(node) if node.kind() == Some(&ElementKind::HorizontalRule) => {
                        sibling = candidate.previous();
                    }
                    Some(_) => return Some(candidate),
                    None => break,
                }
            }
            current = current.parent()?;
            if current.is_root() {
                return None;
            }
        }
    }

    /// Nearest ancestor-or-self element whose kind satisfies `pred`.
    pub fn closest(&self, path: &Path, pred: impl Fn(&ElementKind) -> bool) -> Option<Path> {
        let mut current = Some(path.clone());
        while let Some(p) = current {
            if p.is_root() {
                return None;
            }
            if self.kind(&p).is_some_and(&pred) {
                return Some(p);
            }
            current = p.parent();
        }
        None
    }

    /// Nearest enclosing text block (paragraph, heading, cell or code line).
    pub fn text_block(&self, path: &Path) -> Option<Path> {
        self.closest(path, ElementKind::is_text_block)
    }

    /// Lowest element enclosing `path` (the leaf's parent for leaf paths).
    pub fn lowest_element(&self, path: &Path) -> Option<Path> {
        match self.node(path)? {
            Node::Element(_) => Some(path.clone()),
            Node::Leaf(_) => path.parent().filter(|p| !p.is_root()),
        }
    }

    /// Where a new media or attachment node belongs for a cursor at `path`.
    ///
    /// After the current heading or non-empty paragraph, in place of an empty
    /// paragraph, inline at the end of a table cell, after a code block or
    /// after a card the cursor sits on. Rows hold only cells, so media
    /// for a cell stays inside it.
    pub fn find_media_insert_path(&self, path: &Path) -> Option<InsertTarget> {
        if let Some(cell) = self.closest(path, |k| matches!(k, ElementKind::TableCell { .. })) {
            let len = self.element(&cell)?.children.len();
            return Some(InsertTarget::Inline(cell.child(len)));
        }
        if let Some(block) = self.closest(path, |k| {
            matches!(k, ElementKind::Code { .. } | ElementKind::Card)
        }) {
            return block.next().map(InsertTarget::Block);
        }
        let block = self.text_block(path)?;
        let el = self.element(&block)?;
        match el.kind {
            ElementKind::Paragraph if el.is_blank() => Some(InsertTarget::Block(block)),
            _ => block.next().map(InsertTarget::Block),
        }
    }
}

fn collect_leaves(children: &[Node], parent: &Path, out: &mut Vec<Path>) {
    for (idx, child) in children.iter().enumerate() {
        let path = parent.child(idx);
        match child {
            Node::Leaf(_) => out.push(path),
            Node::Element(el) => collect_leaves(&el.children, &path, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;

    fn doc() -> Document {
        Document::from_nodes(vec![
            Element::heading(1, "Title").into(),
            Element::void(ElementKind::HorizontalRule).into(),
            Element::text_paragraph("body").into(),
            Element::new(
                ElementKind::Table { aligns: vec![] },
                vec![
                    Element::new(ElementKind::TableRow, vec![Element::table_cell(true, "h").into()])
                        .into(),
                ],
            )
            .into(),
            Element::empty_paragraph().into(),
        ])
    }

    #[test]
    fn test_leaf_navigation_skips_rules() {
        let doc = doc();
        assert_eq!(doc.next_leaf(&Path::from([0, 0])), Some(Path::from([2, 0])));
        assert_eq!(doc.previous_leaf(&Path::from([2, 0])), Some(Path::from([0, 0])));
        assert_eq!(doc.previous_leaf(&Path::from([0, 0])), None);
    }

    #[test]
    fn test_sibling_or_ancestor_navigation() {
        let doc = doc();
        assert_eq!(doc.next_path(&Path::from([0])), Some(Path::from([2])));
        assert_eq!(doc.previous_path(&Path::from([2])), Some(Path::from([0])));
        // Last cell of the table climbs out to the following block.
        assert_eq!(doc.next_path(&Path::from([3, 0, 0])), Some(Path::from([4])));
        assert_eq!(doc.next_path(&Path::from([4])), None);
        assert_eq!(doc.previous_path(&Path::from([0])), None);
    }

    #[test]
    fn test_closest_and_points() {
        let doc = doc();
        let cell = doc.closest(&Path::from([3, 0, 0, 0]), |k| {
            matches!(k, ElementKind::TableCell { .. })
        });
        assert_eq!(cell, Some(Path::from([3, 0, 0])));
        assert_eq!(doc.end_point(&Path::from([0])), Some(Point::new([0, 0], 5)));
        assert_eq!(doc.document_end(), Some(Point::new([4, 0], 0)));
    }

    #[test]
    fn test_media_insert_targets() {
        let doc = doc();
        assert_eq!(
            doc.find_media_insert_path(&Path::from([0, 0])),
            Some(InsertTarget::Block(Path::from([1])))
        );
        assert_eq!(
            doc.find_media_insert_path(&Path::from([2, 0])),
            Some(InsertTarget::Block(Path::from([3])))
        );
        assert_eq!(
            doc.find_media_insert_path(&Path::from([4, 0])),
            Some(InsertTarget::Block(Path::from([4])))
        );
        assert_eq!(
            doc.find_media_insert_path(&Path::from([3, 0, 0, 0])),
            Some(InsertTarget::Inline(Path::from([3, 0, 0, 1])))
        );
    }

    #[test]
    fn test_media_in_cell_keeps_row_arity() {
        let mut doc = doc();
        let Some(InsertTarget::Inline(at)) = doc.find_media_insert_path(&Path::from([3, 0, 0, 0])) else {
            panic!("cell should take media inline");
        };
        let media = Element::void(ElementKind::Media {
            url: "a.png".into(),
            alt: String::new(),
            title: None,
            height: None,
        });
        doc.insert_node(&at, media.into()).unwrap();
        doc.normalize();
        doc.validate().unwrap();
        assert_eq!(doc.element(&Path::from([3, 0])).unwrap().children.len(), 1);
        assert_eq!(doc.kind(&Path::from([3, 0, 0, 1])).map(ElementKind::name), Some("media"));
    }
}
