//! Shape repair, validation and canonical form.
//!
//! `normalize` runs after every committed transaction and after parsing. It
//! never merges or drops leaves (paths handed back by handlers must survive
//! it); it only repairs shapes that break the tree invariants. `canonicalize`
//! is the stronger, lossy pass used to compare trees.

use super::node::{Align, CodeKey, Element, ElementKind, Leaf, Node};
use super::path::Path;
use super::{Document, Result};
use crate::error::DocumentError;

impl Document {
    /// Repair the tree so every structural invariant holds.
    pub fn normalize(&mut self) {
        let children = std::mem::take(self.children_mut());
        let mut blocks = normalize_blocks(children);
        if blocks.is_empty() {
            blocks.push(Element::empty_paragraph().into());
        }
        *self.children_mut() = blocks;
    }

    /// Check every structural invariant, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.children().is_empty() {
            return Err(DocumentError::invariant(&Path::root(), "document is empty"));
        }
        validate_blocks(self.children(), &Path::root())
    }

    /// Canonical form used for structural comparison: equal-mark leaves merged,
    /// empty leaves and insignificant empty paragraphs dropped, outer
    /// whitespace of text blocks trimmed and code identities cleared.
    /// Paragraphs holding only embeds compare as the cards markup reads them
    /// back as.
    pub fn canonicalize(&self) -> Document {
        let mut blocks = canonical_blocks(self.children());
        if blocks.is_empty() {
            blocks.push(Element::empty_paragraph().into());
        }
        let mut doc = Document::new();
        *doc.children_mut() = blocks;
        doc
    }
}

/// Normalize a sequence of nodes that sits in block context.
pub(crate) fn normalize_blocks(children: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut run: Vec<Node> = Vec::new();

    for child in children {
        match child {
            Node::Leaf(_) => run.push(child),
            Node::Element(el) if el.kind.is_inline() && !el.kind.is_card_payload() => {
                run.push(el.into())
            }
            Node::Element(el) => {
                flush_run(&mut run, &mut out);
                if let Some(block) = normalize_block(el) {
                    out.push(block);
                }
            }
        }
    }
    flush_run(&mut run, &mut out);
    out
}

fn flush_run(run: &mut Vec<Node>, out: &mut Vec<Node>) {
    if run.is_empty() {
        return;
    }
    let children = std::mem::take(run);
    if let Some(block) = normalize_block(Element::paragraph(children)) {
        out.push(block);
    }
}

fn normalize_block(mut el: Element) -> Option<Node> {
    if let ElementKind::Heading { level } = &mut el.kind {
        *level = (*level).clamp(1, 6);
    }
    match el.kind {
        ElementKind::Paragraph | ElementKind::Heading { .. } => {
            el.children = normalize_inline(el.children);
            Some(el.into())
        }
        // Text blocks that lost their structural parent read as paragraphs.
        ElementKind::TableCell { .. } | ElementKind::CodeLine => {
            el.kind = ElementKind::Paragraph;
            el.children = normalize_inline(el.children);
            Some(el.into())
        }
        ElementKind::List { .. } => {
            el.children = normalize_list_items(el.children);
            (!el.children.is_empty()).then(|| el.into())
        }
        ElementKind::ListItem { .. } => {
            let item = normalize_list_item(el);
            Some(Element::list(false, vec![item]).into())
        }
        ElementKind::Blockquote | ElementKind::FootnoteDefinition { .. } => {
            el.children = normalize_blocks(el.children);
            (!el.children.is_empty()).then(|| el.into())
        }
        ElementKind::Table { .. } => normalize_table(el).map(Node::from),
        ElementKind::TableRow => {
            normalize_table(Element::new(ElementKind::Table { aligns: Vec::new() }, vec![el.into()]))
                .map(Node::from)
        }
        ElementKind::Code { .. } => {
            el.children = normalize_code_lines(el.children);
            (!el.children.is_empty()).then(|| el.into())
        }
        ElementKind::HorizontalRule => Some(Element::void(el.kind).into()),
        ElementKind::Card => normalize_card(el).map(Node::from),
        ElementKind::Media { .. }
        | ElementKind::Attachment { .. }
        | ElementKind::Html { .. }
        | ElementKind::Plugin { .. } => Some(Element::card(Element::void(el.kind)).into()),
        ElementKind::Break | ElementKind::Placeholder { .. } => {
            normalize_block(Element::paragraph(vec![el.into()]))
        }
        ElementKind::CardBefore | ElementKind::CardAfter => None,
    }
}

fn normalize_list_items(children: Vec<Node>) -> Vec<Node> {
    let mut items = Vec::with_capacity(children.len());
    let mut stray: Vec<Node> = Vec::new();
    for child in children {
        match child {
            Node::Element(el) if matches!(el.kind, ElementKind::ListItem { .. }) => {
                if !stray.is_empty() {
                    let blocks = std::mem::take(&mut stray);
                    items.push(normalize_list_item(Element::list_item(None, blocks)));
                }
                items.push(normalize_list_item(el));
            }
            other => stray.push(other),
        }
    }
    if !stray.is_empty() {
        items.push(normalize_list_item(Element::list_item(None, stray)));
    }
    items
}

fn normalize_list_item(mut item: Element) -> Node {
    item.children = normalize_blocks(item.children);
    if item.children.is_empty() {
        item.children.push(Element::empty_paragraph().into());
    }
    item.into()
}

fn normalize_table(mut table: Element) -> Option<Element> {
    let mut rows: Vec<Element> = Vec::new();
    let mut stray_cells: Vec<Node> = Vec::new();
    for child in std::mem::take(&mut table.children) {
        match child {
            Node::Element(el) if el.kind == ElementKind::TableRow => {
                if !stray_cells.is_empty() {
                    rows.push(Element::new(ElementKind::TableRow, std::mem::take(&mut stray_cells)));
                }
                rows.push(el);
            }
            Node::Element(el) if matches!(el.kind, ElementKind::TableCell { .. }) => {
                stray_cells.push(el.into())
            }
            _ => {}
        }
    }
    if !stray_cells.is_empty() {
        rows.push(Element::new(ElementKind::TableRow, stray_cells));
    }

    let mut rows: Vec<Element> = rows
        .into_iter()
        .filter_map(|row| {
            let cells: Vec<Node> = row
                .children
                .into_iter()
                .filter_map(|cell| match cell {
                    Node::Element(el) if matches!(el.kind, ElementKind::TableCell { .. }) => {
                        Some(el)
                    }
                    Node::Element(el) if el.kind.is_text_block() => {
                        Some(Element::new(ElementKind::TableCell { header: false }, el.children))
                    }
                    Node::Leaf(leaf) => Some(Element::new(
                        ElementKind::TableCell { header: false },
                        vec![leaf.into()],
                    )),
                    _ => None,
                })
                .map(|mut cell| {
                    cell.children = normalize_inline(cell.children);
                    cell.into()
                })
                .collect();
            (!cells.is_empty()).then(|| Element::new(ElementKind::TableRow, cells))
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    // Rows share one column count; the header flag follows the row position.
    let columns = rows.iter().map(|r| r.children.len()).max().unwrap_or(1);
    for (row_idx, row) in rows.iter_mut().enumerate() {
        while row.children.len() < columns {
            row.children.push(Element::empty_cell(false).into());
        }
        for cell in row.children.iter_mut().filter_map(Node::as_element_mut) {
            cell.kind = ElementKind::TableCell {
                header: row_idx == 0,
            };
        }
    }
    if let ElementKind::Table { aligns } = &mut table.kind {
        aligns.resize(columns, Align::None);
    }
    table.children = rows.into_iter().map(Node::from).collect();
    Some(table)
}

fn normalize_code_lines(children: Vec<Node>) -> Vec<Node> {
    let mut lines = Vec::with_capacity(children.len());
    for child in children {
        let text = child.text();
        for line in text.split('\n') {
            lines.push(Element::code_line(line).into());
        }
    }
    lines
}

fn normalize_card(card: Element) -> Option<Element> {
    let payload = card
        .children
        .into_iter()
        .filter_map(|child| match child {
            Node::Element(el) => Some(el),
            Node::Leaf(_) => None,
        })
        .find(|el| el.kind.is_card_payload())?;
    Some(Element::card(Element::void(payload.kind)))
}

/// Normalize the children of a text block: leaves and inline elements only,
/// never empty, with a leaf on both sides of every inline element.
pub(crate) fn normalize_inline(children: Vec<Node>) -> Vec<Node> {
    let mut flat = Vec::with_capacity(children.len());
    flatten_inline(children, &mut flat);

    let mut out: Vec<Node> = Vec::with_capacity(flat.len() + 2);
    for node in flat {
        if !node.is_leaf() && !out.last().is_some_and(Node::is_leaf) {
            out.push(Leaf::empty().into());
        }
        out.push(node);
    }
    if !out.last().is_some_and(Node::is_leaf) {
        out.push(Leaf::empty().into());
    }
    out
}

fn flatten_inline(children: Vec<Node>, out: &mut Vec<Node>) {
    for child in children {
        match child {
            Node::Leaf(_) => out.push(child),
            Node::Element(el) => match el.kind {
                ElementKind::Break | ElementKind::Media { .. } | ElementKind::Attachment { .. } => {
                    out.push(Element::void(el.kind).into())
                }
                ElementKind::Placeholder { .. } => {
                    let mut leaves = Vec::new();
                    flatten_inline(el.children, &mut leaves);
                    let mut leaves: Vec<Node> = leaves.into_iter().filter(Node::is_leaf).collect();
                    if leaves.is_empty() {
                        leaves.push(Leaf::empty().into());
                    }
                    out.push(Element::new(el.kind, leaves).into());
                }
                ElementKind::Card => {
                    if let Some(payload) = el
                        .children
                        .into_iter()
                        .filter_map(|c| match c {
                            Node::Element(p) if p.kind.is_inline() => Some(p),
                            _ => None,
                        })
                        .next()
                    {
                        out.push(Element::void(payload.kind).into());
                    }
                }
                ElementKind::CardBefore
                | ElementKind::CardAfter
                | ElementKind::HorizontalRule
                | ElementKind::Html { .. }
                | ElementKind::Plugin { .. } => {}
                _ => flatten_inline(el.children, out),
            },
        }
    }
}

fn validate_blocks(children: &[Node], parent: &Path) -> Result<()> {
    for (idx, child) in children.iter().enumerate() {
        let path = parent.child(idx);
        match child {
            Node::Leaf(_) => {
                return Err(DocumentError::invariant(&path, "leaf in block context"));
            }
            Node::Element(el) if el.kind.is_inline() && !el.kind.is_card_payload() => {
                return Err(DocumentError::invariant(&path, "inline element in block context"));
            }
            Node::Element(el) => validate_element(el, &path)?,
        }
    }
    Ok(())
}

fn validate_element(el: &Element, path: &Path) -> Result<()> {
    if el.children.is_empty() {
        return Err(DocumentError::invariant(path, "element without children"));
    }
    if el.kind.is_void() {
        return match el.children.as_slice() {
            [Node::Leaf(leaf)] if leaf.is_empty() => Ok(()),
            _ => Err(DocumentError::invariant(path, "void element must hold one empty leaf")),
        };
    }
    let only = |pred: fn(&ElementKind) -> bool, what: &str| -> Result<()> {
        for (idx, child) in el.children.iter().enumerate() {
            let child_path = path.child(idx);
            match child {
                Node::Element(c) if pred(&c.kind) => validate_element(c, &child_path)?,
                _ => {
                    return Err(DocumentError::invariant(
                        &child_path,
                        format!("{} may only contain {what}", el.kind.name()),
                    ));
                }
            }
        }
        Ok(())
    };
    match &el.kind {
        ElementKind::List { .. } => only(|k| matches!(k, ElementKind::ListItem { .. }), "list items"),
        ElementKind::Table { .. } => only(|k| *k == ElementKind::TableRow, "rows"),
        ElementKind::TableRow => only(|k| matches!(k, ElementKind::TableCell { .. }), "cells"),
        ElementKind::Code { .. } => only(|k| *k == ElementKind::CodeLine, "code lines"),
        ElementKind::Card => match el.children.as_slice() {
            [Node::Element(before), Node::Element(payload), Node::Element(after)]
                if before.kind == ElementKind::CardBefore
                    && payload.kind.is_card_payload()
                    && after.kind == ElementKind::CardAfter =>
            {
                validate_element(before, &path.child(0))?;
                validate_element(payload, &path.child(1))?;
                validate_element(after, &path.child(2))
            }
            _ => Err(DocumentError::invariant(path, "malformed card")),
        },
        ElementKind::CodeLine => match el.children.as_slice() {
            [Node::Leaf(leaf)] if leaf.marks.is_empty() => Ok(()),
            _ => Err(DocumentError::invariant(path, "code line must hold one plain leaf")),
        },
        ElementKind::Placeholder { .. } => {
            if el.children.iter().all(Node::is_leaf) {
                Ok(())
            } else {
                Err(DocumentError::invariant(path, "placeholder may only contain leaves"))
            }
        }
        kind if kind.is_text_block() => validate_inline(&el.children, path),
        ElementKind::ListItem { .. }
        | ElementKind::Blockquote
        | ElementKind::FootnoteDefinition { .. } => validate_blocks(&el.children, path),
        _ => Ok(()),
    }
}

fn validate_inline(children: &[Node], parent: &Path) -> Result<()> {
    for (idx, child) in children.iter().enumerate() {
        if let Node::Element(el) = child {
            let path = parent.child(idx);
            if !el.kind.is_inline() {
                return Err(DocumentError::invariant(&path, "block element inside text block"));
            }
            validate_element(el, &path)?;
        }
    }
    Ok(())
}

fn canonical_blocks(children: &[Node]) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        let Node::Element(el) = child else { continue };
        if el.kind == ElementKind::Paragraph && el.is_blank() {
            continue;
        }
        if el.is_embeds_only() {
            for embed in el.children.iter().filter_map(Node::as_element) {
                out.push(Element::card(canonical_element(embed)).into());
            }
            continue;
        }
        out.push(canonical_element(el).into());
    }
    out
}

fn canonical_element(el: &Element) -> Element {
    let mut kind = el.kind.clone();
    if let ElementKind::Code { key, .. } = &mut kind {
        *key = CodeKey::UNASSIGNED;
    }
    let children = match &el.kind {
        k if k.is_void() => vec![Leaf::empty().into()],
        ElementKind::CodeLine => el.children.clone(),
        k if k.is_text_block() => canonical_inline(&el.children, true),
        ElementKind::Placeholder { .. } => canonical_inline(&el.children, false),
        ElementKind::ListItem { .. }
        | ElementKind::Blockquote
        | ElementKind::FootnoteDefinition { .. } => {
            let blocks = canonical_blocks(&el.children);
            if blocks.is_empty() {
                vec![Element::empty_paragraph().into()]
            } else {
                blocks
            }
        }
        _ => el
            .children
            .iter()
            .map(|c| match c {
                Node::Element(e) => canonical_element(e).into(),
                Node::Leaf(l) => l.clone().into(),
            })
            .collect(),
    };
    Element::new(kind, children)
}

fn canonical_inline(children: &[Node], trim: bool) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Leaf(leaf) => {
                if leaf.is_empty() {
                    continue;
                }
                if let Some(Node::Leaf(prev)) = out.last_mut() {
                    if prev.marks == leaf.marks {
                        prev.text.push_str(&leaf.text);
                        continue;
                    }
                }
                out.push(leaf.clone().into());
            }
            Node::Element(el) => out.push(canonical_element(el).into()),
        }
    }
    if trim {
        if let Some(Node::Leaf(first)) = out.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(Node::Leaf(last)) = out.last_mut() {
            last.text = last.text.trim_end().to_string();
        }
        out.retain(|n| n.as_leaf().is_none_or(|l| !l.is_empty()));
    }
    if out.is_empty() {
        out.push(Leaf::empty().into());
    }
    out
}
