//! Generic fallbacks for keys no structural handler claimed.
//!
//! These are the tree-level equivalents of a text area's default behaviour:
//! delete one character or join with the previous block, split the current
//! block, insert typed text.

use super::backspace::spans_document;
use super::{BreakKind, HandlerOutcome, break_out_of_list, caret_in, run_handler, select_card, select_start};
use crate::document::{Document, Element, ElementKind, Node, Path, Result};
use crate::error::DocumentError;
use crate::text_helpers::char_len;
use crate::types::{Point, Selection};

pub fn delete_backward(doc: &mut Document, selection: &Selection) -> HandlerOutcome {
    run_handler(doc, "delete_backward", |d| {
        if !selection.is_collapsed() {
            return delete_selection(d, selection).map(|p| Some(Selection::collapsed(p)));
        }
        if !d.is_valid_point(&selection.focus) {
            return Ok(None);
        }
        backward_char(d, &selection.focus).map(Some)
    })
}

pub fn insert_break(doc: &mut Document, selection: &Selection, kind: BreakKind) -> HandlerOutcome {
    run_handler(doc, "insert_break", |d| {
        let point = delete_selection(d, selection)?;
        if !d.is_valid_point(&point) {
            return Ok(None);
        }
        break_at(d, &point, kind).map(Some)
    })
}

pub fn insert_text(doc: &mut Document, selection: &Selection, text: &str) -> HandlerOutcome {
    run_handler(doc, "insert_text", |d| {
        let point = delete_selection(d, selection)?;
        if !d.is_valid_point(&point) {
            return Ok(None);
        }
        text_at(d, &point, text).map(Some)
    })
}

/// Delete a range selection (the whole document collapses to one empty
/// paragraph) and return the normalized caret. Collapsed selections are
/// returned as they are.
pub(crate) fn delete_selection(doc: &mut Document, selection: &Selection) -> Result<Point> {
    if selection.is_collapsed() {
        return Ok(selection.focus.clone());
    }
    let point = if spans_document(doc, selection) {
        doc.clear()
    } else {
        doc.delete_range(&selection.anchor, &selection.focus)?
    };
    doc.normalize();
    Ok(doc.clamp_point(&point))
}

fn backward_char(doc: &mut Document, point: &Point) -> Result<Selection> {
    if doc.is_void_leaf(&point.path) {
        let end = doc
            .previous_leaf(&point.path)
            .and_then(|prev| doc.end_point(&prev));
        return Ok(Selection::collapsed(end.unwrap_or_else(|| point.clone())));
    }
    if point.offset > 0 {
        doc.delete_text(&point.path, point.offset - 1, point.offset)?;
        return Ok(Selection::caret(point.path.clone(), point.offset - 1));
    }

    // A placeholder is stepped over as a unit.
    let mut current = point.path.clone();
    if let Some(parent) = current.parent() {
        if matches!(doc.kind(&parent), Some(ElementKind::Placeholder { .. })) {
            current = parent;
        }
    }
    while let Some(prev) = current.previous() {
        match doc.node(&prev) {
            Some(Node::Leaf(leaf)) if leaf.is_empty() => current = prev,
            Some(Node::Leaf(leaf)) => {
                let len = leaf.len();
                doc.delete_text(&prev, len - 1, len)?;
                return Ok(Selection::caret(prev, len - 1));
            }
            Some(Node::Element(_)) => {
                doc.remove_node(&prev)?;
                return Ok(Selection::caret(prev, 0));
            }
            None => break,
        }
    }
    join_backward(doc, point)
}

/// Backspace at the start of a text block.
fn join_backward(doc: &mut Document, point: &Point) -> Result<Selection> {
    let unchanged = Selection::collapsed(point.clone());
    let Some(block) = doc.text_block(&point.path) else {
        return Ok(unchanged);
    };
    let element = doc.expect_element(&block)?;
    let blank = element.is_blank();
    match element.kind {
        ElementKind::TableCell { .. } => Ok(unchanged),
        ElementKind::CodeLine => join_code_line(doc, &block, point),
        _ => {
            let Some(prev) = doc.previous_leaf(&point.path) else {
                return Ok(unchanged);
            };
            if doc.is_void_leaf(&prev) {
                if blank {
                    doc.remove_node(&block)?;
                }
                let card = prev.parent().and_then(|p| p.parent());
                return Ok(match card {
                    Some(card) if doc.kind(&card) == Some(&ElementKind::Card) => {
                        select_card(&card)
                    }
                    _ => Selection::caret(prev, 0),
                });
            }
            let prev_block = doc
                .text_block(&prev)
                .ok_or_else(|| DocumentError::InvalidPath(prev.clone()))?;
            let end = doc
                .end_point(&prev)
                .ok_or_else(|| DocumentError::NotALeaf(prev.clone()))?;
            let prev_element = doc.expect_element(&prev_block)?;

            if prev_element.kind.is_literal() {
                if blank {
                    doc.remove_node(&block)?;
                }
                return Ok(Selection::collapsed(end));
            }
            if prev_element.kind == ElementKind::Paragraph && prev_element.is_blank() {
                doc.remove_node(&prev_block)?;
                let moved = point
                    .path
                    .transform_remove(&prev_block)
                    .unwrap_or_else(|| point.path.clone());
                return Ok(Selection::caret(moved, 0));
            }

            let moved = match doc.remove_node(&block)? {
                Node::Element(el) => el.children,
                Node::Leaf(_) => return Err(DocumentError::NotAnElement(block)),
            };
            doc.element_mut(&prev_block)
                .ok_or_else(|| DocumentError::NotAnElement(prev_block.clone()))?
                .children
                .extend(moved);
            doc.prune_empty_ancestors(&block)?;
            Ok(Selection::collapsed(end))
        }
    }
}

fn join_code_line(doc: &mut Document, line: &Path, point: &Point) -> Result<Selection> {
    let code = line
        .parent()
        .ok_or_else(|| DocumentError::InvalidPath(line.clone()))?;
    let Some(prev) = line.previous() else {
        // First line: an empty code block turns back into a paragraph.
        if doc.element(&code).is_some_and(Element::is_blank) {
            doc.set_kind(&code, ElementKind::Paragraph)?;
            return Ok(Selection::caret(code.child(0), 0));
        }
        return Ok(Selection::collapsed(point.clone()));
    };
    let text = doc.expect_element(line)?.text();
    let prev_len = char_len(&doc.expect_element(&prev)?.text());
    doc.remove_node(line)?;
    let leaf = prev.child(0);
    doc.insert_text(&Point::new(leaf.clone(), prev_len), &text)?;
    Ok(Selection::caret(leaf, prev_len))
}

/// Insert an empty paragraph beside the block-level void holding `leaf`:
/// before a card when the leaf is its leading sentinel, after the void
/// otherwise. Returns the new paragraph's path, or `None` when `leaf` is not
/// inside a block-level void.
pub(crate) fn paragraph_beside_void(doc: &mut Document, leaf: &Path) -> Result<Option<Path>> {
    let Some(parent) = leaf.parent() else {
        return Ok(None);
    };
    let Some(kind) = doc.kind(&parent).cloned() else {
        return Ok(None);
    };
    let block = match &kind {
        ElementKind::HorizontalRule => parent,
        k if k.is_void() => match parent.parent() {
            Some(card) if doc.kind(&card) == Some(&ElementKind::Card) => card,
            _ => return Ok(None),
        },
        _ => return Ok(None),
    };
    let at = if kind == ElementKind::CardBefore {
        block
    } else {
        block
            .next()
            .ok_or_else(|| DocumentError::InvalidPath(block.clone()))?
    };
    doc.insert_node(&at, Element::empty_paragraph().into())?;
    Ok(Some(at))
}

/// Move a point off an inline void or out of a placeholder onto the leaf
/// that follows it.
fn step_out_of_inline(doc: &Document, point: &Point) -> Point {
    if let Some(parent) = point.path.parent() {
        let inline = doc
            .kind(&parent)
            .is_some_and(|k| k.is_inline() && (k.is_void() || matches!(k, ElementKind::Placeholder { .. })));
        if inline {
            if let Some(next) = parent.next() {
                return Point::new(next, 0);
            }
        }
    }
    point.clone()
}

/// Split the block at `point` (or put a line break there).
pub(crate) fn break_at(doc: &mut Document, point: &Point, kind: BreakKind) -> Result<Selection> {
    if let Some(paragraph) = paragraph_beside_void(doc, &point.path)? {
        return Ok(caret_in(&paragraph));
    }
    let point = step_out_of_inline(doc, point);
    let block = doc
        .text_block(&point.path)
        .ok_or_else(|| DocumentError::InvalidPath(point.path.clone()))?;
    let element = doc.expect_element(&block)?;
    let blank = element.is_blank();

    match element.kind {
        ElementKind::TableCell { .. } => return insert_line_break(doc, &point),
        ElementKind::CodeLine => {
            let second = doc.split_at_point(&point, &block)?;
            return Ok(Selection::caret(second.child(0), 0));
        }
        _ if kind == BreakKind::Line => return insert_line_break(doc, &point),
        _ => {}
    }

    let parent = block.parent().unwrap_or_else(Path::root);
    match doc.kind(&parent).cloned() {
        Some(ElementKind::ListItem { checked }) if doc.kind(&block) == Some(&ElementKind::Paragraph) => {
            if doc.element(&parent).is_some_and(Element::is_blank) {
                let paragraph = break_out_of_list(doc, &parent, true)?;
                return Ok(caret_in(&paragraph));
            }
            let second = doc.split_at_point(&point, &parent)?;
            if checked.is_some() {
                doc.set_kind(&second, ElementKind::ListItem { checked: Some(false) })?;
            }
            return select_start(doc, &second)
                .ok_or_else(|| DocumentError::InvalidPath(second.clone()));
        }
        Some(ElementKind::Blockquote)
            if blank && doc.child_count(&parent) == Some(block.last().unwrap_or(0) + 1) =>
        {
            // Enter on a trailing empty line leaves the quote.
            doc.remove_node(&block)?;
            let after = parent
                .next()
                .ok_or_else(|| DocumentError::InvalidPath(parent.clone()))?;
            doc.insert_node(&after, Element::empty_paragraph().into())?;
            return Ok(caret_in(&after));
        }
        _ => {}
    }

    let second = doc.split_at_point(&point, &block)?;
    if doc.element(&second).is_some_and(Element::is_blank) {
        doc.set_kind(&second, ElementKind::Paragraph)?;
    }
    select_start(doc, &second).ok_or_else(|| DocumentError::InvalidPath(second.clone()))
}

/// Insert a `Break` at `point`, leaving the caret after it.
pub(crate) fn insert_line_break(doc: &mut Document, point: &Point) -> Result<Selection> {
    doc.split_node(&point.path, point.offset)?;
    let at = point
        .path
        .next()
        .ok_or_else(|| DocumentError::InvalidPath(point.path.clone()))?;
    doc.insert_node(&at, Element::void(ElementKind::Break).into())?;
    let after = at
        .next()
        .ok_or_else(|| DocumentError::InvalidPath(at.clone()))?;
    Ok(Selection::caret(after, 0))
}

/// A point text can be typed at: voids get a paragraph beside them, inline
/// voids hand over to the following leaf.
pub(crate) fn writable_point(doc: &mut Document, point: &Point) -> Result<Point> {
    if let Some(paragraph) = paragraph_beside_void(doc, &point.path)? {
        return Ok(Point::new(paragraph.child(0), 0));
    }
    let next = step_out_of_inline(doc, point);
    if doc.is_void_leaf(&next.path) {
        return Err(DocumentError::unsupported("type into a void", &next.path));
    }
    Ok(next)
}

/// Type `text` at `point`. Newlines inside code split code lines.
pub(crate) fn text_at(doc: &mut Document, point: &Point, text: &str) -> Result<Selection> {
    let mut at = writable_point(doc, point)?;
    let in_code = doc
        .text_block(&at.path)
        .and_then(|block| doc.kind(&block))
        == Some(&ElementKind::CodeLine);
    if !in_code || !text.contains('\n') {
        return doc.insert_text(&at, text).map(Selection::collapsed);
    }
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            let block = doc
                .text_block(&at.path)
                .ok_or_else(|| DocumentError::InvalidPath(at.path.clone()))?;
            let second = doc.split_at_point(&at, &block)?;
            at = Point::new(second.child(0), 0);
        }
        at = doc.insert_text(&at, line)?;
    }
    Ok(Selection::collapsed(at))
}
