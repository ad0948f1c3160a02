//! Backspace.

use super::{
    Caret, HandlerOutcome, break_out_of_list, caret_in, is_at_start, is_card, run_handler,
    select_card, select_start,
};
use crate::document::{Document, Element, ElementKind, Node, Path, Result};
use crate::error::DocumentError;
use crate::types::{Point, Selection};

/// Structural Backspace. Range selections are only claimed when they cover
/// the whole document; everything else unmatched is left to
/// [`super::defaults::delete_backward`].
pub fn backspace(doc: &mut Document, selection: &Selection) -> HandlerOutcome {
    if !selection.is_collapsed() {
        if spans_document(doc, selection) {
            return run_handler(doc, "backspace", |d| {
                Ok(Some(Selection::collapsed(d.clear())))
            });
        }
        return HandlerOutcome::NotHandled;
    }
    let Some(caret) = Caret::resolve(doc, selection) else {
        return HandlerOutcome::NotHandled;
    };
    run_handler(doc, "backspace", |d| collapsed(d, &caret))
}

/// Does the selection run from the first to the last position of the
/// document?
pub(crate) fn spans_document(doc: &Document, selection: &Selection) -> bool {
    doc.document_start().as_ref() == Some(selection.start())
        && doc.document_end().as_ref() == Some(selection.end())
}

fn collapsed(doc: &mut Document, caret: &Caret) -> Result<Option<Selection>> {
    let point = &caret.point;
    let lowest = &caret.lowest;

    if matches!(caret.kind, ElementKind::Heading { .. })
        && doc.element(lowest).is_some_and(Element::is_blank)
    {
        doc.set_kind(lowest, ElementKind::Paragraph)?;
        return Ok(Some(Selection::collapsed(point.clone())));
    }

    let kind = &caret.kind;
    if kind.is_card_payload()
        || *kind == ElementKind::CardAfter
        || (kind.is_inline() && kind.is_void())
    {
        return remove_void(doc, lowest).map(Some);
    }

    let Some(block) = doc.text_block(&point.path) else {
        return Ok(None);
    };
    let Some(block_kind) = doc.kind(&block).cloned() else {
        return Ok(None);
    };
    let parent = block.parent().unwrap_or_else(Path::root);
    let parent_kind = doc.kind(&parent).cloned();

    if block_kind == ElementKind::Paragraph
        && matches!(parent_kind, Some(ElementKind::ListItem { .. }))
    {
        if !doc.element(&parent).is_some_and(Element::is_blank) {
            return Ok(None);
        }
        let paragraph = break_out_of_list(doc, &parent, true)?;
        return Ok(Some(caret_in(&paragraph)));
    }

    let at_start = is_at_start(doc, &block, point);
    if matches!(block_kind, ElementKind::TableCell { .. }) && at_start && !block.has_previous() {
        // Never leave a table through its first cell.
        return Ok(Some(Selection::collapsed(point.clone())));
    }

    if point.offset == 0 {
        if let Some(prev) = point.path.previous() {
            if doc.kind(&prev) == Some(&ElementKind::Break) {
                doc.remove_node(&prev)?;
                return Ok(Some(Selection::caret(prev, 0)));
            }
        }
    }

    if !at_start || block_kind != ElementKind::Paragraph {
        return Ok(None);
    }
    let blank = doc.element(&block).is_some_and(Element::is_blank);

    if let Some(prev) = block.previous() {
        if let Some(selection) = merge_into_literal(doc, &block, &prev)? {
            return Ok(Some(selection));
        }
        if doc.node(&prev).is_some_and(Node::is_void_block) && is_card(doc, &prev) {
            if blank {
                doc.remove_node(&block)?;
            }
            return Ok(Some(select_card(&prev)));
        }
    }

    if parent_kind == Some(ElementKind::Blockquote) && doc.previous_path(&block).is_none() {
        let count = doc.child_count(&parent).unwrap_or(0);
        let mut paragraph = doc.remove_node(&block)?;
        if let Some(el) = paragraph.as_element_mut() {
            el.kind = ElementKind::Paragraph;
        }
        if count == 1 {
            doc.remove_node(&parent)?;
        }
        doc.insert_node(&parent, paragraph)?;
        return Ok(select_start(doc, &parent));
    }

    if parent.is_root() && block.last() == Some(0) && blank {
        let next_is_content = block
            .next()
            .and_then(|next| doc.node(&next))
            .is_some_and(|node| node.kind() != Some(&ElementKind::HorizontalRule));
        if next_is_content {
            doc.remove_node(&block)?;
            return Ok(select_start(doc, &block));
        }
    }

    Ok(None)
}

/// Remove the void holding the caret. A card is replaced by an empty
/// paragraph; an inline void just disappears, leaving the caret at the end of
/// the text before it.
fn remove_void(doc: &mut Document, void: &Path) -> Result<Selection> {
    let parent = void
        .parent()
        .ok_or_else(|| DocumentError::InvalidPath(void.clone()))?;
    if is_card(doc, &parent) {
        doc.remove_node(&parent)?;
        doc.insert_node(&parent, Element::empty_paragraph().into())?;
        return Ok(caret_in(&parent));
    }
    let before = void
        .previous()
        .and_then(|prev| doc.leaf(&prev).map(|leaf| Point::new(prev, leaf.len())));
    doc.remove_node(void)?;
    Ok(Selection::collapsed(
        before.unwrap_or_else(|| Point::new(void.clone(), 0)),
    ))
}

/// Pull the paragraph at `block` into a previous table or code block whose
/// last line is empty.
fn merge_into_literal(doc: &mut Document, block: &Path, prev: &Path) -> Result<Option<Selection>> {
    let target = match doc.element(prev) {
        Some(el) if matches!(el.kind, ElementKind::Code { .. }) => {
            el.children.len().checked_sub(1).map(|last| prev.child(last))
        }
        Some(el) if matches!(el.kind, ElementKind::Table { .. }) => {
            el.children.len().checked_sub(1).and_then(|last_row| {
                let row = prev.child(last_row);
                let cells = doc.child_count(&row)?;
                cells.checked_sub(1).map(|last| row.child(last))
            })
        }
        _ => None,
    };
    let Some(target) = target else {
        return Ok(None);
    };
    if !doc.element(&target).is_some_and(Element::is_blank) {
        return Ok(None);
    }

    let moved = match doc.remove_node(block)? {
        Node::Element(el) => el,
        Node::Leaf(_) => return Err(DocumentError::NotAnElement(block.clone())),
    };
    if doc.kind(&target) == Some(&ElementKind::CodeLine) {
        // The text lands on fresh lines below the empty one.
        let first = target
            .next()
            .ok_or_else(|| DocumentError::InvalidPath(target.clone()))?;
        let mut at = first.clone();
        for line in moved.text().split('\n') {
            doc.insert_node(&at, Element::code_line(line).into())?;
            at = at
                .next()
                .ok_or_else(|| DocumentError::InvalidPath(at.clone()))?;
        }
        return Ok(Some(Selection::caret(first.child(0), 0)));
    }
    let cell = doc
        .element_mut(&target)
        .ok_or_else(|| DocumentError::NotAnElement(target.clone()))?;
    cell.children = moved.children;
    Ok(Some(Selection::caret(target.child(0), 0)))
}
