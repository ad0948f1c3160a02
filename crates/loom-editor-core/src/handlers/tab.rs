//! Tab and Shift+Tab: cell navigation and list nesting.

use super::{Caret, HandlerOutcome, run_handler, select_end};
use crate::document::{Document, Element, ElementKind, Path, Result};
use crate::error::DocumentError;
use crate::types::{Point, Selection};

/// Tab (`outdent == false`) or Shift+Tab. Table cells take priority over an
/// enclosing list item.
pub fn tab(doc: &mut Document, selection: &Selection, outdent: bool) -> HandlerOutcome {
    let Some(caret) = Caret::resolve(doc, selection) else {
        return HandlerOutcome::NotHandled;
    };
    let point = caret.point;
    run_handler(doc, "tab", |d| {
        if let Some(cell) = d.closest(&point.path, |k| matches!(k, ElementKind::TableCell { .. })) {
            return Ok(Some(move_between_cells(d, &cell, outdent).unwrap_or_else(|| {
                Selection::collapsed(point.clone())
            })));
        }
        let Some(item) = d.closest(&point.path, |k| matches!(k, ElementKind::ListItem { .. })) else {
            return Ok(None);
        };
        let moved = if outdent {
            outdent_item(d, &item)?
        } else {
            indent_item(d, &item)?
        };
        // Top-level outdent and first-item indent are swallowed.
        let Some(moved) = moved else {
            return Ok(Some(Selection::collapsed(point.clone())));
        };
        let path = point
            .path
            .rebase(&item, &moved)
            .ok_or_else(|| DocumentError::InvalidPath(point.path.clone()))?;
        Ok(Some(Selection::collapsed(Point::new(path, point.offset))))
    })
}

/// Caret at the end of the next (or previous) cell, wrapping across rows.
/// `None` past the first or last cell.
fn move_between_cells(doc: &Document, cell: &Path, backward: bool) -> Option<Selection> {
    let row = cell.parent()?;
    let target = if backward {
        match cell.previous() {
            Some(prev) => prev,
            None => {
                let prev_row = row.previous()?;
                let count = doc.child_count(&prev_row)?;
                prev_row.child(count.checked_sub(1)?)
            }
        }
    } else {
        let next = cell.next()?;
        if doc.node(&next).is_some() {
            next
        } else {
            let next_row = row.next()?;
            doc.element(&next_row)?;
            next_row.child(0)
        }
    };
    select_end(doc, &target)
}

/// Nest `item` under its previous sibling. Returns the item's new path.
fn indent_item(doc: &mut Document, item: &Path) -> Result<Option<Path>> {
    let Some(prev) = item.previous() else {
        return Ok(None);
    };
    let prev_count = doc.child_count(&prev).unwrap_or(0);
    let last_child = prev_count.checked_sub(1).map(|idx| prev.child(idx));

    let sublist = match last_child {
        Some(last) if matches!(doc.kind(&last), Some(ElementKind::List { .. })) => last,
        _ => {
            let ordered = item
                .parent()
                .and_then(|list| doc.kind(&list).cloned())
                .is_some_and(|k| matches!(k, ElementKind::List { ordered: true, .. }));
            let at = prev.child(prev_count);
            doc.insert_node(&at, Element::list(ordered, Vec::new()).into())?;
            at
        }
    };
    let target = sublist.child(doc.child_count(&sublist).unwrap_or(0));
    doc.move_node(item, &target)?;
    Ok(Some(target))
}

/// Lift `item` out of a nested list to follow its parent item. Items after it
/// become its own sublist. Returns the item's new path.
fn outdent_item(doc: &mut Document, item: &Path) -> Result<Option<Path>> {
    let list = item
        .parent()
        .ok_or_else(|| DocumentError::InvalidPath(item.clone()))?;
    let Some(parent_item) = list
        .parent()
        .filter(|p| matches!(doc.kind(p), Some(ElementKind::ListItem { .. })))
    else {
        return Ok(None);
    };
    let idx = item.last().unwrap_or(0);
    let count = doc.child_count(&list).unwrap_or(0);
    if idx + 1 < count {
        doc.split_node(&list, idx + 1)?;
        let tail = list
            .next()
            .ok_or_else(|| DocumentError::InvalidPath(list.clone()))?;
        let at = item.child(doc.child_count(item).unwrap_or(0));
        doc.move_node(&tail, &at)?;
    }
    let target = parent_item
        .next()
        .ok_or_else(|| DocumentError::InvalidPath(parent_item.clone()))?;
    doc.move_node(item, &target)?;
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Node;

    fn item(text: &str, sub: Vec<Node>) -> Node {
        let mut blocks = vec![Element::text_paragraph(text).into()];
        if !sub.is_empty() {
            blocks.push(Element::list(false, sub).into());
        }
        Element::list_item(None, blocks).into()
    }

    fn press(doc: &mut Document, selection: Selection, outdent: bool) -> HandlerOutcome {
        let out = tab(doc, &selection, outdent);
        doc.validate().unwrap();
        out
    }

    #[test]
    fn test_cell_navigation() {
        let rows = [["a", "b"], ["c", "d"]].map(|cells| {
            Node::from(Element::new(
                ElementKind::TableRow,
                cells.map(|c| Node::from(Element::table_cell(false, c))).to_vec(),
            ))
        });
        let mut doc = Document::from_nodes(vec![
            Element::new(ElementKind::Table { aligns: vec![] }, rows.to_vec()).into(),
        ]);
        let out = press(&mut doc, Selection::caret([0, 0, 0, 0], 0), false);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 0, 1, 0], 1)));
        let out = press(&mut doc, Selection::caret([0, 0, 1, 0], 0), false);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 1, 0, 0], 1)));
        let out = press(&mut doc, Selection::caret([0, 1, 1, 0], 0), false);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 1, 1, 0], 0)));
        let out = press(&mut doc, Selection::caret([0, 1, 0, 0], 0), true);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 0, 1, 0], 1)));
    }

    #[test]
    fn test_indent_nests_under_previous_item() {
        let mut doc = Document::from_nodes(vec![
            Element::list(false, vec![item("a", vec![]), item("b", vec![]), item("c", vec![])]).into(),
        ]);
        let out = press(&mut doc, Selection::caret([0, 1, 0, 0], 1), false);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 0, 1, 0, 0, 0], 1)));

        // The next indent joins the existing sublist.
        let out = press(&mut doc, Selection::caret([0, 1, 0, 0], 0), false);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 0, 1, 1, 0, 0], 0)));
        assert_eq!(doc.child_count(&Path::from([0])), Some(1));
        assert_eq!(doc.child_count(&Path::from([0, 0, 1])), Some(2));
    }

    #[test]
    fn test_first_item_and_top_level_are_swallowed() {
        let mut doc = Document::from_nodes(vec![
            Element::list(false, vec![item("a", vec![])]).into(),
        ]);
        let before = doc.clone();
        let caret = Selection::caret([0, 0, 0, 0], 0);
        assert_eq!(press(&mut doc, caret.clone(), false), HandlerOutcome::Handled(caret.clone()));
        assert_eq!(press(&mut doc, caret.clone(), true), HandlerOutcome::Handled(caret));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_outdent_takes_following_items() {
        let mut doc = Document::from_nodes(vec![
            Element::list(false, vec![item("a", vec![item("b", vec![]), item("c", vec![])])]).into(),
        ]);
        let out = press(&mut doc, Selection::caret([0, 0, 1, 0, 0, 0], 1), true);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 1, 0, 0], 1)));
        // a lost its sublist, b now owns c.
        assert_eq!(doc.child_count(&Path::from([0, 0])), Some(1));
        assert_eq!(doc.children()[0].children()[1].text(), "bc");
        assert_eq!(doc.child_count(&Path::from([0, 1, 1])), Some(1));
    }

    #[test]
    fn test_plain_paragraph_is_not_handled() {
        let mut doc = Document::from_nodes(vec![Element::text_paragraph("x").into()]);
        assert_eq!(
            press(&mut doc, Selection::caret([0, 0], 0), false),
            HandlerOutcome::NotHandled
        );
    }
}
