//! Enter, Shift+Enter and the forced break.

use super::{
    BreakKind, Caret, HandlerOutcome, break_out_of_list, caret_in, defaults, is_at_end,
    is_at_start, run_handler, select_start,
};
use crate::document::{Document, Element, ElementKind, Node, Path, Result};
use crate::error::DocumentError;
use crate::types::Selection;

/// Structural Enter. A range selection is deleted first and the break is
/// applied at the collapsed result, falling back to a plain split.
pub fn enter(doc: &mut Document, selection: &Selection, kind: BreakKind) -> HandlerOutcome {
    if !selection.is_collapsed() {
        return run_handler(doc, "enter", |d| {
            let point = defaults::delete_selection(d, selection)?;
            let collapsed_at = Selection::collapsed(point.clone());
            if let Some(caret) = Caret::resolve(d, &collapsed_at) {
                if let Some(selection) = collapsed(d, &caret, kind)? {
                    return Ok(Some(selection));
                }
            }
            defaults::break_at(d, &point, kind).map(Some)
        });
    }
    let Some(caret) = Caret::resolve(doc, selection) else {
        return HandlerOutcome::NotHandled;
    };
    run_handler(doc, "enter", |d| collapsed(d, &caret, kind))
}

fn parent_of(path: &Path) -> Result<Path> {
    path.parent()
        .ok_or_else(|| DocumentError::InvalidPath(path.clone()))
}

fn next_of(path: &Path) -> Result<Path> {
    path.next()
        .ok_or_else(|| DocumentError::InvalidPath(path.clone()))
}

fn collapsed(doc: &mut Document, caret: &Caret, kind: BreakKind) -> Result<Option<Selection>> {
    let lowest = &caret.lowest;
    match &caret.kind {
        ElementKind::CardBefore => {
            let card = parent_of(lowest)?;
            doc.insert_node(&card, Element::empty_paragraph().into())?;
            let moved = next_of(&card)?;
            Ok(Some(Selection::caret(moved.child(0).child(0), 0)))
        }
        ElementKind::CardAfter => {
            let after = next_of(&parent_of(lowest)?)?;
            doc.insert_node(&after, Element::empty_paragraph().into())?;
            Ok(Some(caret_in(&after)))
        }
        ElementKind::Break => {
            let Some(block) = doc.text_block(lowest) else {
                return Ok(None);
            };
            let after = next_of(&block)?;
            doc.insert_node(&after, Element::empty_paragraph().into())?;
            Ok(Some(caret_in(&after)))
        }
        ElementKind::Heading { .. } if kind != BreakKind::Line => heading(doc, caret),
        ElementKind::TableCell { .. } => table_cell(doc, caret, kind),
        ElementKind::Paragraph => {
            let item = parent_of(lowest)?;
            match doc.kind(&item).cloned() {
                Some(ElementKind::ListItem { checked }) => list_item(doc, &item, checked, kind),
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

fn heading(doc: &mut Document, caret: &Caret) -> Result<Option<Selection>> {
    let heading = &caret.lowest;
    let point = &caret.point;
    if is_at_start(doc, heading, point) {
        doc.insert_node(heading, Element::empty_paragraph().into())?;
        let moved = next_of(heading)?;
        return Ok(Some(Selection::caret(
            moved.child(caret.leaf_index()),
            point.offset,
        )));
    }
    if is_at_end(doc, heading, point) {
        let after = next_of(heading)?;
        doc.insert_node(&after, Element::empty_paragraph().into())?;
        return Ok(Some(caret_in(&after)));
    }
    let second = doc.split_at_point(point, heading)?;
    doc.set_kind(&second, ElementKind::Paragraph)?;
    Ok(select_start(doc, &second))
}

fn table_cell(doc: &mut Document, caret: &Caret, kind: BreakKind) -> Result<Option<Selection>> {
    let cell = &caret.lowest;
    let column = cell.last().unwrap_or(0);
    let row = parent_of(cell)?;
    match kind {
        // A line break inside the cell is the generic default.
        BreakKind::Line => Ok(None),
        BreakKind::Force => {
            let columns = doc.child_count(&row).unwrap_or(1);
            let cells = (0..columns)
                .map(|_| Node::from(Element::empty_cell(false)))
                .collect();
            let below = next_of(&row)?;
            doc.insert_node(&below, Element::new(ElementKind::TableRow, cells).into())?;
            Ok(Some(caret_in(&below.child(column))))
        }
        BreakKind::Block => {
            let below = next_of(&row)?;
            if let Some(count) = doc.child_count(&below) {
                let target = below.child(column.min(count.saturating_sub(1)));
                return Ok(select_start(doc, &target));
            }
            let table = parent_of(&row)?;
            if let Some(next) = doc.next_path(&table) {
                return Ok(select_start(doc, &next));
            }
            let after = next_of(&table)?;
            doc.insert_node(&after, Element::empty_paragraph().into())?;
            Ok(Some(caret_in(&after)))
        }
    }
}

fn list_item(
    doc: &mut Document,
    item: &Path,
    checked: Option<bool>,
    kind: BreakKind,
) -> Result<Option<Selection>> {
    match kind {
        BreakKind::Force => {
            let paragraph = break_out_of_list(doc, item, false)?;
            Ok(Some(caret_in(&paragraph)))
        }
        BreakKind::Block
            if checked == Some(true) && doc.element(item).is_some_and(Element::is_blank) =>
        {
            let after = next_of(item)?;
            let fresh = Element::list_item(Some(false), vec![Element::empty_paragraph().into()]);
            doc.insert_node(&after, fresh.into())?;
            Ok(Some(Selection::caret(after.child(0).child(0), 0)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Leaf;
    use crate::types::Point;

    fn para(text: &str) -> Node {
        Element::text_paragraph(text).into()
    }

    fn card() -> Node {
        Element::card(Element::void(ElementKind::Media {
            url: "a.png".into(),
            alt: String::new(),
            title: None,
            height: None,
        }))
        .into()
    }

    fn table(rows: &[&[&str]]) -> Node {
        Element::new(
            ElementKind::Table { aligns: vec![] },
            rows.iter()
                .map(|cells| {
                    Element::new(
                        ElementKind::TableRow,
                        cells.iter().map(|c| Element::table_cell(false, *c).into()).collect(),
                    )
                    .into()
                })
                .collect(),
        )
        .into()
    }

    fn press(doc: &mut Document, selection: Selection, kind: BreakKind) -> HandlerOutcome {
        let out = enter(doc, &selection, kind);
        doc.validate().unwrap();
        out
    }

    fn names(doc: &Document) -> Vec<&'static str> {
        doc.children().iter().filter_map(Node::kind).map(ElementKind::name).collect()
    }

    #[test]
    fn test_card_sentinels() {
        let mut doc = Document::from_nodes(vec![card()]);
        let out = press(&mut doc, Selection::caret([0, 0, 0], 0), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0, 0], 0)));
        assert_eq!(names(&doc), vec!["paragraph", "card"]);

        let out = press(&mut doc, Selection::caret([1, 2, 0], 0), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([2, 0], 0)));
        assert_eq!(names(&doc), vec!["paragraph", "card", "paragraph"]);
    }

    #[test]
    fn test_enter_on_break_adds_paragraph() {
        let mut doc = Document::from_nodes(vec![
            Element::paragraph(vec![
                Leaf::new("a").into(),
                Element::void(ElementKind::Break).into(),
                Leaf::new("b").into(),
            ])
            .into(),
        ]);
        let out = press(&mut doc, Selection::caret([0, 1, 0], 0), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));
        assert_eq!(doc.children().len(), 2);
    }

    #[test]
    fn test_heading_edges_and_split() {
        let mut doc = Document::from_nodes(vec![Element::heading(1, "Title").into()]);
        let out = press(&mut doc, Selection::caret([0, 0], 0), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));
        assert_eq!(names(&doc), vec!["paragraph", "heading"]);

        let out = press(&mut doc, Selection::caret([1, 0], 5), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([2, 0], 0)));
        assert_eq!(names(&doc), vec!["paragraph", "heading", "paragraph"]);

        let mut doc = Document::from_nodes(vec![Element::heading(2, "Title").into()]);
        let out = press(&mut doc, Selection::caret([0, 0], 2), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));
        assert_eq!(doc.children()[0].text(), "Ti");
        assert_eq!(doc.children()[1].text(), "tle");
        assert_eq!(doc.kind(&Path::from([1])), Some(&ElementKind::Paragraph));
    }

    #[test]
    fn test_table_enter_walks_rows_then_leaves() {
        let mut doc = Document::from_nodes(vec![table(&[&["a", "b"], &["c", "d"]])]);
        let out = press(&mut doc, Selection::caret([0, 0, 1, 0], 1), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 1, 1, 0], 0)));

        let out = press(&mut doc, Selection::caret([0, 1, 1, 0], 1), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));
        assert_eq!(names(&doc), vec!["table", "paragraph"]);
    }

    #[test]
    fn test_table_force_adds_row_and_line_defers() {
        let mut doc = Document::from_nodes(vec![table(&[&["a", "b"]])]);
        let out = press(&mut doc, Selection::caret([0, 0, 1, 0], 0), BreakKind::Force);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 1, 1, 0], 0)));
        assert_eq!(doc.child_count(&Path::from([0])), Some(2));
        assert_eq!(doc.child_count(&Path::from([0, 1])), Some(2));

        let out = press(&mut doc, Selection::caret([0, 0, 0, 0], 1), BreakKind::Line);
        assert_eq!(out, HandlerOutcome::NotHandled);
    }

    #[test]
    fn test_list_force_and_checked_item() {
        let item = |checked, text: &str| -> Node {
            Element::list_item(checked, vec![para(text)]).into()
        };
        let mut doc = Document::from_nodes(vec![
            Element::list(false, vec![item(None, "a"), item(None, "b")]).into(),
        ]);
        let out = press(&mut doc, Selection::caret([0, 0, 0, 0], 1), BreakKind::Force);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));
        assert_eq!(names(&doc), vec!["list", "paragraph", "list"]);

        let mut doc = Document::from_nodes(vec![
            Element::list(false, vec![item(Some(true), "")]).into(),
        ]);
        let out = press(&mut doc, Selection::caret([0, 0, 0, 0], 0), BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 1, 0, 0], 0)));
        assert_eq!(
            doc.kind(&Path::from([0, 1])),
            Some(&ElementKind::ListItem { checked: Some(false) })
        );

        // A non-empty item is left to the generic split.
        let mut doc = Document::from_nodes(vec![
            Element::list(false, vec![item(Some(true), "x")]).into(),
        ]);
        assert_eq!(
            press(&mut doc, Selection::caret([0, 0, 0, 0], 1), BreakKind::Block),
            HandlerOutcome::NotHandled
        );
    }

    #[test]
    fn test_range_is_deleted_then_split() {
        let mut doc = Document::from_nodes(vec![para("hello"), para("world")]);
        let selection = Selection::new(Point::new([0, 0], 2), Point::new([1, 0], 3));
        let out = press(&mut doc, selection, BreakKind::Block);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));
        assert_eq!(doc.children()[0].text(), "he");
        assert_eq!(doc.children()[1].text(), "ld");
    }
}
