//! Arrow keys.
//!
//! Only the moves the host cannot get right on its own are claimed: stepping
//! over voids as a unit, landing next to marked text without inheriting its
//! marks, and vertical moves onto cards and around stray paragraphs. Every
//! other arrow press is left to the host's caret movement.

use super::{
    Caret, HandlerOutcome, caret_in, is_at_end, is_at_start, is_atomic_leaf, is_card,
    run_handler, select_card, select_end, select_start,
};
use crate::actions::Direction;
use crate::document::{Document, Element, ElementKind, Leaf, Path, Result};
use crate::types::{Point, Selection};

pub fn arrow(doc: &mut Document, selection: &Selection, direction: Direction) -> HandlerOutcome {
    let Some(caret) = Caret::resolve(doc, selection) else {
        return HandlerOutcome::NotHandled;
    };
    run_handler(doc, "arrow", |d| match direction {
        Direction::Left => horizontal(d, &caret.point, true),
        Direction::Right => horizontal(d, &caret.point, false),
        Direction::Up => vertical(d, &caret.point, true),
        Direction::Down => vertical(d, &caret.point, false),
    })
}

fn leaf_start(path: Path) -> Selection {
    Selection::caret(path, 0)
}

fn adjacent_leaf(doc: &Document, leaf: &Path, backward: bool) -> Option<Path> {
    if backward {
        doc.previous_leaf(leaf)
    } else {
        doc.next_leaf(leaf)
    }
}

/// Caret on the near edge of `leaf` when arriving from the other direction.
fn landing(doc: &Document, leaf: Path, backward: bool) -> Option<Selection> {
    if backward {
        doc.end_point(&leaf).map(Selection::collapsed)
    } else {
        Some(leaf_start(leaf))
    }
}

fn horizontal(doc: &mut Document, point: &Point, backward: bool) -> Result<Option<Selection>> {
    let path = &point.path;
    if is_atomic_leaf(doc, path) {
        return Ok(adjacent_leaf(doc, path, backward).and_then(|next| landing(doc, next, backward)));
    }
    let Some(leaf) = doc.leaf(path) else {
        return Ok(None);
    };
    let at_edge = if backward {
        point.offset == 0
    } else {
        point.offset >= leaf.len()
    };
    if !at_edge {
        return Ok(None);
    }

    let adjacent = adjacent_leaf(doc, path, backward);
    if let Some(void_leaf) = adjacent.as_ref().filter(|p| is_atomic_leaf(doc, p)) {
        return Ok(adjacent_leaf(doc, void_leaf, backward).and_then(|past| landing(doc, past, backward)));
    }

    // Moving off a marked leaf at the edge of its block.
    if doc.leaf(path).is_some_and(Leaf::is_dirty) && is_block_edge(doc, path, backward) {
        return insert_guard(doc, path, !backward).map(Some);
    }

    // Moving into a marked leaf at the near edge of the next block.
    let Some(adjacent) = adjacent else {
        return Ok(None);
    };
    let Some(block) = doc.text_block(path) else {
        return Ok(None);
    };
    let leaving = if backward {
        is_at_start(doc, &block, point)
    } else {
        is_at_end(doc, &block, point)
    };
    if leaving
        && doc.leaf(&adjacent).is_some_and(Leaf::is_dirty)
        && is_block_edge(doc, &adjacent, !backward)
    {
        return insert_guard(doc, &adjacent, backward).map(Some);
    }
    Ok(None)
}

/// Is `leaf` the first (`first == true`) or last child of its text block?
fn is_block_edge(doc: &Document, leaf: &Path, first: bool) -> bool {
    let Some(parent) = leaf.parent() else {
        return false;
    };
    if !doc.kind(&parent).is_some_and(ElementKind::is_text_block) {
        return false;
    }
    let idx = leaf.last().unwrap_or(0);
    if first {
        idx == 0
    } else {
        doc.child_count(&parent).is_some_and(|n| idx + 1 == n)
    }
}

/// Insert an unmarked empty leaf after (or before) `leaf` and put the caret
/// in it.
fn insert_guard(doc: &mut Document, leaf: &Path, after: bool) -> Result<Selection> {
    let at = if after {
        leaf.next()
            .ok_or_else(|| crate::error::DocumentError::InvalidPath(leaf.clone()))?
    } else {
        leaf.clone()
    };
    doc.insert_node(&at, Leaf::empty().into())?;
    Ok(leaf_start(at))
}

fn vertical(doc: &mut Document, point: &Point, up: bool) -> Result<Option<Selection>> {
    let Some(top) = point.path.top().map(|idx| Path::from([idx])) else {
        return Ok(None);
    };
    let last_top = doc.children().len().saturating_sub(1);
    if is_card(doc, &top) {
        return card_vertical(doc, &top, up);
    }
    let Some(block) = doc.text_block(&point.path) else {
        return Ok(None);
    };

    let stray = block.len() == 1
        && doc.kind(&block) == Some(&ElementKind::Paragraph)
        && doc.element(&block).is_some_and(Element::is_blank);
    if stray {
        let idx = block.last().unwrap_or(0);
        let neighbour = if up && idx == last_top {
            block.previous()
        } else if !up && idx == 0 {
            block.next()
        } else {
            None
        };
        let absorbs = neighbour
            .as_ref()
            .and_then(|n| doc.kind(n))
            .is_some_and(ElementKind::absorbs_stray_paragraph);
        if let (true, Some(neighbour)) = (absorbs, neighbour) {
            doc.remove_node(&block)?;
            return Ok(if up {
                select_end(doc, &neighbour)
            } else {
                select_start(doc, &block)
            });
        }
    }

    if up {
        if is_edge_block(doc, &top, &block, true) {
            if let Some(prev) = top.previous().filter(|p| is_card(doc, p)) {
                return Ok(Some(select_card(&prev)));
            }
        }
        return Ok(None);
    }
    if is_edge_block(doc, &top, &block, false) {
        if let Some(next) = top.next().filter(|n| is_card(doc, n)) {
            return Ok(Some(select_card(&next)));
        }
    }
    if top.last() == Some(last_top)
        && doc.end_point(&top).as_ref() == Some(point)
        && !stray
    {
        return append_paragraph(doc).map(Some);
    }
    Ok(None)
}

/// Is `block` the first (or last) text block inside the top-level `top`?
fn is_edge_block(doc: &Document, top: &Path, block: &Path, first: bool) -> bool {
    let neighbour = if first {
        doc.first_leaf(block).and_then(|leaf| doc.previous_leaf(&leaf))
    } else {
        doc.last_leaf(block).and_then(|leaf| doc.next_leaf(&leaf))
    };
    neighbour.is_none_or(|leaf| !top.contains(&leaf))
}

fn card_vertical(doc: &mut Document, card: &Path, up: bool) -> Result<Option<Selection>> {
    if up {
        return Ok(doc
            .previous_path(card)
            .and_then(|prev| select_end(doc, &prev)));
    }
    match doc.next_path(card) {
        Some(next) => Ok(select_start(doc, &next)),
        None => append_paragraph(doc).map(Some),
    }
}

fn append_paragraph(doc: &mut Document) -> Result<Selection> {
    let at = Path::from([doc.children().len()]);
    doc.insert_node(&at, Element::empty_paragraph().into())?;
    Ok(caret_in(&at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Marks, Node};

    fn para(text: &str) -> Node {
        Element::text_paragraph(text).into()
    }

    fn media() -> ElementKind {
        ElementKind::Media {
            url: "a.png".into(),
            alt: String::new(),
            title: None,
            height: None,
        }
    }

    fn press(doc: &mut Document, selection: Selection, direction: Direction) -> HandlerOutcome {
        let out = arrow(doc, &selection, direction);
        doc.validate().unwrap();
        out
    }

    #[test]
    fn test_inline_void_is_one_stop() {
        let mut doc = Document::from_nodes(vec![
            Element::paragraph(vec![
                Leaf::new("a").into(),
                Element::void(media()).into(),
                Leaf::new("b").into(),
            ])
            .into(),
        ]);
        let right = press(&mut doc, Selection::caret([0, 0], 1), Direction::Right);
        assert_eq!(right, HandlerOutcome::Handled(Selection::caret([0, 2], 0)));
        let left = press(&mut doc, Selection::caret([0, 2], 0), Direction::Left);
        assert_eq!(left, HandlerOutcome::Handled(Selection::caret([0, 0], 1)));
        let out = press(&mut doc, Selection::caret([0, 1, 0], 0), Direction::Right);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 2], 0)));
        // Mid-text moves are the host's.
        let mid = press(&mut doc, Selection::caret([0, 0], 0), Direction::Right);
        assert_eq!(mid, HandlerOutcome::NotHandled);
    }

    #[test]
    fn test_card_payload_is_skipped() {
        let mut doc = Document::from_nodes(vec![para("x"), Element::card(Element::void(media())).into()]);
        let out = press(&mut doc, Selection::caret([1, 0, 0], 0), Direction::Right);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 2, 0], 0)));
        let out = press(&mut doc, Selection::caret([1, 2, 0], 0), Direction::Left);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0, 0], 0)));
    }

    #[test]
    fn test_guard_leaf_next_to_marked_text() {
        let bold = || -> Node {
            Element::paragraph(vec![Leaf::with_marks("b", Marks::bold()).into()]).into()
        };
        let mut doc = Document::from_nodes(vec![bold()]);
        let out = press(&mut doc, Selection::caret([0, 0], 1), Direction::Right);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 1], 0)));
        assert_eq!(doc.leaf(&Path::from([0, 1])), Some(&Leaf::empty()));

        let mut doc = Document::from_nodes(vec![bold()]);
        let out = press(&mut doc, Selection::caret([0, 0], 0), Direction::Left);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 0], 0)));
        assert!(doc.leaf(&Path::from([0, 1])).is_some_and(Leaf::is_dirty));

        let mut doc = Document::from_nodes(vec![para("a"), bold()]);
        let out = press(&mut doc, Selection::caret([0, 0], 1), Direction::Right);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));
        assert_eq!(doc.child_count(&Path::from([1])), Some(2));
    }

    #[test]
    fn test_stray_paragraph_is_absorbed() {
        let table = Element::new(
            ElementKind::Table { aligns: vec![] },
            vec![Element::new(ElementKind::TableRow, vec![Element::table_cell(false, "c").into()]).into()],
        );
        let mut doc = Document::from_nodes(vec![para(""), table.into()]);
        let out = press(&mut doc, Selection::caret([0, 0], 0), Direction::Down);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 0, 0, 0], 0)));
        assert_eq!(doc.children().len(), 1);

        let mut doc = Document::from_nodes(vec![Element::code(None, "ab").into(), para("")]);
        let out = press(&mut doc, Selection::caret([1, 0], 0), Direction::Up);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 0, 0], 2)));
        assert_eq!(doc.children().len(), 1);
    }

    #[test]
    fn test_vertical_onto_cards() {
        let card = || -> Node { Element::card(Element::void(media())).into() };
        let mut doc = Document::from_nodes(vec![para("a"), card()]);
        let out = press(&mut doc, Selection::caret([0, 0], 0), Direction::Down);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 1, 0], 0)));

        let mut doc = Document::from_nodes(vec![card(), para("a")]);
        let out = press(&mut doc, Selection::caret([1, 0], 1), Direction::Up);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([0, 1, 0], 0)));

        // Down from a trailing card opens a paragraph after it.
        let mut doc = Document::from_nodes(vec![card()]);
        let out = press(&mut doc, Selection::caret([0, 1, 0], 0), Direction::Down);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));
    }

    #[test]
    fn test_down_at_end_appends_paragraph() {
        let mut doc = Document::from_nodes(vec![para("a")]);
        let out = press(&mut doc, Selection::caret([0, 0], 1), Direction::Down);
        assert_eq!(out, HandlerOutcome::Handled(Selection::caret([1, 0], 0)));

        let mut doc = Document::from_nodes(vec![para("")]);
        assert_eq!(
            press(&mut doc, Selection::caret([0, 0], 0), Direction::Down),
            HandlerOutcome::NotHandled
        );
        let mut doc = Document::from_nodes(vec![para("ab"), para("c")]);
        assert_eq!(
            press(&mut doc, Selection::caret([0, 0], 2), Direction::Down),
            HandlerOutcome::NotHandled
        );
    }
}
