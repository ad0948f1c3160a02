//! Keystroke handlers.
//!
//! Each handler inspects the lowest element under a collapsed caret and
//! either rewrites the tree (returning the new selection) or declines. A
//! handler works on a draft of the document: if it declines or a primitive
//! fails on a shape it does not model, the draft is thrown away and the
//! document is untouched. The generic fallbacks live in [`defaults`].

mod arrow;
mod backspace;
pub mod defaults;
mod enter;
mod tab;

pub use arrow::arrow;
pub use backspace::backspace;
pub use enter::enter;
pub use tab::tab;

use crate::actions::EditorAction;
use crate::document::{Document, Element, ElementKind, Leaf, Node, Path, Result};
use crate::error::DocumentError;
use crate::types::{Point, Selection};

/// Result of running a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The tree (possibly) changed and the caret moved here.
    Handled(Selection),
    /// Fall through to the next handler or the generic default.
    NotHandled,
}

impl HandlerOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }

    pub fn selection(&self) -> Option<&Selection> {
        match self {
            Self::Handled(selection) => Some(selection),
            Self::NotHandled => None,
        }
    }
}

/// Flavour of a line break request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    /// Plain Enter.
    Block,
    /// Shift+Enter: a break inside the current block.
    Line,
    /// Ctrl/Cmd+Enter: a structural break (new table row, leave a list).
    Force,
}

/// Run an action through its handler and, when that declines, its generic
/// default. Arrow keys have no default: an unhandled arrow is left to the
/// host's caret movement.
pub fn dispatch(doc: &mut Document, selection: &Selection, action: &EditorAction) -> HandlerOutcome {
    let outcome = match action {
        EditorAction::DeleteBackward => backspace(doc, selection),
        EditorAction::InsertBreak => enter(doc, selection, BreakKind::Block),
        EditorAction::InsertLineBreak => enter(doc, selection, BreakKind::Line),
        EditorAction::ForceBreak => enter(doc, selection, BreakKind::Force),
        EditorAction::Move(direction) => return arrow(doc, selection, *direction),
        EditorAction::Indent => return tab(doc, selection, false),
        EditorAction::Outdent => return tab(doc, selection, true),
        EditorAction::Insert(text) => return defaults::insert_text(doc, selection, text),
    };
    if outcome.is_handled() {
        return outcome;
    }
    match action {
        EditorAction::DeleteBackward => defaults::delete_backward(doc, selection),
        EditorAction::InsertBreak => defaults::insert_break(doc, selection, BreakKind::Block),
        EditorAction::InsertLineBreak => defaults::insert_break(doc, selection, BreakKind::Line),
        EditorAction::ForceBreak => defaults::insert_break(doc, selection, BreakKind::Force),
        _ => HandlerOutcome::NotHandled,
    }
}

/// Run `f` on a draft of `doc`, committing only when it returns a selection.
///
/// The committed draft is normalized and the returned selection clamped
/// onto it. Errors are unmodeled shapes: logged and reported as not handled.
pub(crate) fn run_handler(
    doc: &mut Document,
    name: &'static str,
    f: impl FnOnce(&mut Document) -> Result<Option<Selection>>,
) -> HandlerOutcome {
    let mut draft = doc.clone();
    match f(&mut draft) {
        Ok(Some(selection)) => {
            draft.normalize();
            let selection = draft.clamp_selection(&selection);
            tracing::trace!(
                target: "loom::handlers",
                handler = name,
                anchor = %selection.anchor.path,
                focus = %selection.focus.path,
                "handled"
            );
            *doc = draft;
            HandlerOutcome::Handled(selection)
        }
        Ok(None) => HandlerOutcome::NotHandled,
        Err(err) => {
            tracing::trace!(
                target: "loom::handlers",
                handler = name,
                error = %err,
                "unmodeled shape, not handled"
            );
            HandlerOutcome::NotHandled
        }
    }
}

/// A resolved collapsed caret.
#[derive(Debug, Clone)]
pub(crate) struct Caret {
    pub point: Point,
    /// The element directly holding the caret leaf.
    pub lowest: Path,
    pub kind: ElementKind,
}

impl Caret {
    pub fn resolve(doc: &Document, selection: &Selection) -> Option<Self> {
        if !selection.is_collapsed() || !doc.is_valid_point(&selection.focus) {
            return None;
        }
        let point = selection.focus.clone();
        let lowest = doc.lowest_element(&point.path)?;
        let kind = doc.kind(&lowest)?.clone();
        Some(Self {
            point,
            lowest,
            kind,
        })
    }

    /// Index of the caret leaf among its siblings.
    pub fn leaf_index(&self) -> usize {
        self.point.path.last().unwrap_or(0)
    }
}

/// Is `point` at the very start of the text block `block` (nothing but empty
/// leaves before it)?
pub(crate) fn is_at_start(doc: &Document, block: &Path, point: &Point) -> bool {
    if point.offset != 0 || point.path.parent().as_ref() != Some(block) {
        return false;
    }
    let idx = point.path.last().unwrap_or(0);
    doc.element(block).is_some_and(|el| {
        el.children[..idx.min(el.children.len())]
            .iter()
            .all(|c| c.as_leaf().is_some_and(Leaf::is_empty))
    })
}

/// Is `point` at the very end of the text block `block`?
pub(crate) fn is_at_end(doc: &Document, block: &Path, point: &Point) -> bool {
    if point.path.parent().as_ref() != Some(block) {
        return false;
    }
    let Some(leaf) = doc.leaf(&point.path) else {
        return false;
    };
    if point.offset < leaf.len() {
        return false;
    }
    let idx = point.path.last().unwrap_or(0);
    doc.element(block).is_some_and(|el| {
        el.children
            .iter()
            .skip(idx + 1)
            .all(|c| c.as_leaf().is_some_and(Leaf::is_empty))
    })
}

/// Caret at the start of the empty paragraph found at `path`.
pub(crate) fn caret_in(path: &Path) -> Selection {
    Selection::caret(path.child(0), 0)
}

/// Collapsed selection at the start of the node at `path`.
pub(crate) fn select_start(doc: &Document, path: &Path) -> Option<Selection> {
    doc.start_point(path).map(Selection::collapsed)
}

/// Collapsed selection at the end of the node at `path`.
pub(crate) fn select_end(doc: &Document, path: &Path) -> Option<Selection> {
    doc.end_point(path).map(Selection::collapsed)
}

/// Selection on a card's payload.
pub(crate) fn select_card(card: &Path) -> Selection {
    Selection::caret(card.child(1).child(0), 0)
}

/// Is the element at `path` a card wrapper?
pub(crate) fn is_card(doc: &Document, path: &Path) -> bool {
    doc.kind(path) == Some(&ElementKind::Card)
}

/// Is the caret leaf the filler of an atomic void (a card payload or an
/// inline void), as opposed to a card sentinel or a rule?
pub(crate) fn is_atomic_leaf(doc: &Document, leaf: &Path) -> bool {
    leaf.parent()
        .and_then(|parent| doc.kind(&parent))
        .is_some_and(|kind| {
            kind.is_void() && !kind.is_sentinel() && *kind != ElementKind::HorizontalRule
        })
}

/// Split the list at `item` so that the item ends up on its own: items after
/// it move to a new sibling list. When `remove_item` is set the item itself
/// is dropped; an empty paragraph is placed between both halves either way.
/// Returns the path of that paragraph.
pub(crate) fn break_out_of_list(
    doc: &mut Document,
    item: &Path,
    remove_item: bool,
) -> Result<Path> {
    let list = item
        .parent()
        .ok_or_else(|| DocumentError::InvalidPath(item.clone()))?;
    let idx = item.last().unwrap_or(0);
    doc.split_node(&list, idx + 1)?;
    let mut keep = idx + 1;
    if remove_item {
        doc.remove_node(item)?;
        keep = idx;
    }
    let paragraph = if keep == 0 {
        doc.remove_node(&list)?;
        list.clone()
    } else {
        list.next()
            .ok_or_else(|| DocumentError::InvalidPath(list.clone()))?
    };
    doc.insert_node(&paragraph, Node::from(Element::empty_paragraph()))?;
    Ok(paragraph)
}
