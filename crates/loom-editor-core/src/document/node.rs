//! Document tree nodes.
//!
//! The tree is made of [`Element`]s (blocks, inline voids and structural
//! wrappers) and [`Leaf`] text runs. Element kinds form a closed union so every
//! handler dispatch is an exhaustive `match`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::text_helpers::char_len;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Formatting attributes carried by a leaf.
///
/// Field order is the canonical print order used by the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footnote: Option<SmolStr>,
}

impl Marks {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Default::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Default::default()
        }
    }

    pub fn code() -> Self {
        Self {
            code: true,
            ..Default::default()
        }
    }

    pub fn link(url: impl Into<SmolStr>) -> Self {
        Self {
            link: Some(url.into()),
            ..Default::default()
        }
    }
}

/// A text run with a uniform mark set. Leaves never have children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Leaf {
    pub text: String,
    #[serde(default, skip_serializing_if = "Marks::is_empty")]
    pub marks: Marks,
}

impl Leaf {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_marks(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Length in chars (all offsets in the engine are char offsets).
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// A marked leaf; the cursor inherits its formatting when it lands on it.
    pub fn is_dirty(&self) -> bool {
        !self.marks.is_empty()
    }
}

/// Column alignment of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Align {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// Identity of a code block, assigned by the owning [`Document`].
///
/// Not serialized and cleared by canonicalization; it only lets the highlight
/// cache follow a code block across moves.
///
/// [`Document`]: crate::document::Document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CodeKey(pub u64);

impl CodeKey {
    pub const UNASSIGNED: CodeKey = CodeKey(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

/// Closed set of element kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ElementKind {
    Paragraph,
    Heading {
        level: u8,
    },
    List {
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
    },
    ListItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },
    Blockquote,
    Table {
        #[serde(default)]
        aligns: Vec<Align>,
    },
    TableRow,
    TableCell {
        #[serde(default, skip_serializing_if = "is_false")]
        header: bool,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<SmolStr>,
        #[serde(skip)]
        key: CodeKey,
    },
    CodeLine,
    HorizontalRule,
    Break,
    Media {
        url: SmolStr,
        #[serde(default)]
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
    },
    Attachment {
        url: SmolStr,
        name: String,
        size: u64,
    },
    Card,
    CardBefore,
    CardAfter,
    Html {
        source: String,
    },
    Plugin {
        name: SmolStr,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        source: String,
    },
    FootnoteDefinition {
        label: SmolStr,
    },
    Placeholder {
        #[serde(default)]
        label: SmolStr,
    },
}

impl ElementKind {
    pub fn code(language: Option<&str>) -> Self {
        Self::Code {
            language: language.map(SmolStr::new),
            key: CodeKey::UNASSIGNED,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading { .. } => "heading",
            Self::List { .. } => "list",
            Self::ListItem { .. } => "list-item",
            Self::Blockquote => "blockquote",
            Self::Table { .. } => "table",
            Self::TableRow => "table-row",
            Self::TableCell { .. } => "table-cell",
            Self::Code { .. } => "code",
            Self::CodeLine => "code-line",
            Self::HorizontalRule => "hr",
            Self::Break => "break",
            Self::Media { .. } => "media",
            Self::Attachment { .. } => "attachment",
            Self::Card => "card",
            Self::CardBefore => "card-before",
            Self::CardAfter => "card-after",
            Self::Html { .. } => "html",
            Self::Plugin { .. } => "plugin",
            Self::FootnoteDefinition { .. } => "footnote-definition",
            Self::Placeholder { .. } => "placeholder",
        }
    }

    /// Void elements hold exactly one empty leaf and no editable content.
    pub fn is_void(&self) -> bool {
        matches!(
            self,
            Self::HorizontalRule
                | Self::Break
                | Self::Media { .. }
                | Self::Attachment { .. }
                | Self::CardBefore
                | Self::CardAfter
                | Self::Html { .. }
                | Self::Plugin { .. }
        )
    }

    /// Elements allowed among the children of a text block.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::Break | Self::Media { .. } | Self::Attachment { .. } | Self::Placeholder { .. }
        )
    }

    /// Blocks whose children are leaves and inline elements.
    pub fn is_text_block(&self) -> bool {
        matches!(
            self,
            Self::Paragraph | Self::Heading { .. } | Self::TableCell { .. } | Self::CodeLine
        )
    }

    /// Blocks whose children are other blocks.
    pub fn is_block_container(&self) -> bool {
        matches!(
            self,
            Self::ListItem { .. } | Self::Blockquote | Self::FootnoteDefinition { .. }
        )
    }

    /// Void kinds that get a card wrapper when they stand at block level.
    pub fn is_card_payload(&self) -> bool {
        matches!(
            self,
            Self::Media { .. } | Self::Attachment { .. } | Self::Html { .. } | Self::Plugin { .. }
        )
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::CardBefore | Self::CardAfter)
    }

    /// Contexts where pasted or typed content is inserted as literal text.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::CodeLine | Self::Code { .. } | Self::TableCell { .. } | Self::Placeholder { .. }
        )
    }

    /// Blocks an empty stray paragraph may be absorbed into.
    pub fn absorbs_stray_paragraph(&self) -> bool {
        matches!(
            self,
            Self::Table { .. } | Self::Code { .. } | Self::Blockquote
        )
    }
}

/// A non-leaf node. Children are never empty once the tree is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    #[serde(flatten)]
    pub kind: ElementKind,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    /// A void element with its single empty leaf.
    pub fn void(kind: ElementKind) -> Self {
        Self::new(kind, vec![Node::Leaf(Leaf::empty())])
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(ElementKind::Paragraph, children)
    }

    pub fn empty_paragraph() -> Self {
        Self::paragraph(vec![Node::Leaf(Leaf::empty())])
    }

    pub fn text_paragraph(text: impl Into<String>) -> Self {
        Self::paragraph(vec![Node::Leaf(Leaf::new(text))])
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(
            ElementKind::Heading { level },
            vec![Node::Leaf(Leaf::new(text))],
        )
    }

    pub fn list(ordered: bool, items: Vec<Node>) -> Self {
        Self::new(
            ElementKind::List {
                ordered,
                start: None,
            },
            items,
        )
    }

    pub fn list_item(checked: Option<bool>, blocks: Vec<Node>) -> Self {
        Self::new(ElementKind::ListItem { checked }, blocks)
    }

    pub fn code_line(text: impl Into<String>) -> Self {
        Self::new(ElementKind::CodeLine, vec![Node::Leaf(Leaf::new(text))])
    }

    pub fn code(language: Option<&str>, text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|l| Node::from(Element::code_line(l)))
            .collect();
        Self::new(ElementKind::code(language), lines)
    }

    pub fn table_cell(header: bool, text: impl Into<String>) -> Self {
        Self::new(
            ElementKind::TableCell { header },
            vec![Node::Leaf(Leaf::new(text))],
        )
    }

    pub fn empty_cell(header: bool) -> Self {
        Self::table_cell(header, "")
    }

    /// Card wrapper around a block-level void payload.
    pub fn card(payload: Element) -> Self {
        Self::new(
            ElementKind::Card,
            vec![
                Element::void(ElementKind::CardBefore).into(),
                payload.into(),
                Element::void(ElementKind::CardAfter).into(),
            ],
        )
    }

    /// Concatenated text of all descendant leaves.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// True when there is no text and no inline void under this element.
    pub fn is_blank(&self) -> bool {
        self.children.iter().all(|child| match child {
            Node::Leaf(leaf) => leaf.is_empty(),
            Node::Element(el) if el.kind.is_void() => false,
            Node::Element(el) => el.is_blank(),
        })
    }

    /// A paragraph holding nothing but embeds and unmarked whitespace. Markup
    /// reads such a paragraph back as one card per embed.
    pub fn is_embeds_only(&self) -> bool {
        self.kind == ElementKind::Paragraph
            && self.children.iter().any(|n| !n.is_leaf())
            && self.children.iter().all(|n| match n {
                Node::Leaf(leaf) => leaf.text.trim().is_empty() && leaf.marks.is_empty(),
                Node::Element(el) => el.kind.is_card_payload(),
            })
    }

    /// Payload of a card wrapper.
    pub fn card_payload(&self) -> Option<&Element> {
        if self.kind != ElementKind::Card {
            return None;
        }
        self.children
            .iter()
            .filter_map(Node::as_element)
            .find(|el| !el.kind.is_sentinel())
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Leaf(leaf) => out.push_str(&leaf.text),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Leaf(Leaf),
    Element(Element),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Element(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Element(_) => None,
        }
    }

    pub fn kind(&self) -> Option<&ElementKind> {
        self.as_element().map(|el| &el.kind)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Leaf(_) => &[],
        }
    }

    pub fn text(&self) -> String {
        match self {
            Node::Leaf(leaf) => leaf.text.clone(),
            Node::Element(el) => el.text(),
        }
    }

    /// Is this node a block-level void or a card wrapping one?
    pub fn is_void_block(&self) -> bool {
        match self {
            Node::Element(el) => el.kind == ElementKind::Card || el.kind.is_card_payload(),
            Node::Leaf(_) => false,
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Leaf(leaf)
    }
}
