//! Markup text to document tree.
//!
//! Walks pulldown-cmark events with a stack of open elements and a stack of
//! saved mark sets. Inline content that arrives directly inside a container
//! (tight list items) opens an implicit paragraph.

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use smol_str::SmolStr;

use super::embed::{self, Embed};
use super::plugin::PluginRegistry;
use crate::document::{Align, Element, ElementKind, Leaf, Marks, Node};

pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Parse markup into top-level nodes. The result is not normalized.
pub fn parse_nodes(markup: &str, plugins: &PluginRegistry) -> Vec<Node> {
    let mut builder = TreeBuilder::new(plugins);
    for event in Parser::new_ext(markup, markdown_options()) {
        tracing::trace!(target: "loom::markup", event = ?event, "parse event");
        builder.event(event);
    }
    builder.finish()
}

struct Frame {
    element: Element,
    implicit: bool,
}

/// Inline capture in progress (image alt text or link text of an embed).
enum Capture {
    Image {
        url: String,
        title: String,
        alt: String,
    },
    Attachment {
        embed: Embed,
        text: String,
    },
}

struct TreeBuilder<'p> {
    plugins: &'p PluginRegistry,
    root: Vec<Node>,
    stack: Vec<Frame>,
    marks: Marks,
    saved_marks: Vec<Marks>,
    /// Inline HTML tags carrying marks, with the marks they replaced.
    html_marks: Vec<(&'static str, Marks)>,
    /// One entry per open pulldown-cmark tag: did a plugin claim it?
    claims: Vec<bool>,
    /// Depth of events swallowed by a plugin that produced a void.
    skip: usize,
    code: Option<(Option<SmolStr>, String)>,
    html: Option<String>,
    capture: Option<Capture>,
    in_table_head: bool,
}

impl<'p> TreeBuilder<'p> {
    fn new(plugins: &'p PluginRegistry) -> Self {
        Self {
            plugins,
            root: Vec::new(),
            stack: Vec::new(),
            marks: Marks::default(),
            saved_marks: Vec::new(),
            html_marks: Vec::new(),
            claims: Vec::new(),
            skip: 0,
            code: None,
            html: None,
            capture: None,
            in_table_head: false,
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.stack.is_empty() {
            self.close();
        }
        self.root
    }

    fn event(&mut self, event: Event<'_>) {
        if self.skip > 0 {
            match event {
                Event::Start(_) => self.skip += 1,
                Event::End(_) => self.skip -= 1,
                _ => {}
            }
            return;
        }
        match event {
            Event::Start(tag) => {
                if self.code.is_none() && self.html.is_none() && self.capture.is_none() {
                    if let Some(kind) = self.plugins.convert_tag(&tag) {
                        self.open_claimed(kind);
                        return;
                    }
                }
                self.claims.push(false);
                self.start(tag);
            }
            Event::End(tag) => {
                if self.claims.pop() == Some(true) {
                    self.close_implicit();
                    self.close();
                } else {
                    self.end(tag);
                }
            }
            Event::Text(text) => self.text(&text),
            Event::Code(text) => {
                let marks = Marks {
                    code: true,
                    ..self.marks.clone()
                };
                self.push_inline(Leaf::with_marks(text.to_string(), marks).into());
            }
            Event::Html(html) => {
                if let Some(buf) = &mut self.html {
                    buf.push_str(&html);
                } else {
                    self.inline_html(&html);
                }
            }
            Event::InlineHtml(html) => self.inline_html(&html),
            Event::FootnoteReference(label) => {
                let marks = Marks {
                    footnote: Some(SmolStr::new(&*label)),
                    ..Marks::default()
                };
                self.push_inline(Leaf::with_marks(label.to_string(), marks).into());
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.push_inline(Element::void(ElementKind::Break).into()),
            Event::Rule => {
                self.close_implicit();
                self.push_block(Element::void(ElementKind::HorizontalRule).into());
            }
            Event::TaskListMarker(checked) => {
                if let Some(frame) = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|f| matches!(f.element.kind, ElementKind::ListItem { .. }))
                {
                    frame.element.kind = ElementKind::ListItem {
                        checked: Some(checked),
                    };
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open_block(ElementKind::Paragraph),
            Tag::Heading { level, .. } => self.open_block(ElementKind::Heading {
                level: heading_level(level),
            }),
            Tag::BlockQuote(_) => self.open_block(ElementKind::Blockquote),
            Tag::CodeBlock(kind) => {
                self.close_implicit();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(SmolStr::new),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::HtmlBlock => {
                self.close_implicit();
                self.html = Some(String::new());
            }
            Tag::List(start) => self.open_block(ElementKind::List {
                ordered: start.is_some(),
                start: start.filter(|n| *n != 1),
            }),
            Tag::Item => self.open_block(ElementKind::ListItem { checked: None }),
            Tag::Table(aligns) => self.open_block(ElementKind::Table {
                aligns: aligns.into_iter().map(align).collect(),
            }),
            Tag::TableHead => {
                self.in_table_head = true;
                self.open_block(ElementKind::TableRow);
            }
            Tag::TableRow => self.open_block(ElementKind::TableRow),
            Tag::TableCell => self.open_block(ElementKind::TableCell {
                header: self.in_table_head,
            }),
            Tag::FootnoteDefinition(label) => self.open_block(ElementKind::FootnoteDefinition {
                label: SmolStr::new(&*label),
            }),
            Tag::Emphasis => self.push_marks(|m| m.italic = true),
            Tag::Strong => self.push_marks(|m| m.bold = true),
            Tag::Strikethrough => self.push_marks(|m| m.strikethrough = true),
            Tag::Link { dest_url, .. } => match embed::decode(&dest_url) {
                Some(embed) => {
                    self.capture = Some(Capture::Attachment {
                        embed,
                        text: String::new(),
                    })
                }
                None => {
                    let url = SmolStr::new(&*dest_url);
                    self.push_marks(move |m| m.link = Some(url));
                }
            },
            Tag::Image {
                dest_url, title, ..
            } => {
                self.capture = Some(Capture::Image {
                    url: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.close_implicit();
                self.close_paragraph();
            }
            TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::Table
            | TagEnd::TableRow
            | TagEnd::TableCell
            | TagEnd::FootnoteDefinition => {
                self.close_implicit();
                self.close();
            }
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.close();
            }
            TagEnd::CodeBlock => {
                if let Some((language, text)) = self.code.take() {
                    let text = text.strip_suffix('\n').unwrap_or(&text);
                    self.push_block(Element::code(language.as_deref(), text).into());
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(html) = self.html.take() {
                    self.html_block(html);
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_marks(),
            TagEnd::Link => match self.capture.take() {
                Some(Capture::Attachment { embed, text }) => {
                    let kind = match embed {
                        Embed::Media { .. } => embed.into_kind(text, None),
                        attachment => attachment.into_kind(String::new(), None),
                    };
                    self.push_inline(Element::void(kind).into());
                }
                other => {
                    self.capture = other;
                    self.pop_marks();
                }
            },
            TagEnd::Image => {
                if let Some(Capture::Image { url, title, alt }) = self.capture.take() {
                    let title = (!title.is_empty()).then_some(title);
                    let kind = match embed::decode(&url) {
                        Some(embed) => embed.into_kind(alt, title),
                        None => ElementKind::Media {
                            url: SmolStr::new(url),
                            alt,
                            title,
                            height: None,
                        },
                    };
                    self.push_inline(Element::void(kind).into());
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, buf)) = &mut self.code {
            buf.push_str(text);
            return;
        }
        if let Some(buf) = &mut self.html {
            buf.push_str(text);
            return;
        }
        match &mut self.capture {
            Some(Capture::Image { alt, .. }) => alt.push_str(text),
            Some(Capture::Attachment { text: buf, .. }) => buf.push_str(text),
            None => {
                // pulldown-cmark splits text around escapes and entities.
                if let Some(Node::Leaf(last)) = self
                    .stack
                    .last_mut()
                    .filter(|f| f.element.kind.is_text_block())
                    .and_then(|f| f.element.children.last_mut())
                {
                    if last.marks == self.marks {
                        last.text.push_str(text);
                        return;
                    }
                }
                let leaf = Leaf::with_marks(text, self.marks.clone());
                self.push_inline(leaf.into());
            }
        }
    }

    fn inline_html(&mut self, html: &str) {
        let trimmed = html.trim();
        if is_break_tag(trimmed) {
            self.push_inline(Element::void(ElementKind::Break).into());
            return;
        }
        if let Some(color) = span_color(trimmed) {
            self.html_marks.push(("span", self.marks.clone()));
            self.marks.highlight = Some(color);
            return;
        }
        if let Some(tag) = mark_tag(trimmed) {
            self.html_marks.push((tag, self.marks.clone()));
            apply_mark_tag(tag, &mut self.marks);
            return;
        }
        let closes_open = closing_tag(trimmed)
            .is_some_and(|name| self.html_marks.last().is_some_and(|(tag, _)| *tag == name));
        if closes_open {
            if let Some((_, marks)) = self.html_marks.pop() {
                self.marks = marks;
            }
        } else {
            self.text(html);
        }
    }

    fn html_block(&mut self, html: String) {
        let source = html.trim_end_matches('\n');
        if is_break_tag(source.trim()) {
            self.push_block(
                Element::paragraph(vec![Element::void(ElementKind::Break).into()]).into(),
            );
            return;
        }
        let block = match self.plugins.convert(source) {
            Some(plugin) => plugin,
            None => Element::void(ElementKind::Html {
                source: source.to_string(),
            }),
        };
        self.push_block(Element::card(block).into());
    }

    /// Open an element a plugin produced for a pulldown-cmark tag. A void is
    /// placed whole and the events up to the matching end are dropped;
    /// anything else becomes a frame collecting those events.
    fn open_claimed(&mut self, kind: ElementKind) {
        tracing::trace!(target: "loom::markup", kind = kind.name(), "plugin claimed tag");
        if kind.is_void() {
            let node = Element::void(kind.clone()).into();
            if kind.is_inline() || kind.is_card_payload() {
                self.push_inline(node);
            } else {
                self.close_implicit();
                self.push_block(node);
            }
            self.skip = 1;
            return;
        }
        if kind.is_inline() {
            self.ensure_text_block();
        } else {
            self.close_implicit();
        }
        self.stack.push(Frame {
            element: Element::new(kind, Vec::new()),
            implicit: false,
        });
        self.claims.push(true);
    }

    fn push_marks(&mut self, apply: impl FnOnce(&mut Marks)) {
        self.saved_marks.push(self.marks.clone());
        apply(&mut self.marks);
    }

    fn pop_marks(&mut self) {
        if let Some(marks) = self.saved_marks.pop() {
            self.marks = marks;
        }
    }

    fn open_block(&mut self, kind: ElementKind) {
        self.close_implicit();
        self.stack.push(Frame {
            element: Element::new(kind, Vec::new()),
            implicit: false,
        });
    }

    fn close_implicit(&mut self) {
        if self.stack.last().is_some_and(|f| f.implicit) {
            self.close_paragraph();
        }
    }

    fn close(&mut self) {
        if let Some(frame) = self.stack.pop() {
            self.push_block(frame.element.into());
        }
    }

    /// Close a paragraph frame, hoisting a paragraph made only of embeds into
    /// card blocks.
    fn close_paragraph(&mut self) {
        let Some(frame) = self.stack.pop() else { return };
        let para = frame.element;
        if para.is_embeds_only() {
            for node in para.children {
                if let Node::Element(el) = node {
                    self.push_block(Element::card(el).into());
                }
            }
        } else {
            self.push_block(para.into());
        }
    }

    fn push_block(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.element.children.push(node),
            None => self.root.push(node),
        }
    }

    /// Open an implicit paragraph unless inline content already has a home.
    fn ensure_text_block(&mut self) {
        let needs_paragraph = self
            .stack
            .last()
            .is_none_or(|f| !f.element.kind.is_text_block() && !f.element.kind.is_inline());
        if needs_paragraph {
            self.stack.push(Frame {
                element: Element::new(ElementKind::Paragraph, Vec::new()),
                implicit: true,
            });
        }
    }

    fn push_inline(&mut self, node: Node) {
        self.ensure_text_block();
        if let Some(frame) = self.stack.last_mut() {
            frame.element.children.push(node);
        }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn align(alignment: Alignment) -> Align {
    match alignment {
        Alignment::None => Align::None,
        Alignment::Left => Align::Left,
        Alignment::Center => Align::Center,
        Alignment::Right => Align::Right,
    }
}

/// Emphasis written as an HTML tag, where delimiter runs would not parse.
fn mark_tag(html: &str) -> Option<&'static str> {
    match html.to_ascii_lowercase().as_str() {
        "<strong>" => Some("strong"),
        "<b>" => Some("b"),
        "<em>" => Some("em"),
        "<i>" => Some("i"),
        "<del>" => Some("del"),
        "<s>" => Some("s"),
        _ => None,
    }
}

fn apply_mark_tag(tag: &str, marks: &mut Marks) {
    match tag {
        "strong" | "b" => marks.bold = true,
        "em" | "i" => marks.italic = true,
        _ => marks.strikethrough = true,
    }
}

/// Name of a closing tag such as `</em>`, lowercased.
fn closing_tag(html: &str) -> Option<String> {
    let name = html.strip_prefix("</")?.strip_suffix('>')?.trim();
    (!name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| name.to_ascii_lowercase())
}

fn is_break_tag(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    matches!(lower.as_str(), "<br>" | "<br/>" | "<br />")
}

/// Colour of a `<span style="color: …">` opening tag.
fn span_color(html: &str) -> Option<SmolStr> {
    let lower = html.to_ascii_lowercase();
    if !lower.starts_with("<span") || !html.ends_with('>') || html.starts_with("</") {
        return None;
    }
    let style_at = lower.find("style=")?;
    let rest = &html[style_at + "style=".len()..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = rest[1..].split(quote).next()?;
    body.split(';').find_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        (prop.trim().eq_ignore_ascii_case("color") && !value.trim().is_empty())
            .then(|| SmolStr::new(value.trim()))
    })
}
