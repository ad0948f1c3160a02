//! Document tree to markup text.
//!
//! Each block kind has its own printer; blocks are joined by blank lines.
//! Registered plugins get the first chance at every element. Marks are opened
//! in a fixed order (link, bold, italic, strikethrough, highlight) and closed
//! innermost first, with inline code always innermost, so equal mark sets
//! always print the same way. Emphasis whose delimiters would not be read
//! back as delimiters (punctuation inside next to a word outside) prints as
//! HTML tags instead.

use super::embed;
use super::plugin::PluginRegistry;
use crate::document::{Align, Document, Element, ElementKind, Leaf, Marks, Node};
use crate::text_helpers::split_outer_whitespace;

/// Printer options.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Bullet used for unordered lists (`-` or `*`).
    pub bullet: char,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self { bullet: '-' }
    }
}

pub struct Serializer<'a> {
    options: &'a SerializeOptions,
    plugins: &'a PluginRegistry,
}

impl<'a> Serializer<'a> {
    pub fn new(options: &'a SerializeOptions, plugins: &'a PluginRegistry) -> Self {
        Self { options, plugins }
    }

    pub fn document(&self, doc: &Document) -> String {
        self.blocks(doc.children())
    }

    /// Print a run of sibling blocks separated by blank lines.
    pub fn blocks(&self, nodes: &[Node]) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(nodes.len());
        let mut alternate = false;
        let mut prev_list: Option<bool> = None;
        for node in nodes {
            let Node::Element(el) = node else {
                parts.push(escape_block_start(&self.inline(std::slice::from_ref(node))));
                continue;
            };
            // Two adjacent lists of the same kind would merge on reparse.
            if let ElementKind::List { ordered, .. } = el.kind {
                alternate = prev_list == Some(ordered) && !alternate;
                prev_list = Some(ordered);
            } else if !(el.kind == ElementKind::Paragraph && el.is_blank()) {
                prev_list = None;
                alternate = false;
            }
            let printed = self.block(el, alternate);
            if !printed.is_empty() {
                parts.push(printed);
            }
        }
        parts.join("\n\n")
    }

    fn block(&self, el: &Element, alternate: bool) -> String {
        if let Some(printed) = self.plugins.serialize(el) {
            return printed;
        }
        match &el.kind {
            ElementKind::Paragraph => escape_block_start(self.inline(&el.children).trim()),
            ElementKind::Heading { level } => {
                let text = self.inline(&el.children);
                let text = text.trim();
                let hashes = "#".repeat((*level).clamp(1, 6) as usize);
                if text.is_empty() {
                    hashes
                } else {
                    format!("{hashes} {text}")
                }
            }
            ElementKind::Blockquote => prefix_lines(&self.blocks(&el.children), "> ", ">"),
            ElementKind::List { ordered, start } => {
                self.list(&el.children, *ordered, start.unwrap_or(1), alternate)
            }
            ElementKind::ListItem { checked } => self.list_item(el, "- ", *checked),
            ElementKind::Table { aligns } => self.table(el, aligns),
            ElementKind::Code { language, .. } => {
                let lines: Vec<String> = el.children.iter().map(Node::text).collect();
                let body = lines.join("\n");
                let fence = code_fence(&body);
                format!(
                    "{fence}{}\n{body}\n{fence}",
                    language.as_deref().unwrap_or_default()
                )
            }
            ElementKind::HorizontalRule => "---".to_string(),
            ElementKind::Card => el
                .card_payload()
                .map(|payload| self.void(payload))
                .unwrap_or_default(),
            ElementKind::Media { .. }
            | ElementKind::Attachment { .. }
            | ElementKind::Html { .. }
            | ElementKind::Plugin { .. } => self.void(el),
            ElementKind::FootnoteDefinition { label } => {
                let body = self.blocks(&el.children);
                let mut out = format!("[^{label}]: ");
                push_indented(&mut out, &body, "    ");
                out
            }
            ElementKind::TableRow
            | ElementKind::TableCell { .. }
            | ElementKind::CodeLine
            | ElementKind::Break
            | ElementKind::Placeholder { .. }
            | ElementKind::CardBefore
            | ElementKind::CardAfter => self.inline(std::slice::from_ref(&Node::from(el.clone()))),
        }
    }

    fn list(&self, items: &[Node], ordered: bool, start: u64, alternate: bool) -> String {
        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let Some(item) = item.as_element() else { continue };
            let checked = match item.kind {
                ElementKind::ListItem { checked } => checked,
                _ => None,
            };
            let marker = if ordered {
                let delim = if alternate { ')' } else { '.' };
                format!("{}{delim} ", start + idx as u64)
            } else {
                let bullet = match (self.options.bullet, alternate) {
                    ('*', false) | ('-', true) => '*',
                    (_, true) => '-',
                    (bullet, false) => bullet,
                };
                format!("{bullet} ")
            };
            out.push(self.list_item(item, &marker, checked));
        }
        out.join("\n")
    }

    fn list_item(&self, item: &Element, marker: &str, checked: Option<bool>) -> String {
        let mut body = String::new();
        for (idx, child) in item.children.iter().enumerate() {
            if idx > 0 {
                let nested_list = matches!(child.kind(), Some(ElementKind::List { .. }));
                body.push_str(if nested_list { "\n" } else { "\n\n" });
            }
            body.push_str(&self.blocks(std::slice::from_ref(child)));
        }
        let task = match checked {
            Some(true) => "[x] ",
            Some(false) => "[ ] ",
            None => "",
        };
        let indent = " ".repeat(marker.chars().count());
        let mut out = format!("{marker}{task}");
        push_indented(&mut out, &body, &indent);
        out.trim_end().to_string()
    }

    fn table(&self, table: &Element, aligns: &[Align]) -> String {
        let rows: Vec<Vec<String>> = table
            .children
            .iter()
            .map(|row| {
                row.children()
                    .iter()
                    .map(|cell| self.inline(cell.children()).trim().to_string())
                    .collect()
            })
            .collect();
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut out = Vec::with_capacity(rows.len() + 1);
        for (idx, row) in rows.iter().enumerate() {
            let mut cells = row.clone();
            cells.resize(columns, String::new());
            out.push(format!("| {} |", cells.join(" | ")));
            if idx == 0 {
                let seps: Vec<&str> = (0..columns)
                    .map(|col| match aligns.get(col).copied().unwrap_or_default() {
                        Align::None => "---",
                        Align::Left => ":---",
                        Align::Center => ":---:",
                        Align::Right => "---:",
                    })
                    .collect();
                out.push(format!("| {} |", seps.join(" | ")));
            }
        }
        out.join("\n")
    }

    /// Print a block-level void payload.
    fn void(&self, el: &Element) -> String {
        if let Some(printed) = self.plugins.serialize(el) {
            return printed;
        }
        match &el.kind {
            ElementKind::Html { source } | ElementKind::Plugin { source, .. } => source.clone(),
            _ => inline_void(&el.kind),
        }
    }

    /// Print the children of a text block.
    pub fn inline(&self, nodes: &[Node]) -> String {
        let mut printer = InlinePrinter::default();
        for node in nodes {
            match node {
                Node::Leaf(leaf) => printer.leaf(leaf),
                Node::Element(el) => match (self.plugins.serialize(el), &el.kind) {
                    (Some(printed), _) => printer.raw(&printed),
                    (None, ElementKind::Placeholder { .. }) => {
                        for leaf in el.children.iter().filter_map(Node::as_leaf) {
                            printer.leaf(leaf);
                        }
                    }
                    (None, kind) => printer.raw(&inline_void(kind)),
                },
            }
        }
        printer.finish()
    }
}

/// Print a void as inline markup.
fn inline_void(kind: &ElementKind) -> String {
    match kind {
        ElementKind::Break => "<br/>".to_string(),
        ElementKind::Media {
            url,
            alt,
            title,
            height,
        } => {
            let dest = match height {
                Some(h) => embed::encode_media(url, Some(*h)),
                None => url.to_string(),
            };
            let title = title
                .as_ref()
                .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
                .unwrap_or_default();
            format!("![{}]({}{title})", escape_text(alt), destination(&dest))
        }
        ElementKind::Attachment { url, name, size } => format!(
            "[{}]({})",
            escape_text(name),
            embed::encode_attachment(url, name, *size)
        ),
        ElementKind::HorizontalRule => "---".to_string(),
        _ => String::new(),
    }
}

fn destination(url: &str) -> String {
    if url.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

/// Mark-stack printer for a run of leaves.
#[derive(Default)]
struct InlinePrinter {
    out: String,
    open: Vec<Opened>,
    pending_ws: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OpenMark {
    Link(String),
    Bold,
    Italic,
    Strike,
    Highlight(String),
}

/// A mark whose opener has been written.
#[derive(Debug)]
struct Opened {
    mark: OpenMark,
    /// Byte offset of the opener in the output.
    at: usize,
    /// Printed as an HTML tag rather than a delimiter run.
    html: bool,
}

impl OpenMark {
    /// Delimiter run for emphasis marks.
    fn delimiter(&self) -> Option<&'static str> {
        match self {
            OpenMark::Bold => Some("**"),
            OpenMark::Italic => Some("*"),
            OpenMark::Strike => Some("~~"),
            OpenMark::Link(_) | OpenMark::Highlight(_) => None,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            OpenMark::Bold => "strong",
            OpenMark::Italic => "em",
            _ => "del",
        }
    }

    fn opener(&self, html: bool) -> String {
        match self {
            OpenMark::Link(_) => "[".to_string(),
            OpenMark::Highlight(color) => format!("<span style=\"color:{color}\">"),
            mark if html => format!("<{}>", mark.tag()),
            mark => mark.delimiter().unwrap_or_default().to_string(),
        }
    }

    fn closer(&self, html: bool) -> String {
        match self {
            OpenMark::Link(url) => format!("]({})", destination(url)),
            OpenMark::Highlight(_) => "</span>".to_string(),
            mark if html => format!("</{}>", mark.tag()),
            mark => mark.delimiter().unwrap_or_default().to_string(),
        }
    }
}

/// Marks of a leaf in canonical print order.
fn ordered_marks(marks: &Marks) -> Vec<OpenMark> {
    let mut out = Vec::new();
    if let Some(link) = &marks.link {
        out.push(OpenMark::Link(link.to_string()));
    }
    if marks.bold {
        out.push(OpenMark::Bold);
    }
    if marks.italic {
        out.push(OpenMark::Italic);
    }
    if marks.strikethrough {
        out.push(OpenMark::Strike);
    }
    if let Some(color) = &marks.highlight {
        out.push(OpenMark::Highlight(color.to_string()));
    }
    out
}

/// Punctuation in the CommonMark flanking sense: anything that is neither a
/// word character nor whitespace.
fn is_punct(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

/// Can a delimiter run open emphasis between `before` and `after`?
fn left_flanking(before: Option<char>, after: char) -> bool {
    let open_before = before.is_none_or(|c| c.is_whitespace() || is_punct(c));
    !after.is_whitespace() && (!is_punct(after) || open_before)
}

/// Can a delimiter run close emphasis between `before` and `after`?
fn right_flanking(before: Option<char>, after: Option<char>) -> bool {
    let Some(before) = before else { return false };
    let open_after = after.is_none_or(|c| c.is_whitespace() || is_punct(c));
    !before.is_whitespace() && (!is_punct(before) || open_after)
}

impl InlinePrinter {
    fn leaf(&mut self, leaf: &Leaf) {
        if leaf.text.is_empty() {
            return;
        }
        if let Some(label) = &leaf.marks.footnote {
            self.raw(&format!("[^{label}]"));
            return;
        }
        let (lead, core, trail) = split_outer_whitespace(&leaf.text);
        if core.is_empty() {
            self.pending_ws.push_str(lead);
            return;
        }
        let wanted = ordered_marks(&leaf.marks);
        let keep = self.kept(&wanted);
        let first = if leaf.marks.code { Some('`') } else { core.chars().next() };
        // Whatever follows the closers: whitespace, a new opener or the text.
        let after = if !self.pending_ws.is_empty() || !lead.is_empty() {
            Some(' ')
        } else if wanted.len() > keep {
            Some('[')
        } else {
            first
        };
        self.close_from(keep, after);
        self.flush_ws();
        self.out.push_str(&escape_text(lead));
        let last = wanted.len().saturating_sub(1);
        for (idx, mark) in wanted.iter().enumerate().skip(keep) {
            let before = self.out.chars().next_back();
            let html = match mark.delimiter() {
                Some(delim) => {
                    let next = if idx == last { first.unwrap_or(' ') } else { '<' };
                    let merges = idx == keep && delim.chars().next() == before;
                    merges || !left_flanking(before, next)
                }
                None => false,
            };
            if matches!(mark, OpenMark::Link(_)) {
                self.escape_trailing_bang();
            }
            self.open.push(Opened {
                mark: mark.clone(),
                at: self.out.len(),
                html,
            });
            self.out.push_str(&mark.opener(html));
        }
        if leaf.marks.code {
            self.out.push_str(&code_span(core));
        } else {
            self.out.push_str(&escape_text(core));
        }
        self.pending_ws.push_str(trail);
    }

    /// Print markup that sits outside every mark (voids, footnote refs).
    fn raw(&mut self, text: &str) {
        let after = if self.pending_ws.is_empty() {
            text.chars().next()
        } else {
            Some(' ')
        };
        self.close_from(0, after);
        self.flush_ws();
        if text.starts_with('[') {
            self.escape_trailing_bang();
        }
        self.out.push_str(text);
    }

    /// How many open marks are a prefix of `wanted`.
    fn kept(&self, wanted: &[OpenMark]) -> usize {
        self.open
            .iter()
            .zip(wanted)
            .take_while(|(open, want)| open.mark == **want)
            .count()
    }

    /// Close open marks down to `keep`. `after` is the first character that
    /// will follow the outermost closer.
    fn close_from(&mut self, keep: usize, after: Option<char>) {
        while self.open.len() > keep {
            let Some(mut opened) = self.open.pop() else { break };
            // Inner closers are followed by the next closer, never a word.
            let next = if self.open.len() > keep { Some('*') } else { after };
            let before = self.out.chars().next_back();
            if let Some(delim) = opened.mark.delimiter() {
                if !opened.html && !right_flanking(before, next) {
                    let tag = opened.mark.opener(true);
                    self.out.replace_range(opened.at..opened.at + delim.len(), &tag);
                    opened.html = true;
                }
            }
            self.out.push_str(&opened.mark.closer(opened.html));
        }
    }

    /// A `!` right before `[` would turn the bracket into an image.
    fn escape_trailing_bang(&mut self) {
        let Some(body) = self.out.strip_suffix('!') else {
            return;
        };
        let slashes = body.chars().rev().take_while(|c| *c == '\\').count();
        if slashes % 2 == 0 {
            let at = self.out.len() - 1;
            self.out.insert(at, '\\');
        }
    }

    fn flush_ws(&mut self) {
        if !self.pending_ws.is_empty() {
            let ws = std::mem::take(&mut self.pending_ws);
            self.out.push_str(&escape_text(&ws));
        }
    }

    fn finish(mut self) -> String {
        let after = (!self.pending_ws.is_empty()).then_some(' ');
        self.close_from(0, after);
        self.flush_ws();
        self.out
    }
}

/// Backslash-escape markup punctuation in plain text.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' | '*' | '_' | '`' | '[' | ']' | '~' | '<' | '|' | '#' => {
                out.push('\\');
                out.push(ch);
            }
            // Only an entity-looking ampersand needs escaping.
            '&' if chars.peek().is_some_and(|c| c.is_ascii_alphanumeric() || *c == '#') => {
                out.push_str("\\&");
            }
            '\n' => out.push_str("<br/>"),
            _ => out.push(ch),
        }
    }
    escape_line_start(out)
}

/// Escape a block marker at the start of a printed paragraph. Runs on the
/// whole paragraph because the marker may span several leaves.
fn escape_block_start(printed: &str) -> String {
    escape_line_start(printed.to_string())
}

/// Escape list and numbered markers that would start a block.
fn escape_line_start(text: String) -> String {
    let trimmed = text.trim_start();
    let lead = text.len() - trimmed.len();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some('-' | '+' | '=' | '>') => format!("{}\\{}", &text[..lead], trimmed),
        Some(c) if c.is_ascii_digit() => {
            let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
            match trimmed[digits..].chars().next() {
                Some('.' | ')') => format!(
                    "{}{}\\{}",
                    &text[..lead],
                    &trimmed[..digits],
                    &trimmed[digits..]
                ),
                _ => text,
            }
        }
        _ => text,
    }
}

fn code_span(text: &str) -> String {
    let longest = longest_run(text, '`');
    let ticks = "`".repeat(longest + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{ticks} {text} {ticks}")
    } else {
        format!("{ticks}{text}{ticks}")
    }
}

fn code_fence(body: &str) -> String {
    let longest = body
        .lines()
        .map(|line| longest_run(line.trim_start(), '`'))
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut best = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == ch {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

fn prefix_lines(text: &str, prefix: &str, empty: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                empty.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Append `body` to `out`, indenting every line after the first.
fn push_indented(out: &mut String, body: &str, indent: &str) {
    for (idx, line) in body.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(line);
    }
}
