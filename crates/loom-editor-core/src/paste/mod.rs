//! Paste routing.
//!
//! Exactly one insertion path runs per paste, tried in a fixed priority:
//! structured fragment, rich HTML, files, private markup, plain text. A kind
//! is only tried when the clipboard carries it and the configuration allows
//! it. Malformed fragments and failed imports fall through to the next kind;
//! failed uploads drop that file and leave a [`Notice`] for the user.

pub mod classify;
pub mod clipboard;
pub mod fragment;
pub mod services;

pub use classify::{MarkupSignal, PlainContent, classify_plain, markup_signal};
pub use clipboard::{ClipboardFile, ClipboardPayload, PayloadKind};
pub use fragment::Fragment;
pub use services::{NoImport, NoUpload, RichImporter, UploadService};

use smol_str::SmolStr;

use crate::config::PasteConfig;
use crate::document::{Document, Element, ElementKind, InsertTarget, Leaf, Marks, Node, Path, Result};
use crate::error::DocumentError;
use crate::handlers::{defaults, select_card};
use crate::markup::{self, PluginRegistry, embed};
use crate::types::{Point, Selection};

/// A short user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What a paste did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    /// Content from `kind` was inserted and the caret moved here.
    Inserted { kind: PayloadKind, selection: Selection },
    /// Nothing applicable; the host should run its own paste.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteReport {
    pub outcome: PasteOutcome,
    pub notices: Vec<Notice>,
}

/// Everything the router needs besides the document and the clipboard.
pub struct Paster<'a, U, I> {
    pub config: &'a PasteConfig,
    pub plugins: &'a PluginRegistry,
    pub upload: &'a U,
    pub importer: &'a I,
}

impl<'a, U: UploadService, I: RichImporter> Paster<'a, U, I> {
    pub fn new(
        config: &'a PasteConfig,
        plugins: &'a PluginRegistry,
        upload: &'a U,
        importer: &'a I,
    ) -> Self {
        Self {
            config,
            plugins,
            upload,
            importer,
        }
    }

    fn offered(&self, payload: &ClipboardPayload, kind: PayloadKind) -> bool {
        payload.has(kind) && self.config.allows(kind)
    }

    /// Route `payload` into `doc` at `selection`. The document only changes
    /// when something is inserted.
    pub async fn paste(
        &self,
        doc: &mut Document,
        selection: &Selection,
        payload: &ClipboardPayload,
    ) -> PasteReport {
        let mut notices = Vec::new();
        let outcome = match self.route(doc, selection, payload, &mut notices).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(target: "loom::paste", error = %err, "unmodeled shape, default paste");
                PasteOutcome::Default
            }
        };
        PasteReport { outcome, notices }
    }

    async fn route(
        &self,
        doc: &mut Document,
        selection: &Selection,
        payload: &ClipboardPayload,
        notices: &mut Vec<Notice>,
    ) -> Result<PasteOutcome> {
        if !doc.is_valid_selection(selection) {
            return Ok(PasteOutcome::Default);
        }
        let mut draft = doc.clone();

        // A placeholder under the caret takes text only.
        if in_placeholder(&draft, &selection.focus.path) {
            let Some(text) = payload.text() else {
                return Ok(PasteOutcome::Default);
            };
            let point = defaults::delete_selection(&mut draft, selection)?;
            let single_line = text.replace('\n', " ");
            let end = draft.insert_text(&point, &single_line)?;
            return Ok(commit(doc, draft, PayloadKind::Plain, Selection::collapsed(end)));
        }

        let point = defaults::delete_selection(&mut draft, selection)?;

        if self.offered(payload, PayloadKind::Fragment) {
            let json = payload.fragment.as_deref().unwrap_or_default();
            match Fragment::from_json(json) {
                Ok(fragment) => {
                    let caret = insert_blocks(&mut draft, &point, fragment.nodes)?;
                    return Ok(commit(doc, draft, PayloadKind::Fragment, caret));
                }
                Err(err) => {
                    tracing::debug!(target: "loom::paste", error = %err, "fragment rejected, trying next kind");
                }
            }
        }

        if self.offered(payload, PayloadKind::Html) {
            let html = payload.html.as_deref().unwrap_or_default();
            match self.importer.import(html, payload.rtf.as_deref()).await {
                Ok(nodes) => {
                    let nodes = self.resolve_media(nodes, &payload.files, notices).await;
                    let caret = insert_blocks(&mut draft, &point, nodes)?;
                    return Ok(commit(doc, draft, PayloadKind::Html, caret));
                }
                Err(err) => {
                    tracing::debug!(target: "loom::paste", error = %err, "import failed, trying next kind");
                }
            }
        }

        if self.offered(payload, PayloadKind::Files) {
            let mut caret = Selection::collapsed(point.clone());
            let mut inserted = 0;
            for file in &payload.files {
                let url = match self.upload_one(file).await {
                    Ok(url) => url,
                    Err(message) => {
                        notices.push(Notice::new(message));
                        continue;
                    }
                };
                let kind = file_kind(file, url);
                caret = insert_void(&mut draft, &caret.focus, kind)?;
                draft.normalize();
                caret = draft.clamp_selection(&caret);
                inserted += 1;
            }
            if inserted > 0 {
                return Ok(commit(doc, draft, PayloadKind::Files, caret));
            }
        }

        if self.offered(payload, PayloadKind::Markup) {
            let source = payload.markup.as_deref().unwrap_or_default();
            let caret = if is_literal_context(&draft, &point.path) {
                insert_literal(&mut draft, &point, source)?
            } else {
                insert_blocks(&mut draft, &point, markup::parse_fragment(source, self.plugins))?
            };
            return Ok(commit(doc, draft, PayloadKind::Markup, caret));
        }

        if self.offered(payload, PayloadKind::Plain) {
            let text = payload.plain.as_deref().unwrap_or_default();
            let caret = self.insert_plain(&mut draft, &point, text)?;
            return Ok(commit(doc, draft, PayloadKind::Plain, caret));
        }

        Ok(PasteOutcome::Default)
    }

    fn insert_plain(&self, doc: &mut Document, point: &Point, text: &str) -> Result<Selection> {
        if is_literal_context(doc, &point.path) {
            return insert_literal(doc, point, text);
        }
        match classify_plain(text) {
            PlainContent::Embed(embed) => insert_void(doc, point, embed.into_kind(String::new(), None)),
            PlainContent::MediaUrl(url) => insert_void(doc, point, media(&url, String::new())),
            PlainContent::Link(url) => {
                let leaf = Leaf::with_marks(url.clone(), Marks::link(url));
                insert_blocks(doc, point, vec![Element::paragraph(vec![leaf.into()]).into()])
            }
            PlainContent::Markup(_) => {
                insert_blocks(doc, point, markup::parse_fragment(text, self.plugins))
            }
            PlainContent::Text => {
                let paragraphs = text
                    .split('\n')
                    .map(|line| Element::text_paragraph(line).into())
                    .collect();
                insert_blocks(doc, point, paragraphs)
            }
        }
    }

    async fn upload_one(&self, file: &ClipboardFile) -> std::result::Result<String, String> {
        match self.upload.upload(std::slice::from_ref(file)).await {
            Ok(urls) => urls
                .into_iter()
                .next()
                .ok_or_else(|| format!("Upload of {} returned no URL", file.name)),
            Err(err) => {
                tracing::warn!(target: "loom::paste", file = %file.name, error = %err, "upload failed");
                Err(format!("Could not upload {}: {err}", file.name))
            }
        }
    }

    /// Upload local and `blob:`/`data:` media found in imported nodes,
    /// matching them to clipboard files by name and then by order. Media that
    /// cannot be resolved is dropped.
    async fn resolve_media(
        &self,
        nodes: Vec<Node>,
        files: &[ClipboardFile],
        notices: &mut Vec<Notice>,
    ) -> Vec<Node> {
        let mut pending = Vec::new();
        collect_local_media(&nodes, &Path::root(), &mut pending);
        if pending.is_empty() {
            return nodes;
        }

        let mut doc_nodes = nodes;
        let mut used = vec![false; files.len()];
        let mut dropped = Vec::new();
        for (path, url) in pending {
            let name = embed::file_name(&url);
            let file = files
                .iter()
                .enumerate()
                .find(|(idx, f)| !used[*idx] && f.name == name)
                .or_else(|| files.iter().enumerate().find(|(idx, f)| !used[*idx] && f.is_media()));
            let resolved = match file {
                Some((idx, file)) => {
                    used[idx] = true;
                    match self.upload_one(file).await {
                        Ok(uploaded) => Some(uploaded),
                        Err(message) => {
                            notices.push(Notice::new(message));
                            None
                        }
                    }
                }
                // A plain local path survives; blob and data URLs do not.
                None if !is_transient(&url) => continue,
                None => {
                    notices.push(Notice::new(format!("Could not resolve image {name}")));
                    None
                }
            };
            match resolved {
                Some(uploaded) => set_url(&mut doc_nodes, &path, uploaded),
                None => dropped.push(path),
            }
        }
        // Later paths first so earlier removals do not shift them.
        for path in dropped.iter().rev() {
            remove_at(&mut doc_nodes, path);
        }
        doc_nodes
    }
}

fn commit(doc: &mut Document, mut draft: Document, kind: PayloadKind, caret: Selection) -> PasteOutcome {
    draft.normalize();
    let selection = draft.clamp_selection(&caret);
    tracing::debug!(target: "loom::paste", kind = ?kind, "pasted");
    *doc = draft;
    PasteOutcome::Inserted { kind, selection }
}

fn in_placeholder(doc: &Document, path: &Path) -> bool {
    doc.closest(path, |k| matches!(k, ElementKind::Placeholder { .. }))
        .is_some()
}

/// Code lines, table cells and placeholders only take literal text.
fn is_literal_context(doc: &Document, path: &Path) -> bool {
    doc.closest(path, ElementKind::is_literal).is_some()
}

/// Insert `text` verbatim. Code keeps its newlines; elsewhere they become
/// spaces.
fn insert_literal(doc: &mut Document, point: &Point, text: &str) -> Result<Selection> {
    let in_code = doc
        .text_block(&point.path)
        .and_then(|block| doc.kind(&block))
        == Some(&ElementKind::CodeLine);
    if in_code {
        defaults::text_at(doc, point, text)
    } else {
        defaults::text_at(doc, point, &text.replace("\r\n", " ").replace('\n', " "))
    }
}

fn media(url: &str, alt: String) -> ElementKind {
    ElementKind::Media {
        url: SmolStr::new(url),
        alt,
        title: None,
        height: None,
    }
}

fn file_kind(file: &ClipboardFile, url: String) -> ElementKind {
    if file.is_media() {
        media(&url, file.name.clone())
    } else {
        ElementKind::Attachment {
            url: url.into(),
            name: file.name.clone(),
            size: file.size(),
        }
    }
}

fn is_transient(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("blob:") || lower.starts_with("data:")
}

/// Insert a void at the media insertion point for `point`: a card between
/// blocks, or an inline void at the end of a table cell.
pub(crate) fn insert_void(doc: &mut Document, point: &Point, kind: ElementKind) -> Result<Selection> {
    match doc.find_media_insert_path(&point.path) {
        Some(InsertTarget::Inline(at)) => {
            doc.insert_node(&at, Element::void(kind).into())?;
            let after = at
                .next()
                .ok_or_else(|| DocumentError::InvalidPath(at.clone()))?;
            doc.insert_node(&after, Leaf::empty().into())?;
            Ok(Selection::caret(after, 0))
        }
        Some(InsertTarget::Block(at)) => {
            // An empty paragraph is replaced rather than pushed down.
            let replaces_blank = doc.kind(&at) == Some(&ElementKind::Paragraph)
                && doc.element(&at).is_some_and(Element::is_blank);
            doc.insert_node(&at, Element::card(Element::void(kind)).into())?;
            if replaces_blank {
                let blank = at
                    .next()
                    .ok_or_else(|| DocumentError::InvalidPath(at.clone()))?;
                doc.remove_node(&blank)?;
            }
            Ok(select_card(&at))
        }
        None => Err(DocumentError::unsupported("place media", &point.path)),
    }
}

/// Splice block nodes in at `point`.
///
/// Literal targets get the text only. A single paragraph is spliced inline.
/// A list pasted into a list item contributes its items as siblings. Other
/// content splits the current text block and goes between both halves;
/// halves left empty are removed.
pub(crate) fn insert_blocks(doc: &mut Document, point: &Point, nodes: Vec<Node>) -> Result<Selection> {
    let nodes = Document::from_nodes(nodes).into_children();
    if nodes.iter().all(|n| n.as_element().is_some_and(Element::is_blank)) {
        return Ok(Selection::collapsed(point.clone()));
    }
    let point = defaults::writable_point(doc, point)?;
    if is_literal_context(doc, &point.path) {
        return insert_literal(doc, &point, &fragment::plain_text(&nodes));
    }
    let block = doc
        .text_block(&point.path)
        .ok_or_else(|| DocumentError::InvalidPath(point.path.clone()))?;

    if let [Node::Element(only)] = nodes.as_slice() {
        if only.kind == ElementKind::Paragraph {
            return splice_inline(doc, &point, only.children.clone());
        }
    }

    let item = block
        .parent()
        .filter(|p| matches!(doc.kind(p), Some(ElementKind::ListItem { .. })));
    if let (Some(item), [Node::Element(list)]) = (item, nodes.as_slice()) {
        if matches!(list.kind, ElementKind::List { .. }) {
            return splice_items(doc, &item, list.children.clone());
        }
    }

    let second = doc.split_at_point(&point, &block)?;
    let count = nodes.len();
    doc.insert_nodes(&second, nodes)?;
    let mut last = block.clone();
    for _ in 0..count {
        last = last
            .next()
            .ok_or_else(|| DocumentError::InvalidPath(last.clone()))?;
    }
    let tail = last
        .next()
        .ok_or_else(|| DocumentError::InvalidPath(last.clone()))?;
    if doc.element(&tail).is_some_and(Element::is_blank) {
        doc.remove_node(&tail)?;
    }
    if doc.element(&block).is_some_and(Element::is_blank) {
        doc.remove_node(&block)?;
        last = last.transform_remove(&block).unwrap_or(last);
    }
    doc.end_point(&last)
        .map(Selection::collapsed)
        .ok_or(DocumentError::InvalidPath(last))
}

fn splice_inline(doc: &mut Document, point: &Point, children: Vec<Node>) -> Result<Selection> {
    let count = children.len();
    doc.split_node(&point.path, point.offset)?;
    let at = point
        .path
        .next()
        .ok_or_else(|| DocumentError::InvalidPath(point.path.clone()))?;
    let after = doc.insert_nodes(&at, children)?;
    if count == 0 {
        return Ok(Selection::caret(after, 0));
    }
    let last = after
        .previous()
        .ok_or_else(|| DocumentError::InvalidPath(after.clone()))?;
    match doc.leaf(&last) {
        Some(leaf) => Ok(Selection::caret(last.clone(), leaf.len())),
        None => Ok(Selection::caret(after, 0)),
    }
}

fn splice_items(doc: &mut Document, item: &Path, items: Vec<Node>) -> Result<Selection> {
    let blank = doc.element(item).is_some_and(Element::is_blank);
    let at = item
        .next()
        .ok_or_else(|| DocumentError::InvalidPath(item.clone()))?;
    let after = doc.insert_nodes(&at, items)?;
    let mut last = after
        .previous()
        .ok_or_else(|| DocumentError::InvalidPath(after.clone()))?;
    if blank {
        doc.remove_node(item)?;
        last = last.transform_remove(item).unwrap_or(last);
    }
    doc.end_point(&last)
        .map(Selection::collapsed)
        .ok_or(DocumentError::InvalidPath(last))
}

fn collect_local_media(nodes: &[Node], parent: &Path, out: &mut Vec<(Path, String)>) {
    for (idx, node) in nodes.iter().enumerate() {
        let Node::Element(el) = node else { continue };
        let path = parent.child(idx);
        match &el.kind {
            ElementKind::Media { url, .. } if !embed::is_network_url(url) => {
                out.push((path, url.to_string()))
            }
            _ => collect_local_media(&el.children, &path, out),
        }
    }
}

fn node_at_mut<'n>(nodes: &'n mut [Node], path: &Path) -> Option<&'n mut Node> {
    let (first, rest) = path.as_slice().split_first()?;
    let mut node = nodes.get_mut(*first)?;
    for idx in rest {
        node = node.as_element_mut()?.children.get_mut(*idx)?;
    }
    Some(node)
}

fn set_url(nodes: &mut [Node], path: &Path, uploaded: String) {
    if let Some(ElementKind::Media { url, .. }) = node_at_mut(nodes, path)
        .and_then(Node::as_element_mut)
        .map(|el| &mut el.kind)
    {
        *url = uploaded.into();
    }
}

fn remove_at(nodes: &mut Vec<Node>, path: &Path) {
    let Some(idx) = path.last() else { return };
    match path.parent() {
        Some(parent) if !parent.is_root() => {
            if let Some(el) = node_at_mut(nodes, &parent).and_then(Node::as_element_mut) {
                if idx < el.children.len() {
                    el.children.remove(idx);
                }
            }
        }
        _ => {
            if idx < nodes.len() {
                nodes.remove(idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ImportError, UploadError};

    /// Uploads succeed unless the file name is listed in `fail`.
    #[derive(Default)]
    struct Uploads {
        fail: Vec<&'static str>,
    }

    impl UploadService for Uploads {
        async fn upload(&self, files: &[ClipboardFile]) -> std::result::Result<Vec<String>, UploadError> {
            if files.iter().any(|f| self.fail.contains(&f.name.as_str())) {
                return Err(UploadError("quota exceeded".into()));
            }
            Ok(files.iter().map(|f| format!("https://cdn.test/{}", f.name)).collect())
        }
    }

    /// Importer returning fixed nodes.
    struct Imports(Vec<Node>);

    impl RichImporter for Imports {
        async fn import(&self, _html: &str, _rtf: Option<&str>) -> std::result::Result<Vec<Node>, ImportError> {
            if self.0.is_empty() {
                return Err(ImportError("unreadable".into()));
            }
            Ok(self.0.clone())
        }
    }

    fn image(url: &str) -> Node {
        Element::void(media(url, String::new())).into()
    }

    fn png(name: &str) -> ClipboardFile {
        ClipboardFile::new(name, "image/png", vec![0; 4])
    }

    async fn run(
        doc: &mut Document,
        selection: Selection,
        payload: ClipboardPayload,
        config: &PasteConfig,
        upload: &Uploads,
        importer: &Imports,
    ) -> PasteReport {
        let plugins = PluginRegistry::new();
        let report = Paster::new(config, &plugins, upload, importer)
            .paste(doc, &selection, &payload)
            .await;
        doc.validate().unwrap();
        report
    }

    fn kind_of(report: &PasteReport) -> Option<PayloadKind> {
        match &report.outcome {
            PasteOutcome::Inserted { kind, .. } => Some(*kind),
            PasteOutcome::Default => None,
        }
    }

    #[tokio::test]
    async fn test_html_beats_plain() {
        let mut doc = Document::new();
        let payload = ClipboardPayload::plain("from plain").with_html("<p>from html</p>");
        let importer = Imports(vec![Element::text_paragraph("from html").into()]);
        let report = run(
            &mut doc,
            Selection::caret([0, 0], 0),
            payload,
            &PasteConfig::default(),
            &Uploads::default(),
            &importer,
        )
        .await;
        assert_eq!(kind_of(&report), Some(PayloadKind::Html));
        assert_eq!(doc.text(), "from html");
    }

    #[tokio::test]
    async fn test_allow_list_and_import_failure_fall_through() {
        let payload = ClipboardPayload::plain("words").with_html("<p>x</p>");
        let config = PasteConfig {
            allowed: vec![PayloadKind::Plain],
        };
        let mut doc = Document::new();
        let importer = Imports(vec![Element::text_paragraph("x").into()]);
        let report = run(&mut doc, Selection::caret([0, 0], 0), payload.clone(), &config, &Uploads::default(), &importer).await;
        assert_eq!(kind_of(&report), Some(PayloadKind::Plain));

        let mut doc = Document::new();
        let report = run(
            &mut doc,
            Selection::caret([0, 0], 0),
            payload,
            &PasteConfig::default(),
            &Uploads::default(),
            &Imports(Vec::new()),
        )
        .await;
        assert_eq!(kind_of(&report), Some(PayloadKind::Plain));
        assert_eq!(doc.text(), "words");
    }

    #[tokio::test]
    async fn test_malformed_fragment_falls_through() {
        let mut doc = Document::new();
        let payload = ClipboardPayload::plain("ok").with_fragment("{broken");
        let report = run(&mut doc, Selection::caret([0, 0], 0), payload, &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert_eq!(kind_of(&report), Some(PayloadKind::Plain));
    }

    #[tokio::test]
    async fn test_fragment_blocks_split_the_paragraph() {
        let mut doc = Document::from_nodes(vec![Element::text_paragraph("headtail").into()]);
        let fragment = Fragment::new(vec![
            Element::heading(2, "H").into(),
            Element::code(None, "x").into(),
        ]);
        let payload = ClipboardPayload::new().with_fragment(fragment.to_json().unwrap());
        let report = run(&mut doc, Selection::caret([0, 0], 4), payload, &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert_eq!(
            report.outcome,
            PasteOutcome::Inserted {
                kind: PayloadKind::Fragment,
                selection: Selection::caret([2, 0, 0], 1),
            }
        );
        let texts: Vec<_> = doc.children().iter().map(Node::text).collect();
        assert_eq!(texts, vec!["head", "H", "x", "tail"]);
    }

    #[tokio::test]
    async fn test_plain_table_is_parsed_unless_literal() {
        let table = "| a | b |\n| --- | --- |\n| 1 | 2 |";
        let mut doc = Document::new();
        run(&mut doc, Selection::caret([0, 0], 0), ClipboardPayload::plain(table), &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert!(matches!(doc.kind(&Path::from([0])), Some(ElementKind::Table { .. })));

        let mut doc = Document::from_nodes(vec![Element::code(None, "").into()]);
        run(&mut doc, Selection::caret([0, 0, 0], 0), ClipboardPayload::plain(table), &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert_eq!(doc.child_count(&Path::from([0])), Some(3));
        assert_eq!(doc.children()[0].children()[1].text(), "| --- | --- |");
    }

    #[tokio::test]
    async fn test_files_upload_independently() {
        let mut doc = Document::from_nodes(vec![Element::text_paragraph("intro").into()]);
        let payload = ClipboardPayload::new().with_file(png("a.png")).with_file(png("b.png"));
        let upload = Uploads { fail: vec!["a.png"] };
        let report = run(&mut doc, Selection::caret([0, 0], 5), payload, &PasteConfig::default(), &upload, &Imports(Vec::new())).await;
        assert_eq!(kind_of(&report), Some(PayloadKind::Files));
        assert_eq!(report.notices.len(), 1);
        assert!(report.notices[0].message.contains("a.png"));
        assert_eq!(doc.children().len(), 2);
        let payload_kind = doc.kind(&Path::from([1, 1])).cloned();
        assert!(matches!(payload_kind, Some(ElementKind::Media { url, .. }) if url == "https://cdn.test/b.png"));
    }

    #[tokio::test]
    async fn test_imported_blob_images_are_uploaded() {
        let mut doc = Document::new();
        let importer = Imports(vec![
            Element::text_paragraph("pic:").into(),
            image("blob:https://host/123"),
            image("https://remote.test/keep.png"),
            image("data:image/png;base64,AAAA"),
        ]);
        let payload = ClipboardPayload::new()
            .with_html("<img>")
            .with_file(png("shot.png"));
        let report = run(&mut doc, Selection::caret([0, 0], 0), payload, &PasteConfig::default(), &Uploads::default(), &importer).await;
        assert_eq!(kind_of(&report), Some(PayloadKind::Html));
        // The data URL had no file left to match and was dropped.
        assert_eq!(report.notices.len(), 1);
        let urls: Vec<_> = doc
            .children()
            .iter()
            .filter_map(|n| n.as_element()?.card_payload())
            .filter_map(|p| match &p.kind {
                ElementKind::Media { url, .. } => Some(url.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(urls, vec!["https://cdn.test/shot.png", "https://remote.test/keep.png"]);
    }

    #[tokio::test]
    async fn test_urls_and_embeds() {
        let mut doc = Document::from_nodes(vec![Element::text_paragraph("see ").into()]);
        run(&mut doc, Selection::caret([0, 0], 4), ClipboardPayload::plain("https://x.test/page"), &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert_eq!(doc.leaf(&Path::from([0, 1])).map(|l| l.marks.link.clone()), Some(Some("https://x.test/page".into())));

        let mut doc = Document::new();
        run(&mut doc, Selection::caret([0, 0], 0), ClipboardPayload::plain("https://x.test/cat.png"), &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert_eq!(doc.kind(&Path::from([0])), Some(&ElementKind::Card));

        let mut doc = Document::new();
        let reference = embed::encode_attachment("/files/a.pdf", "a.pdf", 12);
        run(&mut doc, Selection::caret([0, 0], 0), ClipboardPayload::plain(reference), &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert!(matches!(doc.kind(&Path::from([0, 1])), Some(ElementKind::Attachment { size: 12, .. })));
    }

    #[tokio::test]
    async fn test_placeholder_forces_literal_text() {
        let mut doc = Document::from_nodes(vec![
            Element::paragraph(vec![
                Leaf::new("a").into(),
                Element::new(ElementKind::Placeholder { label: "tag".into() }, vec![Leaf::new("").into()]).into(),
                Leaf::new("b").into(),
            ])
            .into(),
        ]);
        let payload = ClipboardPayload::plain("# not a heading").with_html("<h1>x</h1>");
        let report = run(&mut doc, Selection::caret([0, 1, 0], 0), payload, &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert_eq!(kind_of(&report), Some(PayloadKind::Plain));
        assert_eq!(doc.element(&Path::from([0, 1])).unwrap().text(), "# not a heading");
    }

    #[tokio::test]
    async fn test_list_into_list_item_splices_items() {
        let item = |t: &str| -> Node { Element::list_item(None, vec![Element::text_paragraph(t).into()]).into() };
        let mut doc = Document::from_nodes(vec![Element::list(false, vec![item("a"), item("")]).into()]);
        let report = run(&mut doc, Selection::caret([0, 1, 0, 0], 0), ClipboardPayload::new().with_markup("- x\n- y"), &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert_eq!(kind_of(&report), Some(PayloadKind::Markup));
        assert_eq!(doc.children().len(), 1);
        let items: Vec<_> = doc.children()[0].children().iter().map(Node::text).collect();
        assert_eq!(items, vec!["a", "x", "y"]);
    }

    #[tokio::test]
    async fn test_range_is_replaced() {
        let mut doc = Document::from_nodes(vec![Element::text_paragraph("hello world").into()]);
        let selection = Selection::new(Point::new([0, 0], 6), Point::new([0, 0], 11));
        run(&mut doc, selection, ClipboardPayload::plain("there"), &PasteConfig::default(), &Uploads::default(), &Imports(Vec::new())).await;
        assert_eq!(doc.text(), "hello there");
        assert_eq!(doc.children().len(), 1);
    }
}
