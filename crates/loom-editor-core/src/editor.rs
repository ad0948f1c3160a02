//! The host-facing editor.
//!
//! [`Editor`] owns the document and the caret and is driven one event at a
//! time: keystrokes, pastes, selection changes from the host. Every change
//! schedules a debounced serialization; the host collects the new markup by
//! calling [`Editor::poll`] from its event loop.

use web_time::Instant;

use crate::actions::{EditorAction, KeyEvent, KeydownResult};
use crate::config::EditorConfig;
use crate::debounce::Debouncer;
use crate::document::Document;
use crate::error::EditorError;
use crate::handlers::{self, HandlerOutcome, defaults};
use crate::highlight::{HighlightCache, Tokenizer};
use crate::markup::{self, PluginRegistry, SerializeOptions};
use crate::paste::{
    ClipboardPayload, Fragment, Notice, PasteOutcome, Paster, RichImporter, UploadService,
    fragment,
};
use crate::types::Selection;

/// Identifies one initial load. Only the most recent ticket may apply its
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

pub struct Editor {
    doc: Document,
    selection: Selection,
    config: EditorConfig,
    plugins: PluginRegistry,
    highlights: HighlightCache,
    serialize: Debouncer<()>,
    /// Markup most recently handed to the host.
    published: Option<String>,
    notices: Vec<Notice>,
    load_seq: u64,
    pending_load: Option<u64>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let doc = Document::new();
        let selection = start_of(&doc);
        Self {
            serialize: Debouncer::new(config.serialize_debounce()),
            doc,
            selection,
            config,
            plugins: PluginRegistry::new(),
            highlights: HighlightCache::new(),
            published: None,
            notices: Vec::new(),
            load_seq: 0,
            pending_load: None,
        }
    }

    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn highlights(&self) -> &HighlightCache {
        &self.highlights
    }

    /// Move the caret. Positions that no longer exist are clamped onto the
    /// nearest valid leaf.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = self.doc.clamp_selection(&selection);
    }

    fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            bullet: self.config.markup.bullet,
        }
    }

    /// Current document as markup.
    pub fn markup(&self) -> String {
        markup::serialize(&self.doc, &self.serialize_options(), &self.plugins)
    }

    /// Replace the document with parsed `source`. Loading is not an edit:
    /// nothing is scheduled and the loaded markup counts as published.
    pub fn load_markup(&mut self, source: &str) {
        self.doc = markup::parse(source, &self.plugins);
        self.selection = start_of(&self.doc);
        self.highlights.clear();
        self.serialize.cancel();
        self.published = Some(self.markup());
        tracing::debug!(target: "loom::editor", blocks = self.doc.children().len(), "loaded");
    }

    fn changed(&mut self) {
        self.serialize.schedule(Instant::now(), ());
    }

    fn apply(&mut self, outcome: HandlerOutcome) -> bool {
        match outcome {
            HandlerOutcome::Handled(selection) => {
                self.selection = selection;
                self.changed();
                true
            }
            HandlerOutcome::NotHandled => false,
        }
    }

    /// Route a keydown. Unhandled arrows pass through so the host moves the
    /// caret itself.
    pub fn handle_key(&mut self, event: &KeyEvent) -> KeydownResult {
        let Some(action) = EditorAction::from_key(event) else {
            return KeydownResult::NotHandled;
        };
        let outcome = handlers::dispatch(&mut self.doc, &self.selection, &action);
        if self.apply(outcome) {
            KeydownResult::Handled
        } else if matches!(action, EditorAction::Move(_)) {
            KeydownResult::PassThrough
        } else {
            KeydownResult::NotHandled
        }
    }

    pub fn insert_text(&mut self, text: &str) -> bool {
        let outcome = defaults::insert_text(&mut self.doc, &self.selection, text);
        self.apply(outcome)
    }

    pub fn delete_backward(&mut self) -> bool {
        let outcome = handlers::dispatch(&mut self.doc, &self.selection, &EditorAction::DeleteBackward);
        self.apply(outcome)
    }

    /// Paste `payload` at the selection. Upload and import failures end up
    /// in the notice queue.
    pub async fn paste(
        &mut self,
        payload: &ClipboardPayload,
        upload: &impl UploadService,
        importer: &impl RichImporter,
    ) -> PasteOutcome {
        let paster = Paster::new(&self.config.paste, &self.plugins, upload, importer);
        let report = paster.paste(&mut self.doc, &self.selection, payload).await;
        self.notices.extend(report.notices);
        if let PasteOutcome::Inserted { selection, .. } = &report.outcome {
            self.selection = selection.clone();
            self.changed();
        }
        report.outcome
    }

    /// Clipboard payload for the current selection: the structured fragment,
    /// private markup and plain text. `None` for a collapsed selection.
    pub fn copy_fragment(&self) -> Result<Option<ClipboardPayload>, EditorError> {
        let copied = Fragment::from_selection(&self.doc, &self.selection);
        if copied.nodes.is_empty() {
            return Ok(None);
        }
        let markup = markup::serialize_nodes(&copied.nodes, &self.serialize_options(), &self.plugins);
        let plain = fragment::plain_text(&copied.nodes);
        Ok(Some(
            ClipboardPayload::new()
                .with_fragment(copied.to_json()?)
                .with_markup(markup)
                .with_plain(plain),
        ))
    }

    /// Serialized markup once the debounce window has passed, if it differs
    /// from what the host last received.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        self.serialize.poll(now)?;
        let markup = self.markup();
        if self.published.as_ref() == Some(&markup) {
            return None;
        }
        tracing::trace!(target: "loom::editor", bytes = markup.len(), "publishing markup");
        self.published = Some(markup.clone());
        Some(markup)
    }

    pub fn refresh_highlights(&mut self, tokenizer: &impl Tokenizer) -> bool {
        self.highlights
            .refresh(&self.doc, tokenizer, &self.config.highlight)
    }

    /// Load queued languages. Blocks typed while loading are picked up by
    /// the refresh that follows the batch.
    pub async fn load_pending_languages(&mut self, tokenizer: &impl Tokenizer) -> bool {
        self.highlights
            .load_pending(&self.doc, tokenizer, &self.config.highlight)
            .await
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Start an initial load. Any earlier ticket becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_seq += 1;
        self.pending_load = Some(self.load_seq);
        LoadTicket(self.load_seq)
    }

    /// Apply a load result if `ticket` is still current.
    pub fn finish_load(&mut self, ticket: LoadTicket, source: &str) -> bool {
        if self.pending_load != Some(ticket.0) {
            tracing::debug!(target: "loom::editor", ticket = ticket.0, "discarding stale load");
            return false;
        }
        self.pending_load = None;
        self.load_markup(source);
        true
    }

    /// The host moved to another document: cancel pending work and start
    /// from an empty tree.
    pub fn retarget(&mut self) {
        self.pending_load = None;
        self.serialize.cancel();
        self.doc = Document::new();
        self.selection = start_of(&self.doc);
        self.highlights.clear();
        self.notices.clear();
        self.published = None;
    }
}

fn start_of(doc: &Document) -> Selection {
    doc.document_start()
        .map(Selection::collapsed)
        .unwrap_or_else(|| Selection::caret([0, 0], 0))
}
