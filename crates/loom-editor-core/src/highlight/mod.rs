//! Incremental syntax-highlight cache for code blocks.
//!
//! Entries are keyed by the code block's identity key, not its path. A block
//! that only moved keeps its ranges and has its path updated; a block whose
//! text or language changed is recomputed; a block that left the document is
//! evicted on the next refresh.

mod tokenizer;
#[cfg(feature = "syntax-highlighting")]
mod syntax;

pub use tokenizer::{TokenRange, Tokenizer};
#[cfg(feature = "syntax-highlighting")]
pub use syntax::SyntectTokenizer;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;

use crate::config::HighlightConfig;
use crate::document::{CodeKey, Document, ElementKind, Node, Path};

/// One coloured span projected onto the leaf of a code line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub path: Path,
    pub start: usize,
    pub end: usize,
    pub color: SmolStr,
}

/// Counters for observing cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightStats {
    /// Tokenizer runs.
    pub computations: usize,
    /// Entries whose path changed without recomputation.
    pub relocations: usize,
    /// Blocks left unhighlighted for exceeding the configured bounds.
    pub skipped: usize,
    pub evictions: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    path: Path,
    hash: u64,
    ranges: Arc<[TokenRange]>,
}

/// A code block as seen during a scan.
struct CodeBlock {
    path: Path,
    key: CodeKey,
    language: Option<SmolStr>,
    lines: Vec<String>,
}

#[derive(Debug, Default)]
pub struct HighlightCache {
    entries: HashMap<CodeKey, Entry>,
    /// Languages waiting for the tokenizer to load them.
    pending: BTreeSet<SmolStr>,
    /// Languages the tokenizer failed to load; never queued again.
    unavailable: HashSet<SmolStr>,
    stats: HighlightStats,
}

impl HighlightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> HighlightStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_languages(&self) -> Vec<SmolStr> {
        self.pending.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }

    /// Rescan `doc` and bring every entry up to date. Returns whether any
    /// ranges or paths changed.
    pub fn refresh<T: Tokenizer>(
        &mut self,
        doc: &Document,
        tokenizer: &T,
        config: &HighlightConfig,
    ) -> bool {
        let mut blocks = Vec::new();
        collect_code(doc.children(), &Path::root(), &mut blocks);

        let mut changed = false;
        let mut seen = HashSet::with_capacity(blocks.len());
        for block in blocks {
            if !block.key.is_assigned() {
                continue;
            }
            seen.insert(block.key);
            changed |= self.refresh_block(block, tokenizer, config);
        }

        let before = self.entries.len();
        self.entries.retain(|key, _| seen.contains(key));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::trace!(target: "loom::highlight", evicted, "evicted removed code blocks");
            self.stats.evictions += evicted;
            changed = true;
        }
        changed
    }

    fn refresh_block<T: Tokenizer>(
        &mut self,
        block: CodeBlock,
        tokenizer: &T,
        config: &HighlightConfig,
    ) -> bool {
        let Some(language) = block.language else {
            return self.entries.remove(&block.key).is_some();
        };
        let bytes: usize = block.lines.iter().map(|l| l.len() + 1).sum();
        if block.lines.len() > config.max_lines || bytes > config.max_bytes {
            tracing::trace!(
                target: "loom::highlight",
                path = %block.path,
                lines = block.lines.len(),
                bytes,
                "code block too large, left plain"
            );
            self.stats.skipped += 1;
            return self.entries.remove(&block.key).is_some();
        }

        let code = block.lines.join("\n");
        let hash = hash_code(&language, &code);
        if let Some(entry) = self.entries.get_mut(&block.key) {
            if entry.hash == hash {
                if entry.path == block.path {
                    return false;
                }
                tracing::trace!(
                    target: "loom::highlight",
                    from = %entry.path,
                    to = %block.path,
                    "relocated"
                );
                entry.path = block.path;
                self.stats.relocations += 1;
                return true;
            }
        }

        if self.unavailable.contains(&language) {
            return self.entries.remove(&block.key).is_some();
        }
        if !tokenizer.is_loaded(&language) {
            self.pending.insert(language);
            return self.entries.remove(&block.key).is_some();
        }

        self.stats.computations += 1;
        match tokenizer.tokenize(&code, &language) {
            Ok(ranges) => {
                self.entries.insert(
                    block.key,
                    Entry {
                        path: block.path,
                        hash,
                        ranges: ranges.into(),
                    },
                );
                true
            }
            Err(err) => {
                tracing::warn!(target: "loom::highlight", %language, error = %err, "tokenize failed");
                self.entries.remove(&block.key).is_some()
            }
        }
    }

    /// Ask the tokenizer for every queued language, then rerun the blocks
    /// that were waiting on them. Returns `true` when a batch was loaded,
    /// which is the single refresh signal for that batch.
    pub async fn load_pending<T: Tokenizer>(
        &mut self,
        doc: &Document,
        tokenizer: &T,
        config: &HighlightConfig,
    ) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        let batch: Vec<SmolStr> = std::mem::take(&mut self.pending).into_iter().collect();
        if let Err(err) = tokenizer.load_languages(&batch).await {
            tracing::warn!(target: "loom::highlight", error = %err, "language load failed");
        }
        for language in &batch {
            if !tokenizer.is_loaded(language) {
                self.unavailable.insert(language.clone());
            }
        }
        tracing::debug!(target: "loom::highlight", count = batch.len(), "languages loaded");
        self.refresh(doc, tokenizer, config);
        true
    }

    /// Cached ranges for the code block currently at `path`.
    pub fn ranges_at(&self, path: &Path) -> Option<Arc<[TokenRange]>> {
        self.entries
            .values()
            .find(|entry| entry.path == *path)
            .map(|entry| entry.ranges.clone())
    }

    /// Every cached range projected onto its code-line leaf, in document
    /// order.
    pub fn decorations(&self) -> Vec<Decoration> {
        let mut out: Vec<Decoration> = self
            .entries
            .values()
            .flat_map(|entry| {
                entry.ranges.iter().map(|range| Decoration {
                    path: entry.path.child(range.line).child(0),
                    start: range.start,
                    end: range.end,
                    color: range.color.clone(),
                })
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path).then(a.start.cmp(&b.start)));
        out
    }
}

fn hash_code(language: &str, code: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    language.hash(&mut hasher);
    code.hash(&mut hasher);
    hasher.finish()
}

fn collect_code(children: &[Node], parent: &Path, out: &mut Vec<CodeBlock>) {
    for (idx, child) in children.iter().enumerate() {
        let Node::Element(el) = child else { continue };
        let path = parent.child(idx);
        match &el.kind {
            ElementKind::Code { language, key } => out.push(CodeBlock {
                path,
                key: *key,
                language: language.clone().filter(|l| !l.is_empty()),
                lines: el.children.iter().map(Node::text).collect(),
            }),
            kind if kind.is_text_block() || kind.is_void() => {}
            _ => collect_code(&el.children, &path, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::document::Element;
    use crate::error::TokenizeError;

    /// Colours each line as one range. Languages named `bad` never load.
    #[derive(Default)]
    struct LineTokenizer {
        loaded: Mutex<HashSet<SmolStr>>,
    }

    impl LineTokenizer {
        fn with(languages: &[&str]) -> Self {
            Self {
                loaded: Mutex::new(languages.iter().map(|l| SmolStr::new(l)).collect()),
            }
        }
    }

    impl Tokenizer for LineTokenizer {
        fn is_loaded(&self, language: &str) -> bool {
            self.loaded.lock().unwrap().contains(language)
        }

        fn tokenize(&self, code: &str, _language: &str) -> Result<Vec<TokenRange>, TokenizeError> {
            Ok(code
                .split('\n')
                .enumerate()
                .filter(|(_, line)| !line.is_empty())
                .map(|(idx, line)| TokenRange::new(idx, 0, line.chars().count(), "#fff"))
                .collect())
        }

        async fn load_languages(&self, languages: &[SmolStr]) -> Result<(), TokenizeError> {
            let mut loaded = self.loaded.lock().unwrap();
            loaded.extend(languages.iter().filter(|lang| *lang != "bad").cloned());
            match languages.iter().find(|lang| *lang == "bad") {
                Some(bad) => Err(TokenizeError::UnknownLanguage(bad.clone())),
                None => Ok(()),
            }
        }
    }

    fn doc() -> Document {
        Document::from_nodes(vec![
            Element::text_paragraph("intro").into(),
            Element::code(Some("rust"), "fn a() {}\nfn b() {}").into(),
        ])
    }

    #[test]
    fn test_move_relocates_without_recompute() {
        let tokenizer = LineTokenizer::with(&["rust"]);
        let config = HighlightConfig::default();
        let mut doc = doc();
        let mut cache = HighlightCache::new();
        assert!(cache.refresh(&doc, &tokenizer, &config));
        assert_eq!(cache.stats().computations, 1);

        doc.move_node(&Path::from([1]), &Path::from([0])).unwrap();
        assert!(cache.refresh(&doc, &tokenizer, &config));
        let stats = cache.stats();
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.relocations, 1);
        assert!(cache.ranges_at(&Path::from([1])).is_none());
        assert_eq!(cache.ranges_at(&Path::from([0])).map(|r| r.len()), Some(2));
        assert_eq!(cache.decorations()[1].path, Path::from([0, 1, 0]));

        // Nothing changed: no work at all.
        assert!(!cache.refresh(&doc, &tokenizer, &config));
        assert_eq!(cache.stats(), stats);
    }

    #[test]
    fn test_edit_recomputes_and_removal_evicts() {
        let tokenizer = LineTokenizer::with(&["rust"]);
        let config = HighlightConfig::default();
        let mut doc = doc();
        let mut cache = HighlightCache::new();
        cache.refresh(&doc, &tokenizer, &config);

        doc.insert_text(&crate::types::Point::new([1, 0, 0], 0), "pub ").unwrap();
        cache.refresh(&doc, &tokenizer, &config);
        assert_eq!(cache.stats().computations, 2);
        assert_eq!(cache.decorations()[0].end, 13);

        doc.remove_node(&Path::from([1])).unwrap();
        cache.refresh(&doc, &tokenizer, &config);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_oversized_blocks_are_skipped() {
        let tokenizer = LineTokenizer::with(&["rust"]);
        let config = HighlightConfig {
            max_lines: 1,
            ..Default::default()
        };
        let mut cache = HighlightCache::new();
        assert!(!cache.refresh(&doc(), &tokenizer, &config));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().skipped, 1);
        assert_eq!(cache.stats().computations, 0);
    }

    #[tokio::test]
    async fn test_pending_languages_run_after_load() {
        let tokenizer = LineTokenizer::default();
        let config = HighlightConfig::default();
        let doc = Document::from_nodes(vec![
            Element::code(Some("rust"), "a").into(),
            Element::code(Some("bad"), "b").into(),
            Element::code(None, "c").into(),
        ]);
        let mut cache = HighlightCache::new();
        cache.refresh(&doc, &tokenizer, &config);
        assert!(cache.is_empty());
        assert_eq!(cache.pending_languages(), vec![SmolStr::new("bad"), SmolStr::new("rust")]);

        assert!(cache.load_pending(&doc, &tokenizer, &config).await);
        assert!(cache.pending_languages().is_empty());
        assert_eq!(cache.len(), 1);
        assert!(cache.ranges_at(&Path::from([0])).is_some());

        // The failed language is not queued again.
        cache.refresh(&doc, &tokenizer, &config);
        assert!(cache.pending_languages().is_empty());
        assert!(!cache.load_pending(&doc, &tokenizer, &config).await);
    }
}
