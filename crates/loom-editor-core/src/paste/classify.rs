//! Plain-text classification for paste.
//!
//! Decides whether a plain-text clipboard string is an embed reference, a bare
//! URL, markup worth parsing, or just text.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::markup::embed::{self, Embed};

/// Which markup construct made a string look like markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupSignal {
    /// Headings, tables, fenced code.
    Block,
    /// Emphasis markers, links and images.
    Inline,
}

/// What a plain-text paste should become.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlainContent {
    /// A `media://` or `attach://` reference.
    Embed(Embed),
    /// A bare URL to an image, video or audio file.
    MediaUrl(String),
    /// Any other bare URL.
    Link(String),
    Markup(MarkupSignal),
    Text,
}

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+\S").unwrap());

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\|?.*\|.*\n[ \t]*\|?[ \t]*:?-{3,}:?[ \t]*(\|[ \t]*:?-{3,}:?[ \t]*)*\|?[ \t]*$")
        .unwrap()
});

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(```|~~~)").unwrap());

static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*\S(?:[^*\n]*\S)?\*\*|~~\S(?:[^~\n]*\S)?~~|(?:^|\s)\*[^*\s](?:[^*\n]*[^*\s])?\*(?:\s|[.,;:!?]|$)")
        .unwrap()
});

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[[^\]\n]*\]\([^)\s]+(?:\s+[^)]*)?\)").unwrap());

/// Does `text` carry markup syntax worth parsing? Block constructs win over
/// inline ones.
pub fn markup_signal(text: &str) -> Option<MarkupSignal> {
    if HEADING_RE.is_match(text) || TABLE_RE.is_match(text) || FENCE_RE.is_match(text) {
        Some(MarkupSignal::Block)
    } else if EMPHASIS_RE.is_match(text) || LINK_RE.is_match(text) {
        Some(MarkupSignal::Inline)
    } else {
        None
    }
}

/// A single HTTP(S) URL with nothing around it.
pub fn bare_url(text: &str) -> Option<Url> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }
    let url = Url::parse(trimmed).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

pub fn classify_plain(text: &str) -> PlainContent {
    if let Some(embed) = embed::decode(text) {
        return PlainContent::Embed(embed);
    }
    if bare_url(text).is_some() {
        // Keep the string as typed; `Url` would normalize it.
        let url = text.trim().to_string();
        return if embed::media_extension(&url).is_some() {
            PlainContent::MediaUrl(url)
        } else {
            PlainContent::Link(url)
        };
    }
    match markup_signal(text) {
        Some(signal) => PlainContent::Markup(signal),
        None => PlainContent::Text,
    }
}
