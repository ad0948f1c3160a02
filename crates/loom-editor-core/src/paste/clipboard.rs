//! Clipboard payload model.

use serde::{Deserialize, Serialize};

/// Private structured fragment (JSON document subtree).
pub const FRAGMENT_MIME: &str = "application/x-loom-fragment";
/// Private markup channel between two engines.
pub const MARKUP_MIME: &str = "text/x-loom-md";
pub const HTML_MIME: &str = "text/html";
pub const PLAIN_MIME: &str = "text/plain";
/// Auxiliary rich-text payload handed to the importer alongside HTML.
pub const RTF_MIME: &str = "text/rtf";

/// Payload kinds the paste router understands, in its priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadKind {
    Fragment,
    Html,
    Files,
    Markup,
    Plain,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 5] = [
        PayloadKind::Fragment,
        PayloadKind::Html,
        PayloadKind::Files,
        PayloadKind::Markup,
        PayloadKind::Plain,
    ];

    /// Clipboard MIME type carrying this kind. Files have none.
    pub fn mime(self) -> Option<&'static str> {
        match self {
            PayloadKind::Fragment => Some(FRAGMENT_MIME),
            PayloadKind::Html => Some(HTML_MIME),
            PayloadKind::Files => None,
            PayloadKind::Markup => Some(MARKUP_MIME),
            PayloadKind::Plain => Some(PLAIN_MIME),
        }
    }
}

/// A file object from the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardFile {
    pub name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

impl ClipboardFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data,
        }
    }

    /// Images, video and audio become media nodes; anything else is an
    /// attachment.
    pub fn is_media(&self) -> bool {
        ["image/", "video/", "audio/"]
            .iter()
            .any(|prefix| self.mime.starts_with(prefix))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Everything the host found on the clipboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub fragment: Option<String>,
    pub html: Option<String>,
    pub rtf: Option<String>,
    pub files: Vec<ClipboardFile>,
    pub markup: Option<String>,
    pub plain: Option<String>,
}

impl ClipboardPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new().with_plain(text)
    }

    pub fn with_fragment(mut self, json: impl Into<String>) -> Self {
        self.fragment = Some(json.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_rtf(mut self, rtf: impl Into<String>) -> Self {
        self.rtf = Some(rtf.into());
        self
    }

    pub fn with_file(mut self, file: ClipboardFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = Some(markup.into());
        self
    }

    pub fn with_plain(mut self, text: impl Into<String>) -> Self {
        self.plain = Some(text.into());
        self
    }

    /// Store a string payload under its MIME type. Unknown types are ignored
    /// and reported as `false`.
    pub fn set(&mut self, mime: &str, data: impl Into<String>) -> bool {
        let slot = match mime {
            FRAGMENT_MIME => &mut self.fragment,
            HTML_MIME => &mut self.html,
            RTF_MIME => &mut self.rtf,
            MARKUP_MIME => &mut self.markup,
            PLAIN_MIME => &mut self.plain,
            _ => return false,
        };
        *slot = Some(data.into());
        true
    }

    pub fn has(&self, kind: PayloadKind) -> bool {
        match kind {
            PayloadKind::Fragment => self.fragment.is_some(),
            PayloadKind::Html => self.html.is_some(),
            PayloadKind::Files => !self.files.is_empty(),
            PayloadKind::Markup => self.markup.is_some(),
            PayloadKind::Plain => self.plain.is_some(),
        }
    }

    /// Kinds present, in router priority order.
    pub fn kinds(&self) -> Vec<PayloadKind> {
        PayloadKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    /// Best text rendition of the payload, for literal-only targets.
    pub fn text(&self) -> Option<&str> {
        self.plain.as_deref().or(self.markup.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_priority() {
        let mut payload = ClipboardPayload::plain("x")
            .with_file(ClipboardFile::new("a.png", "image/png", vec![1, 2]));
        assert!(payload.set(HTML_MIME, "<p>x</p>"));
        assert!(!payload.set("application/pdf", "%PDF"));
        assert_eq!(
            payload.kinds(),
            vec![PayloadKind::Html, PayloadKind::Files, PayloadKind::Plain]
        );
        assert!(payload.files[0].is_media());
        assert_eq!(payload.files[0].size(), 2);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(serde_json::to_string(&PayloadKind::Fragment).unwrap(), r#""fragment""#);
        assert_eq!(PayloadKind::Markup.mime(), Some(MARKUP_MIME));
    }
}
