//! Pseudo-URL embed references.
//!
//! Media and attachments travel through plain-text channels as
//! `media://?url=<enc>&height=<n>` and
//! `attach://?url=<enc>&name=<str>&size=<bytes>`. Both parser and paste decode
//! these before any generic link handling.

use smol_str::SmolStr;
use url::form_urlencoded;

use crate::document::ElementKind;

pub const MEDIA_SCHEME: &str = "media://";
pub const ATTACH_SCHEME: &str = "attach://";

/// A decoded embed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Embed {
    Media {
        url: SmolStr,
        height: Option<u32>,
    },
    Attachment {
        url: SmolStr,
        name: String,
        size: u64,
    },
}

impl Embed {
    /// Void element kind for this embed. `alt` and `title` only apply to media.
    pub fn into_kind(self, alt: String, title: Option<String>) -> ElementKind {
        match self {
            Embed::Media { url, height } => ElementKind::Media {
                url,
                alt,
                title,
                height,
            },
            Embed::Attachment { url, name, size } => ElementKind::Attachment { url, name, size },
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Embed::Media { url, height } => encode_media(url, *height),
            Embed::Attachment { url, name, size } => encode_attachment(url, name, *size),
        }
    }
}

pub fn encode_media(url: &str, height: Option<u32>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("url", url);
    if let Some(height) = height {
        query.append_pair("height", &height.to_string());
    }
    format!("{MEDIA_SCHEME}?{}", query.finish())
}

pub fn encode_attachment(url: &str, name: &str, size: u64) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("url", url)
        .append_pair("name", name)
        .append_pair("size", &size.to_string())
        .finish();
    format!("{ATTACH_SCHEME}?{query}")
}

/// Decode a pseudo-URL. Anything that is not a well-formed embed reference
/// yields `None` and is treated as an ordinary URL by the caller.
pub fn decode(reference: &str) -> Option<Embed> {
    let reference = reference.trim();
    if let Some(rest) = reference.strip_prefix(MEDIA_SCHEME) {
        let mut url = None;
        let mut height = None;
        for (key, value) in form_urlencoded::parse(query_of(rest).as_bytes()) {
            match key.as_ref() {
                "url" => url = Some(normalize_path(&value)),
                "height" => height = value.parse().ok(),
                _ => {}
            }
        }
        return Some(Embed::Media {
            url: SmolStr::new(url.filter(|u| !u.is_empty())?),
            height,
        });
    }
    if let Some(rest) = reference.strip_prefix(ATTACH_SCHEME) {
        let mut url = None;
        let mut name = None;
        let mut size = 0;
        for (key, value) in form_urlencoded::parse(query_of(rest).as_bytes()) {
            match key.as_ref() {
                "url" => url = Some(normalize_path(&value)),
                "name" => name = Some(value.into_owned()),
                "size" => size = value.parse().unwrap_or(0),
                _ => {}
            }
        }
        let url = url.filter(|u| !u.is_empty())?;
        let name = name.unwrap_or_else(|| file_name(&url).to_string());
        return Some(Embed::Attachment {
            url: SmolStr::new(url),
            name,
            size,
        });
    }
    None
}

fn query_of(rest: &str) -> &str {
    rest.split_once('?').map_or(rest, |(_, query)| query)
}

pub fn is_network_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Normalize a non-network location to a platform-neutral path: backslashes
/// become slashes and a `file://` prefix is dropped. Network, data and blob
/// URLs pass through untouched.
pub fn normalize_path(url: &str) -> String {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if is_network_url(url) || lower.starts_with("data:") || lower.starts_with("blob:") {
        return url.to_string();
    }
    let stripped = if lower.starts_with("file://") {
        &url["file://".len()..]
    } else {
        url
    };
    stripped.replace('\\', "/")
}

/// Last path segment of a URL or path.
pub fn file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}

/// Media class of a URL, judged by its file extension.
pub fn media_extension(url: &str) -> Option<&'static str> {
    let name = file_name(url);
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" | "avif" => Some("image"),
        "mp4" | "webm" | "mov" | "m4v" | "ogv" => Some("video"),
        "mp3" | "wav" | "ogg" | "flac" | "m4a" | "aac" => Some("audio"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_reference() {
        let encoded = encode_media("https://cdn.example.com/a b.png", Some(240));
        assert_eq!(
            encoded,
            "media://?url=https%3A%2F%2Fcdn.example.com%2Fa+b.png&height=240"
        );
        assert_eq!(
            decode(&encoded),
            Some(Embed::Media {
                url: "https://cdn.example.com/a b.png".into(),
                height: Some(240),
            })
        );
    }

    #[test]
    fn test_attachment_reference() {
        let embed = Embed::Attachment {
            url: "/files/report.pdf".into(),
            name: "Q3 report.pdf".into(),
            size: 1024,
        };
        assert_eq!(decode(&embed.encode()), Some(embed));
    }

    #[test]
    fn test_local_paths_are_normalized() {
        let decoded = decode("media://?url=file%3A%2F%2FC%3A%5Cpics%5Ccat.png");
        assert_eq!(
            decoded,
            Some(Embed::Media {
                url: "C:/pics/cat.png".into(),
                height: None,
            })
        );
        assert_eq!(normalize_path("https://x.test/a\\b"), "https://x.test/a\\b");
    }

    #[test]
    fn test_malformed_reference() {
        assert_eq!(decode("media://?height=3"), None);
        assert_eq!(decode("https://example.com"), None);
        assert_eq!(
            decode("attach://?url=%2Fa%2Fnotes.txt"),
            Some(Embed::Attachment {
                url: "/a/notes.txt".into(),
                name: "notes.txt".into(),
                size: 0,
            })
        );
    }

    #[test]
    fn test_media_extension() {
        assert_eq!(media_extension("https://x.test/cat.JPG?w=2"), Some("image"));
        assert_eq!(media_extension("https://x.test/clip.webm"), Some("video"));
        assert_eq!(media_extension("https://x.test/page"), None);
    }
}
