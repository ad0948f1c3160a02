//! Tokenizer backed by syntect's bundled grammars and themes.

use std::sync::LazyLock;

use smol_str::SmolStr;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use super::tokenizer::{TokenRange, Tokenizer};
use crate::error::TokenizeError;
use crate::text_helpers::char_len;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Every bundled grammar is available up front, so loading only reports
/// names syntect does not know.
#[derive(Debug, Clone)]
pub struct SyntectTokenizer {
    theme: SmolStr,
}

impl Default for SyntectTokenizer {
    fn default() -> Self {
        Self {
            theme: SmolStr::new_static(Self::DEFAULT_THEME),
        }
    }
}

impl SyntectTokenizer {
    pub const DEFAULT_THEME: &'static str = "base16-ocean.dark";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(name: &str) -> Result<Self, TokenizeError> {
        if !THEME_SET.themes.contains_key(name) {
            return Err(TokenizeError::Failed(format!("unknown theme `{name}`")));
        }
        Ok(Self { theme: name.into() })
    }

    fn syntax(language: &str) -> Option<&'static SyntaxReference> {
        SYNTAX_SET.find_syntax_by_token(language)
    }
}

fn hex(color: Color) -> SmolStr {
    smol_str::format_smolstr!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

impl Tokenizer for SyntectTokenizer {
    fn is_loaded(&self, language: &str) -> bool {
        Self::syntax(language).is_some()
    }

    fn tokenize(&self, code: &str, language: &str) -> Result<Vec<TokenRange>, TokenizeError> {
        let syntax =
            Self::syntax(language).ok_or_else(|| TokenizeError::UnknownLanguage(language.into()))?;
        let theme = THEME_SET
            .themes
            .get(self.theme.as_str())
            .ok_or_else(|| TokenizeError::Failed(format!("unknown theme `{}`", self.theme)))?;
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut ranges = Vec::new();
        for (line_idx, line) in code.split('\n').enumerate() {
            // The newline grammars expect every line terminated.
            let line = format!("{line}\n");
            let regions = highlighter
                .highlight_line(&line, &SYNTAX_SET)
                .map_err(|err| TokenizeError::Failed(err.to_string()))?;
            let mut col = 0;
            for (style, piece) in regions {
                let len = char_len(piece.trim_end_matches('\n'));
                if len > 0 {
                    ranges.push(TokenRange::new(line_idx, col, col + len, hex(style.foreground)));
                }
                col += len;
            }
        }
        Ok(ranges)
    }

    async fn load_languages(&self, languages: &[SmolStr]) -> Result<(), TokenizeError> {
        match languages.iter().find(|lang| !self.is_loaded(lang)) {
            Some(unknown) => Err(TokenizeError::UnknownLanguage(unknown.clone())),
            None => Ok(()),
        }
    }
}
