//! The tokenizer collaborator contract.

use std::future::Future;

use smol_str::SmolStr;

use crate::error::TokenizeError;

/// A coloured span of one code line. Offsets are chars within the line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenRange {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    /// CSS colour, e.g. `#c0c5ce`.
    pub color: SmolStr,
}

impl TokenRange {
    pub fn new(line: usize, start: usize, end: usize, color: impl Into<SmolStr>) -> Self {
        Self {
            line,
            start,
            end,
            color: color.into(),
        }
    }
}

/// Turns code into colour ranges for a named language.
///
/// Grammars may load lazily: `tokenize` is only called for languages that
/// report `is_loaded`, and the cache asks `load_languages` for the rest.
pub trait Tokenizer {
    fn is_loaded(&self, language: &str) -> bool;

    fn tokenize(&self, code: &str, language: &str) -> Result<Vec<TokenRange>, TokenizeError>;

    fn load_languages(
        &self,
        languages: &[SmolStr],
    ) -> impl Future<Output = Result<(), TokenizeError>> + Send;
}
