//! Error types for the editing engine.

use smol_str::SmolStr;

use crate::document::Path;

/// Failure of a structural tree operation.
///
/// Handlers treat any of these as "unexpected shape" and fall back to the
/// generic default behaviour with the tree left untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("no node at path {0}")]
    InvalidPath(Path),

    #[error("expected an element at path {0}")]
    NotAnElement(Path),

    #[error("expected a leaf at path {0}")]
    NotALeaf(Path),

    #[error("cannot {op} at path {path}")]
    Unsupported { op: &'static str, path: Path },

    #[error("invariant violated at {path}: {reason}")]
    Invariant { path: Path, reason: String },
}

impl DocumentError {
    pub fn unsupported(op: &'static str, path: &Path) -> Self {
        Self::Unsupported {
            op,
            path: path.clone(),
        }
    }

    pub fn invariant(path: &Path, reason: impl Into<String>) -> Self {
        Self::Invariant {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

/// Failure of an upload request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("upload failed: {0}")]
pub struct UploadError(pub String);

/// Failure of the rich-document importer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("import failed: {0}")]
pub struct ImportError(pub String);

/// Failure of the tokenizer collaborator.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unknown language `{0}`")]
    UnknownLanguage(SmolStr),

    #[error("language `{0}` is not loaded")]
    NotLoaded(SmolStr),

    #[error("tokenizer failed: {0}")]
    Failed(String),
}

/// Errors raised while routing a paste.
#[derive(thiserror::Error, Debug)]
pub enum PasteError {
    #[error("malformed fragment payload: {0}")]
    Fragment(#[from] serde_json::Error),

    #[error("fragment version {0} is newer than this engine understands")]
    FragmentVersion(u32),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Invalid configuration values.
#[derive(thiserror::Error, Debug, miette::Diagnostic)]
pub enum ConfigError {
    #[error("unsupported list bullet {0:?}")]
    #[diagnostic(
        code(loom::config::bullet),
        help("markup.bullet must be '-' or '*'")
    )]
    Bullet(char),
}

/// Umbrella error for the editor facade.
#[derive(thiserror::Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Paste(#[from] PasteError),

    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
