//! loom-editor-core: structured markdown editing without framework dependencies.
//!
//! This crate provides:
//! - `Document` - the block/inline tree with its invariants and primitives
//! - `markup` - parser and serializer between markdown text and the tree
//! - `handlers` - Enter, Backspace, arrow and Tab rules per structural context
//! - `paste` - clipboard classification and insertion
//! - `highlight` - incremental syntax-highlight cache for code blocks
//! - `Editor` - the facade a host drives one event at a time

pub mod actions;
pub mod config;
pub mod debounce;
pub mod document;
pub mod editor;
pub mod error;
pub mod handlers;
pub mod highlight;
pub mod markup;
pub mod paste;
pub mod text_helpers;
pub mod types;

pub use actions::{Direction, EditorAction, Key, KeyCombo, KeyEvent, KeydownResult, Modifiers};
pub use config::{EditorConfig, HighlightConfig, MarkupConfig, PasteConfig};
pub use debounce::Debouncer;
pub use document::{CodeKey, Document, Element, ElementKind, Leaf, Marks, Node, Path};
pub use editor::{Editor, LoadTicket};
pub use error::{
    ConfigError, DocumentError, EditorError, ImportError, PasteError, TokenizeError, UploadError,
};
pub use handlers::{BreakKind, HandlerOutcome};
#[cfg(feature = "syntax-highlighting")]
pub use highlight::SyntectTokenizer;
pub use highlight::{Decoration, HighlightCache, HighlightStats, TokenRange, Tokenizer};
pub use markup::{PluginRegistry, SerializeOptions};
pub use paste::{
    ClipboardFile, ClipboardPayload, Fragment, Notice, PasteOutcome, PasteReport, Paster,
    PayloadKind, RichImporter, UploadService,
};
pub use smol_str::SmolStr;
pub use types::{Point, Selection};
