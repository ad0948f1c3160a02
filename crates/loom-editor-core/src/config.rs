//! Engine configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Files are read by extension: `.json` or `.toml`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{IntoDiagnostic, Result, WrapErr, miette};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paste::PayloadKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before changed markup is handed to the host.
    pub serialize_debounce_ms: u64,
    pub paste: PasteConfig,
    pub highlight: HighlightConfig,
    pub markup: MarkupConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            serialize_debounce_ms: 300,
            paste: PasteConfig::default(),
            highlight: HighlightConfig::default(),
            markup: MarkupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasteConfig {
    /// Clipboard payload kinds the router may use. Order is irrelevant; the
    /// router always tries kinds in its own fixed priority.
    pub allowed: Vec<PayloadKind>,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            allowed: PayloadKind::ALL.to_vec(),
        }
    }
}

impl PasteConfig {
    pub fn allows(&self, kind: PayloadKind) -> bool {
        self.allowed.contains(&kind)
    }
}

/// Bounds beyond which a code block is left unhighlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub max_lines: usize,
    pub max_bytes: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            max_lines: 3000,
            max_bytes: 256 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    /// Bullet for unordered lists, `-` or `*`.
    pub bullet: char,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self { bullet: '-' }
    }
}

impl EditorConfig {
    pub fn serialize_debounce(&self) -> Duration {
        Duration::from_millis(self.serialize_debounce_ms)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)
            .into_diagnostic()
            .wrap_err("invalid JSON editor configuration")?;
        config.checked()
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .into_diagnostic()
            .wrap_err("invalid TOML editor configuration")?;
        config.checked()
    }

    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self> {
        loader
            .load()
            .await
            .map_err(|e| miette!("Failed to load editor configuration: {e}"))?
            .checked()
    }

    fn checked(self) -> Result<Self> {
        if !matches!(self.markup.bullet, '-' | '*') {
            return Err(ConfigError::Bullet(self.markup.bullet).into());
        }
        Ok(self)
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    fn load(
        &self,
    ) -> impl Future<
        Output = core::result::Result<
            EditorConfig,
            Box<dyn std::error::Error + Send + Sync + 'static>,
        >,
    > + Send;
}

/// A [`Loader`] that reads a `.json` or `.toml` file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Loader for FileStore {
    async fn load(
        &self,
    ) -> core::result::Result<EditorConfig, Box<dyn std::error::Error + Send + Sync + 'static>>
    {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&std::fs::read_to_string(&self.path)?)?),
            Some("toml") => Ok(toml::from_str(&std::fs::read_to_string(&self.path)?)?),
            _ => Err(miette!("Unsupported file format").into()),
        }
    }
}
