//! External collaborators used while pasting.
//!
//! Both are plain request/response services: the router awaits them and
//! applies the result to the tree afterwards. They never see the document.

use std::future::Future;

use super::clipboard::ClipboardFile;
use crate::document::Node;
use crate::error::{ImportError, UploadError};

/// Stores files and hands back the URL of each, in order.
pub trait UploadService {
    fn upload(
        &self,
        files: &[ClipboardFile],
    ) -> impl Future<Output = Result<Vec<String>, UploadError>> + Send;
}

/// Converts external rich documents (HTML, word-processor exports) into
/// document nodes. Local or `blob:` image references are left in place; the
/// router resolves them through the [`UploadService`].
pub trait RichImporter {
    fn import(
        &self,
        html: &str,
        rtf: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Node>, ImportError>> + Send;
}

/// Stand-in for hosts without an upload backend: every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpload;

impl UploadService for NoUpload {
    async fn upload(&self, _files: &[ClipboardFile]) -> Result<Vec<String>, UploadError> {
        Err(UploadError("no upload service configured".into()))
    }
}

/// Stand-in for hosts without an importer: HTML payloads fall through to the
/// next clipboard kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImport;

impl RichImporter for NoImport {
    async fn import(&self, _html: &str, _rtf: Option<&str>) -> Result<Vec<Node>, ImportError> {
        Err(ImportError("no rich-document importer configured".into()))
    }
}
