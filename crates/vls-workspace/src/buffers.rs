//! Shared storage for open documents.
//!
//! [`Buffers`] hold the in-memory content of files the client has open. The
//! same storage is read by the [`VirtualFileSystem`](crate::VirtualFileSystem),
//! where an open buffer takes precedence over the file on disk.

use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use url::Url;
use vls_source::FxDashMap;

use crate::document::TextDocument;
use crate::paths::url_to_path;

/// Open documents keyed by path. Cloning shares the storage.
#[derive(Clone, Debug, Default)]
pub struct Buffers {
    inner: Arc<FxDashMap<Utf8PathBuf, TextDocument>>,
}

impl Buffers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or replace the document behind `url`. Returns the path it is
    /// stored under, or `None` for URLs that are not files.
    pub fn open(&self, url: &Url, document: TextDocument) -> Option<Utf8PathBuf> {
        let path = url_to_path(url)?;
        self.inner.insert(path.clone(), document);
        Some(path)
    }

    /// Replace an open document. A snapshot older than the stored one is
    /// ignored.
    pub fn update(&self, url: &Url, document: TextDocument) -> Option<Utf8PathBuf> {
        let path = url_to_path(url)?;
        match self.inner.get_mut(&path) {
            Some(mut existing) => {
                if existing.version() <= document.version() {
                    *existing = document;
                }
            }
            None => {
                self.inner.insert(path.clone(), document);
            }
        }
        Some(path)
    }

    #[must_use]
    pub fn close(&self, url: &Url) -> Option<TextDocument> {
        let path = url_to_path(url)?;
        self.inner.remove(&path).map(|(_, document)| document)
    }

    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<TextDocument> {
        self.inner.get(path).map(|entry| entry.clone())
    }

    #[must_use]
    pub fn get_url(&self, url: &Url) -> Option<TextDocument> {
        self.get(&url_to_path(url)?)
    }

    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.inner.contains_key(path)
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    #[must_use]
    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }
}
