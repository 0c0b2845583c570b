use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8Path;
use tower_lsp_server::ls_types;
use url::Url;
use vls_conf::Settings;
use vls_project::ProjectRegistry;
use vls_script::FileSpan;
use vls_script::FileTextChanges;
use vls_script::ScanServiceFactory;
use vls_script::ServiceFactory;
use vls_source::FileSystem;
use vls_source::PositionEncoding;
use vls_source::Span;
use vls_workspace::url_to_path;
use vls_workspace::Buffers;
use vls_workspace::CacheLimits;
use vls_workspace::LanguageId;
use vls_workspace::PathClass;
use vls_workspace::TextDocument;
use vls_workspace::VirtualFileSystem;

use crate::ext::path_to_uri;
use crate::ext::PositionEncodingExt;
use crate::ext::PositionEncodingKindExt;
use crate::ext::SpanExt;

/// Entry point for every editor feature.
///
/// Cloning is not supported; share it behind an `Arc`. All methods take
/// `&self` and may be called from several threads.
pub struct LanguageServices {
    buffers: Buffers,
    vfs: Arc<VirtualFileSystem>,
    projects: ProjectRegistry,
    settings: Mutex<Settings>,
    encoding: PositionEncoding,
}

impl std::fmt::Debug for LanguageServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageServices")
            .field("buffers", &self.buffers)
            .field("projects", &self.projects)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl LanguageServices {
    /// Services backed by `fs` and the built-in engine.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, settings: Settings) -> Self {
        Self::with_factory(fs, Arc::new(ScanServiceFactory), settings)
    }

    #[must_use]
    pub fn with_factory(
        fs: Arc<dyn FileSystem>,
        factory: Arc<dyn ServiceFactory>,
        settings: Settings,
    ) -> Self {
        let buffers = Buffers::new();
        let vfs = Arc::new(VirtualFileSystem::new(fs, buffers.clone()));
        vfs.set_cache_limits(CacheLimits::from(&settings.cache));
        let projects = ProjectRegistry::new(Arc::clone(&vfs), factory, settings.clone());
        Self {
            buffers,
            vfs,
            projects,
            settings: Mutex::new(settings),
            encoding: PositionEncoding::default(),
        }
    }

    pub(crate) fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    pub(crate) fn vfs(&self) -> &VirtualFileSystem {
        &self.vfs
    }

    #[must_use]
    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn position_encoding(&self) -> PositionEncoding {
        self.encoding
    }

    /// Pick the first encoding the client offers that is supported, falling
    /// back to UTF-16 which every client understands.
    pub fn negotiate_position_encoding(
        &mut self,
        offered: Option<&[ls_types::PositionEncodingKind]>,
    ) -> ls_types::PositionEncodingKind {
        self.encoding = offered
            .unwrap_or_default()
            .iter()
            .find_map(PositionEncodingKindExt::to_position_encoding)
            .unwrap_or_default();
        self.encoding.to_lsp()
    }

    /// Start serving a document the client opened.
    pub fn open_document(&self, url: &Url, document: TextDocument) {
        let Some(path) = self.buffers.open(url, document) else {
            tracing::debug!("Not opening non-file URL {}", url);
            return;
        };
        tracing::debug!("Opened {}", path);
        self.vfs.invalidate(&path);
        self.projects.file_changed(&path);
        if let Some(directory) = path.parent() {
            self.projects.project_for(directory).track(&path);
        }
    }

    /// Replace the content of an open document. Snapshots older than the one
    /// held are ignored.
    pub fn update_document(&self, url: &Url, document: TextDocument) {
        if self.buffers.get_url(url).is_none() {
            self.open_document(url, document);
            return;
        }
        if let Some(path) = self.buffers.update(url, document) {
            tracing::trace!("Updated {}", path);
        }
    }

    /// The client closed a document. Requests fall back to the file on disk;
    /// documents that never existed there are forgotten.
    pub fn on_document_removed(&self, url: &Url) {
        let Some(path) = url_to_path(url) else {
            return;
        };
        if self.buffers.close(url).is_none() {
            return;
        }
        tracing::debug!("Closed {}", path);
        self.vfs.invalidate(&path);
        if self.vfs.exists(&path) {
            self.projects.file_changed(&path);
        } else {
            self.projects.file_deleted(&path);
        }
    }

    /// A file was created or edited outside of the open buffers.
    pub fn on_external_file_changed(&self, path: &Utf8Path) {
        let stale = self.projects.invalidate_for_file(path);
        if !stale.is_empty() {
            tracing::info!("{} invalidated {} project(s)", path, stale.len());
        }
        self.vfs.mark_changed(path);
        self.projects.file_changed(path);

        for project in self.projects.projects() {
            if !path.starts_with(project.root()) {
                continue;
            }
            let supported = project
                .config()
                .extensions()
                .iter()
                .any(|extension| path.as_str().ends_with(extension.as_str()));
            if supported && self.vfs.disk().exists(path) {
                project.track(path);
            }
        }
    }

    pub fn on_external_file_deleted(&self, path: &Utf8Path) {
        let stale = self.projects.invalidate_for_file(path);
        if !stale.is_empty() {
            tracing::info!("Removing {} invalidated {} project(s)", path, stale.len());
        }
        self.vfs.mark_changed(path);
        self.projects.file_deleted(path);
    }

    /// Apply new user settings. Projects are rebuilt only when the settings
    /// they were built with changed.
    pub fn update_settings(&self, settings: Settings) {
        self.vfs.set_cache_limits(CacheLimits::from(&settings.cache));
        self.projects.update_settings(settings.clone());
        *self
            .settings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = settings;
    }

    /// Release every project and cache. Open documents stay open, later
    /// requests build what they need again.
    pub fn dispose(&self) {
        tracing::info!("Disposing language services");
        self.projects.dispose();
        self.vfs.clear();
    }

    /// Text of a component or plain file, open or on disk.
    fn source_document(&self, path: &Utf8Path) -> Option<TextDocument> {
        if let Some(document) = self.buffers.get(path) {
            return Some(document);
        }
        match self.vfs.read_text(path) {
            Ok(text) => Some(TextDocument::new(
                text,
                0,
                LanguageId::from_extension(path.extension()),
            )),
            Err(err) => {
                tracing::debug!("Cannot read {}: {}", path, err);
                None
            }
        }
    }

    /// Translate an engine span in any file into the file the user sees.
    fn to_source(&self, path: &Utf8Path, span: Span) -> Option<(TextDocument, Span)> {
        let class = PathClass::classify(path);
        let span = match class.target() {
            Some(target) => {
                let view = self.vfs.virtual_document(class.backing_path(), target).ok()?;
                let original = view.source_map.span_to_original(span)?;
                if let Some(region) = &view.region {
                    if !region.content_span.contains_span(original) {
                        return None;
                    }
                }
                original
            }
            None => span,
        };
        let document = self.source_document(class.backing_path())?;
        Some((document, span))
    }

    pub(crate) fn location(&self, file_span: &FileSpan) -> Option<ls_types::Location> {
        let class = PathClass::classify(&file_span.path);
        let (document, span) = self.to_source(&file_span.path, file_span.span)?;
        let uri = path_to_uri(class.backing_path())?;
        Some(ls_types::Location::new(
            uri,
            span.to_lsp_range(&document, self.encoding),
        ))
    }

    /// Turn engine edits into a workspace edit on the files the user sees.
    /// Edits that fall outside of their region are dropped.
    pub(crate) fn workspace_edit(&self, files: &[FileTextChanges]) -> ls_types::WorkspaceEdit {
        let mut changes: HashMap<ls_types::Uri, Vec<ls_types::TextEdit>> = HashMap::new();
        for file in files {
            let class = PathClass::classify(&file.path);
            let Some(uri) = path_to_uri(class.backing_path()) else {
                continue;
            };
            for change in &file.changes {
                let Some((document, span)) = self.to_source(&file.path, change.span) else {
                    tracing::debug!("Dropping edit of {} without a source position", file.path);
                    continue;
                };
                changes
                    .entry(uri.clone())
                    .or_default()
                    .push(ls_types::TextEdit::new(
                        span.to_lsp_range(&document, self.encoding),
                        change.new_text.clone(),
                    ));
            }
        }
        ls_types::WorkspaceEdit::new(changes)
    }
}
