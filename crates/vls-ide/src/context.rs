//! Routing a request to the engine and view that answer it.

use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use tower_lsp_server::ls_types;
use url::Url;
use vls_embedded::RegionKind;
use vls_embedded::SourceMap;
use vls_embedded::VirtualDocument;
use vls_embedded::VirtualTarget;
use vls_project::Project;
use vls_script::LanguageService;
use vls_script::ServiceResult;
use vls_source::Offset;
use vls_source::PositionEncoding;
use vls_source::Span;
use vls_workspace::is_composite;
use vls_workspace::url_to_path;
use vls_workspace::TextDocument;

use crate::ext::PositionExt;
use crate::ext::RangeExt;
use crate::ext::SpanExt;
use crate::services::LanguageServices;

/// An open document together with the project that governs it.
pub(crate) struct DocumentContext {
    pub path: Utf8PathBuf,
    pub document: TextDocument,
    pub project: Arc<Project>,
    pub encoding: PositionEncoding,
}

impl DocumentContext {
    pub fn offset(&self, position: ls_types::Position) -> Option<Offset> {
        position.to_offset(&self.document, self.encoding)
    }

    pub fn span(&self, range: ls_types::Range) -> Option<Span> {
        range.to_span(&self.document, self.encoding)
    }

    pub fn range(&self, span: Span) -> ls_types::Range {
        span.to_lsp_range(&self.document, self.encoding)
    }
}

/// The file an engine analyses for one part of a document.
pub(crate) struct View {
    pub document: Arc<VirtualDocument>,
    pub service: Arc<dyn LanguageService>,
}

impl View {
    pub fn path(&self) -> &Utf8Path {
        &self.document.path
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.document.source_map
    }

    pub fn to_virtual(&self, offset: Offset) -> Option<Offset> {
        self.source_map().to_virtual(offset)
    }

    pub fn span_to_virtual(&self, span: Span) -> Option<Span> {
        self.source_map().span_to_virtual(span)
    }

    /// Translate an engine span back into the document. Spans landing outside
    /// the region the view was built from are dropped.
    pub fn span_to_original(&self, span: Span) -> Option<Span> {
        let original = self.source_map().span_to_original(span)?;
        match &self.document.region {
            Some(region) if !region.content_span.contains_span(original) => {
                tracing::debug!(
                    "Dropping span {:?} of {} outside of its region",
                    original,
                    self.path()
                );
                None
            }
            _ => Some(original),
        }
    }

    /// Unwrap an engine result. Failures are logged and read as "nothing".
    pub fn recover<T>(&self, operation: &str, result: ServiceResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("{} failed for {}: {}", operation, self.path(), err);
                None
            }
        }
    }
}

impl LanguageServices {
    /// Resolve `url` to an open document and its project, making sure the
    /// project tracks the document.
    pub(crate) fn context(&self, url: &Url) -> Option<DocumentContext> {
        let Some(path) = url_to_path(url) else {
            tracing::debug!("Ignoring request for non-file URL {}", url);
            return None;
        };
        let Some(document) = self.buffers().get(&path) else {
            tracing::debug!("Ignoring request for {} which is not open", path);
            return None;
        };
        let directory = path.parent()?;
        let project = self.projects().project_for(directory);
        project.track(&path);

        Some(DocumentContext {
            path,
            document,
            project,
            encoding: self.position_encoding(),
        })
    }

    /// The view answering requests at `offset` of the document. Outside of a
    /// script or template region there is none.
    pub(crate) fn view_at(&self, cx: &DocumentContext, offset: Offset) -> Option<View> {
        if !is_composite(&cx.path) {
            return Some(Self::plain_view(cx));
        }
        let regions = match self.vfs().regions(&cx.path) {
            Ok(regions) => regions,
            Err(err) => {
                tracing::warn!("Cannot segment {}: {}", cx.path, err);
                return None;
            }
        };
        let target = match regions.region_at(offset)?.kind {
            RegionKind::Script => VirtualTarget::Script,
            RegionKind::Template => VirtualTarget::Template,
            RegionKind::Style | RegionKind::Custom => return None,
        };
        self.view(cx, target)
    }

    /// The `target` view of a component. Empty views and views of a snapshot
    /// other than the one the request was made against yield `None`.
    pub(crate) fn view(&self, cx: &DocumentContext, target: VirtualTarget) -> Option<View> {
        if !is_composite(&cx.path) {
            return (target == VirtualTarget::Script).then(|| Self::plain_view(cx));
        }
        let document = match self.vfs().virtual_document(&cx.path, target) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!("Cannot build {:?} view of {}: {}", target, cx.path, err);
                return None;
            }
        };
        if document.is_empty() {
            return None;
        }
        if document.version != cx.document.version() {
            tracing::debug!(
                "Discarding view of {} at version {}, request was for {}",
                cx.path,
                document.version,
                cx.document.version()
            );
            return None;
        }
        let service = match target {
            VirtualTarget::Template => cx.project.template(),
            VirtualTarget::Script | VirtualTarget::Style(_) => cx.project.script(),
        };
        Some(View {
            document,
            service: Arc::clone(service),
        })
    }

    /// Plain script files are their own view.
    fn plain_view(cx: &DocumentContext) -> View {
        let text = cx.document.text();
        let range = Span::from_parts(0, text.len());
        View {
            document: Arc::new(VirtualDocument {
                path: cx.path.clone(),
                language: cx.document.language_id().as_str().to_string(),
                text,
                version: cx.document.version(),
                source_map: SourceMap::Identity { range },
                region: None,
            }),
            service: Arc::clone(cx.project.service_for(&cx.path)),
        }
    }
}
