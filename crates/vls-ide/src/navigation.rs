use tower_lsp_server::ls_types;
use url::Url;
use vls_embedded::VirtualTarget;
use vls_script::FileSpan;
use vls_script::NavigationItem;
use vls_script::ServiceResult;
use vls_source::Offset;

use crate::context::DocumentContext;
use crate::context::View;
use crate::ext::highlight_kind;
use crate::ext::SymbolKindExt;
use crate::services::LanguageServices;

impl LanguageServices {
    pub fn document_highlights(
        &self,
        url: &Url,
        position: ls_types::Position,
    ) -> Vec<ls_types::DocumentHighlight> {
        let Some(cx) = self.context(url) else {
            return Vec::new();
        };
        let Some(offset) = cx.offset(position) else {
            return Vec::new();
        };
        let Some(view) = self.view_at(&cx, offset) else {
            return Vec::new();
        };
        let Some(virtual_offset) = view.to_virtual(offset) else {
            return Vec::new();
        };

        view.recover(
            "document highlights",
            view.service.document_highlights(view.path(), virtual_offset),
        )
        .unwrap_or_default()
        .into_iter()
        .filter_map(|highlight| {
            let span = view.span_to_original(highlight.span)?;
            Some(ls_types::DocumentHighlight {
                range: cx.range(span),
                kind: Some(highlight_kind(highlight.kind)),
            })
        })
        .collect()
    }

    /// Outline of the script. Template views only hold generated scaffolding
    /// and contribute nothing.
    pub fn document_symbols(&self, url: &Url) -> Vec<ls_types::DocumentSymbol> {
        let Some(cx) = self.context(url) else {
            return Vec::new();
        };
        let Some(view) = self.view(&cx, VirtualTarget::Script) else {
            return Vec::new();
        };
        view.recover(
            "navigation tree",
            view.service.navigation_tree(view.path()),
        )
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| document_symbol(&cx, &view, item))
        .collect()
    }

    pub fn find_definition(
        &self,
        url: &Url,
        position: ls_types::Position,
    ) -> Vec<ls_types::Location> {
        self.locations(url, position, "definition", |view, offset| {
            view.service.definition(view.path(), offset)
        })
    }

    pub fn find_references(
        &self,
        url: &Url,
        position: ls_types::Position,
    ) -> Vec<ls_types::Location> {
        self.locations(url, position, "references", |view, offset| {
            view.service.references(view.path(), offset)
        })
    }

    fn locations(
        &self,
        url: &Url,
        position: ls_types::Position,
        operation: &str,
        query: impl FnOnce(&View, Offset) -> ServiceResult<Vec<FileSpan>>,
    ) -> Vec<ls_types::Location> {
        let Some(cx) = self.context(url) else {
            return Vec::new();
        };
        let Some(offset) = cx.offset(position) else {
            return Vec::new();
        };
        let Some(view) = self.view_at(&cx, offset) else {
            return Vec::new();
        };
        let Some(virtual_offset) = view.to_virtual(offset) else {
            return Vec::new();
        };

        let mut locations: Vec<ls_types::Location> = view
            .recover(operation, query(&view, virtual_offset))
            .unwrap_or_default()
            .iter()
            .filter_map(|file_span| self.location(file_span))
            .collect();
        // a template and a script view of one component can point at the
        // same place
        locations.dedup();
        locations
    }
}

#[allow(deprecated)]
fn document_symbol(
    cx: &DocumentContext,
    view: &View,
    item: NavigationItem,
) -> Option<ls_types::DocumentSymbol> {
    let span = view.span_to_original(item.span)?;
    let selection = view
        .span_to_original(item.selection_span)
        .filter(|selection| span.contains_span(*selection))
        .unwrap_or(span);
    let children: Vec<_> = item
        .children
        .into_iter()
        .filter_map(|child| document_symbol(cx, view, child))
        .collect();
    Some(ls_types::DocumentSymbol {
        name: item.name,
        detail: Some(item.kind.label().to_string()),
        kind: item.kind.to_symbol_kind(),
        tags: None,
        deprecated: None,
        range: cx.range(span),
        selection_range: cx.range(selection),
        children: (!children.is_empty()).then_some(children),
    })
}
