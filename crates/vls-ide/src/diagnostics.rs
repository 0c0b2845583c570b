use tower_lsp_server::ls_types;
use url::Url;
use vls_embedded::VirtualTarget;
use vls_workspace::is_composite;

use crate::context::DocumentContext;
use crate::context::View;
use crate::ext::to_lsp_diagnostic;
use crate::services::LanguageServices;

impl LanguageServices {
    /// Diagnostics of an open document.
    ///
    /// For a component the script view is checked by the script engine and
    /// the template view by the template engine, each only when enabled in
    /// the settings. Both lists are merged and ordered by position. Findings
    /// without a position in the component are dropped.
    #[tracing::instrument(skip_all, fields(url = %url))]
    pub fn validate(&self, url: &Url) -> Vec<ls_types::Diagnostic> {
        let Some(cx) = self.context(url) else {
            return Vec::new();
        };
        let settings = self.settings();
        let mut diagnostics = Vec::new();

        if settings.script_validation() {
            if let Some(view) = self.view(&cx, VirtualTarget::Script) {
                collect(&cx, &view, &mut diagnostics);
            }
        }
        if settings.template_validation() && is_composite(&cx.path) {
            if let Some(view) = self.view(&cx, VirtualTarget::Template) {
                collect(&cx, &view, &mut diagnostics);
            }
        }

        diagnostics.sort_by_key(|diagnostic| {
            (diagnostic.range.start.line, diagnostic.range.start.character)
        });
        tracing::debug!("{} diagnostic(s) for {}", diagnostics.len(), cx.path);
        diagnostics
    }
}

fn collect(cx: &DocumentContext, view: &View, diagnostics: &mut Vec<ls_types::Diagnostic>) {
    let syntactic = view
        .recover(
            "syntactic diagnostics",
            view.service.syntactic_diagnostics(view.path()),
        )
        .unwrap_or_default();
    let semantic = view
        .recover(
            "semantic diagnostics",
            view.service.semantic_diagnostics(view.path()),
        )
        .unwrap_or_default();

    for diagnostic in syntactic.iter().chain(&semantic) {
        match view.span_to_original(diagnostic.span) {
            Some(span) => diagnostics.push(to_lsp_diagnostic(diagnostic, cx.range(span))),
            None => tracing::trace!(
                "Dropping unmapped diagnostic {} of {}",
                diagnostic.code,
                view.path()
            ),
        }
    }
}
