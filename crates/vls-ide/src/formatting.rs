use tower_lsp_server::ls_types;
use url::Url;
use vls_embedded::VirtualTarget;
use vls_script::FormatOptions;
use vls_source::Span;

use crate::services::LanguageServices;

impl LanguageServices {
    /// Re-indent the script of a document, or the part of it inside `range`.
    ///
    /// Only the script region is formatted; markup and styles are left to
    /// dedicated formatters. Nothing happens when formatting is disabled in
    /// the settings.
    pub fn format(
        &self,
        url: &Url,
        range: Option<ls_types::Range>,
        options: &ls_types::FormattingOptions,
    ) -> Vec<ls_types::TextEdit> {
        if !self.settings().format.enabled {
            return Vec::new();
        }
        let Some(cx) = self.context(url) else {
            return Vec::new();
        };
        let Some(view) = self.view(&cx, VirtualTarget::Script) else {
            return Vec::new();
        };

        let bounds = view
            .document
            .region
            .as_ref()
            .map_or_else(
                || Span::from_parts(0, cx.document.content().len()),
                |region| region.content_span,
            );
        let requested = match range {
            Some(range) => match cx.span(range) {
                Some(span) => span,
                None => return Vec::new(),
            },
            None => bounds,
        };
        let Some(span) = intersection(requested, bounds) else {
            return Vec::new();
        };
        let Some(virtual_span) = view.span_to_virtual(span) else {
            return Vec::new();
        };

        let options = FormatOptions {
            tab_size: options.tab_size,
            insert_spaces: options.insert_spaces,
        };
        view.recover(
            "formatting",
            view.service
                .formatting_edits(view.path(), virtual_span, &options),
        )
        .unwrap_or_default()
        .into_iter()
        // blanked tags read as whitespace to the engine
        .filter(|change| bounds.contains_span(change.span))
        .filter_map(|change| {
            let span = view.span_to_original(change.span)?;
            Some(ls_types::TextEdit::new(cx.range(span), change.new_text))
        })
        .collect()
    }
}

fn intersection(a: Span, b: Span) -> Option<Span> {
    let start = a.start().max(b.start());
    let end = a.end().min(b.end());
    (start <= end).then(|| Span::new(start, end - start))
}
