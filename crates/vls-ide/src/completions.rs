//! Completion and lazy completion details.

use serde::Deserialize;
use serde::Serialize;
use tower_lsp_server::ls_types;
use url::Url;
use vls_script::CompletionEntry;
use vls_source::Offset;

use crate::context::DocumentContext;
use crate::context::View;
use crate::ext::SymbolKindExt;
use crate::services::LanguageServices;

/// What a completion item carries to [`LanguageServices::resolve_completion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionData {
    pub uri: String,
    /// Offset in the document the completion was requested at.
    pub offset: u32,
}

impl LanguageServices {
    pub fn complete(
        &self,
        url: &Url,
        position: ls_types::Position,
    ) -> Vec<ls_types::CompletionItem> {
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

        let entries = view
            .recover(
                "completions",
                view.service.completions(view.path(), virtual_offset),
            )
            .unwrap_or_default();
        let data = serde_json::to_value(CompletionData {
            uri: url.to_string(),
            offset: offset.get(),
        })
        .ok();

        entries
            .into_iter()
            .map(|entry| completion_item(&cx, &view, entry, data.clone()))
            .collect()
    }

    /// Fill in the detail and documentation of an item produced by
    /// [`complete`](Self::complete). Items that cannot be resolved are
    /// returned unchanged.
    pub fn resolve_completion(&self, item: ls_types::CompletionItem) -> ls_types::CompletionItem {
        let Some(data) = item
            .data
            .clone()
            .and_then(|data| serde_json::from_value::<CompletionData>(data).ok())
        else {
            return item;
        };
        let Some(cx) = Url::parse(&data.uri)
            .ok()
            .and_then(|url| self.context(&url))
        else {
            return item;
        };
        let offset = Offset::new(data.offset);
        let Some(view) = self.view_at(&cx, offset) else {
            return item;
        };
        let Some(virtual_offset) = view.to_virtual(offset) else {
            return item;
        };

        let details = view
            .recover(
                "completion details",
                view.service
                    .completion_details(view.path(), virtual_offset, &item.label),
            )
            .flatten();
        let Some(details) = details else {
            return item;
        };

        ls_types::CompletionItem {
            detail: Some(details.display),
            documentation: (!details.documentation.is_empty()).then(|| {
                ls_types::Documentation::MarkupContent(ls_types::MarkupContent {
                    kind: ls_types::MarkupKind::Markdown,
                    value: details.documentation,
                })
            }),
            ..item
        }
    }
}

fn completion_item(
    cx: &DocumentContext,
    view: &View,
    entry: CompletionEntry,
    data: Option<serde_json::Value>,
) -> ls_types::CompletionItem {
    let text_edit = entry
        .replacement_span
        .and_then(|span| view.span_to_original(span))
        .map(|span| {
            ls_types::CompletionTextEdit::Edit(ls_types::TextEdit::new(
                cx.range(span),
                entry.name.clone(),
            ))
        });
    ls_types::CompletionItem {
        label: entry.name,
        kind: Some(entry.kind.to_completion_kind()),
        sort_text: Some(entry.sort_text),
        text_edit,
        data,
        ..Default::default()
    }
}
