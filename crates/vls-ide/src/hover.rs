use tower_lsp_server::ls_types;
use url::Url;
use vls_script::QuickInfo;
use vls_script::SignatureHelpItems;

use crate::services::LanguageServices;

impl LanguageServices {
    /// Quick info for the symbol under the cursor. Positions outside of the
    /// script and template regions have none.
    pub fn hover(&self, url: &Url, position: ls_types::Position) -> Option<ls_types::Hover> {
        let cx = self.context(url)?;
        let offset = cx.offset(position)?;
        let view = self.view_at(&cx, offset)?;
        let virtual_offset = view.to_virtual(offset)?;

        let info = view
            .recover(
                "quick info",
                view.service.quick_info(view.path(), virtual_offset),
            )
            .flatten()?;
        let range = view.span_to_original(info.span).map(|span| cx.range(span));

        Some(ls_types::Hover {
            contents: ls_types::HoverContents::Markup(ls_types::MarkupContent {
                kind: ls_types::MarkupKind::Markdown,
                value: hover_markdown(&info),
            }),
            range,
        })
    }

    pub fn signature_help(
        &self,
        url: &Url,
        position: ls_types::Position,
    ) -> Option<ls_types::SignatureHelp> {
        let cx = self.context(url)?;
        let offset = cx.offset(position)?;
        let view = self.view_at(&cx, offset)?;
        let virtual_offset = view.to_virtual(offset)?;

        let items = view
            .recover(
                "signature help",
                view.service.signature_help(view.path(), virtual_offset),
            )
            .flatten()?;
        Some(to_signature_help(items))
    }
}

fn hover_markdown(info: &QuickInfo) -> String {
    let mut value = format!("```typescript\n{}\n```", info.display);
    if !info.documentation.is_empty() {
        value.push_str("\n\n");
        value.push_str(&info.documentation);
    }
    value
}

fn to_signature_help(items: SignatureHelpItems) -> ls_types::SignatureHelp {
    let signatures = items
        .items
        .into_iter()
        .map(|item| ls_types::SignatureInformation {
            label: item.label,
            documentation: (!item.documentation.is_empty())
                .then(|| ls_types::Documentation::String(item.documentation)),
            parameters: Some(
                item.parameters
                    .into_iter()
                    .map(|parameter| ls_types::ParameterInformation {
                        label: ls_types::ParameterLabel::Simple(parameter),
                        documentation: None,
                    })
                    .collect(),
            ),
            active_parameter: None,
        })
        .collect();
    ls_types::SignatureHelp {
        signatures,
        active_signature: Some(items.active_item),
        active_parameter: Some(items.active_parameter),
    }
}
