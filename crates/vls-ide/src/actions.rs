//! Code fixes and refactorings.
//!
//! Both are offered as commands. A fix carries its finished workspace edit;
//! a refactoring carries a [`RefactorArguments`] descriptor the client hands
//! back to [`LanguageServices::apply_refactor`] once the user picks it.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use tower_lsp_server::ls_types;
use url::Url;

use crate::ext::diagnostic_code;
use crate::services::LanguageServices;

/// Command whose single argument is a workspace edit to apply as is.
pub const APPLY_EDIT_COMMAND: &str = "vls.applyWorkspaceEdit";
/// Command whose single argument is a [`RefactorArguments`].
pub const APPLY_REFACTOR_COMMAND: &str = "vls.applyRefactor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactorArguments {
    pub uri: String,
    pub range: ls_types::Range,
    pub refactor: String,
    pub action: String,
}

impl LanguageServices {
    /// Fixes for the given diagnostics and the refactorings available for
    /// `range`.
    pub fn code_actions(
        &self,
        url: &Url,
        range: ls_types::Range,
        diagnostics: &[ls_types::Diagnostic],
    ) -> Vec<ls_types::Command> {
        let Some(cx) = self.context(url) else {
            return Vec::new();
        };
        let Some(span) = cx.span(range) else {
            return Vec::new();
        };
        let Some(view) = self.view_at(&cx, span.start_offset()) else {
            return Vec::new();
        };
        let Some(virtual_span) = view.span_to_virtual(span) else {
            return Vec::new();
        };

        let mut commands = Vec::new();

        let codes: Vec<u32> = diagnostics.iter().filter_map(diagnostic_code).collect();
        if !codes.is_empty() {
            let fixes = view
                .recover(
                    "code fixes",
                    view.service.code_fixes(view.path(), virtual_span, &codes),
                )
                .unwrap_or_default();
            for fix in fixes {
                let edit = self.workspace_edit(&fix.changes);
                if edit.changes.as_ref().is_none_or(HashMap::is_empty) {
                    continue;
                }
                let Ok(argument) = serde_json::to_value(edit) else {
                    continue;
                };
                commands.push(ls_types::Command::new(
                    fix.description,
                    APPLY_EDIT_COMMAND.to_string(),
                    Some(vec![argument]),
                ));
            }
        }

        let refactors = view
            .recover(
                "applicable refactors",
                view.service.applicable_refactors(view.path(), virtual_span),
            )
            .unwrap_or_default();
        for refactor in refactors {
            for action in refactor.actions {
                let arguments = RefactorArguments {
                    uri: url.to_string(),
                    range,
                    refactor: refactor.name.clone(),
                    action: action.name,
                };
                let Ok(argument) = serde_json::to_value(arguments) else {
                    continue;
                };
                commands.push(ls_types::Command::new(
                    action.description,
                    APPLY_REFACTOR_COMMAND.to_string(),
                    Some(vec![argument]),
                ));
            }
        }

        commands
    }

    /// Compute the edits of a refactoring offered by
    /// [`code_actions`](Self::code_actions).
    pub fn apply_refactor(
        &self,
        arguments: serde_json::Value,
    ) -> Option<ls_types::WorkspaceEdit> {
        let arguments: RefactorArguments = match serde_json::from_value(arguments) {
            Ok(arguments) => arguments,
            Err(err) => {
                tracing::warn!("Malformed refactor arguments: {}", err);
                return None;
            }
        };
        let url = Url::parse(&arguments.uri).ok()?;
        let cx = self.context(&url)?;
        let span = cx.span(arguments.range)?;
        let view = self.view_at(&cx, span.start_offset())?;
        let virtual_span = view.span_to_virtual(span)?;

        let edits = view.recover(
            "refactor edits",
            view.service.edits_for_refactor(
                view.path(),
                virtual_span,
                &arguments.refactor,
                &arguments.action,
            ),
        )?;
        Some(self.workspace_edit(&edits.edits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refactor_arguments_wire_shape() {
        let arguments = RefactorArguments {
            uri: "file:///p/App.vue".to_string(),
            range: ls_types::Range::default(),
            refactor: "Organize imports".to_string(),
            action: "organize".to_string(),
        };
        let value = serde_json::to_value(&arguments).unwrap();
        assert_eq!(value["uri"], "file:///p/App.vue");
        assert_eq!(value["range"]["start"]["line"], 0);
        assert_eq!(
            serde_json::from_value::<RefactorArguments>(value).unwrap(),
            arguments
        );
    }
}
