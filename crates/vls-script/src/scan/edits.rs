use camino::Utf8Path;
use vls_source::Span;

use super::checks;
use super::model::ImportDecl;
use super::model::ImportedName;
use super::model::SourceModel;
use crate::service::CodeFixAction;
use crate::service::FileTextChanges;
use crate::service::SymbolKind;
use crate::service::TextChange;

pub(crate) const DELETE_FIX: &str = "unusedIdentifier_delete";
pub(crate) const PREFIX_FIX: &str = "unusedIdentifier_prefix";

/// Fixes for the unused declaration at `declaration`.
pub(crate) fn unused_fixes(
    model: &SourceModel,
    path: &Utf8Path,
    declaration: usize,
) -> Vec<CodeFixAction> {
    let target = &model.declarations[declaration];
    let action = |fix_name: &str, description: String, change: TextChange| CodeFixAction {
        fix_name: fix_name.to_string(),
        description,
        changes: vec![FileTextChanges {
            path: path.to_path_buf(),
            changes: vec![change],
        }],
    };

    match target.kind {
        SymbolKind::Parameter => vec![action(
            PREFIX_FIX,
            format!("Prefix '{}' with an underscore", target.name),
            TextChange {
                span: Span::new(target.span.start(), 0),
                new_text: "_".to_string(),
            },
        )],
        SymbolKind::Alias => {
            let Some((import, _)) = &target.import else {
                return Vec::new();
            };
            let import = &model.imports[*import];
            let unused = checks::unused_declarations(model, true, false);
            let whole_statement = import
                .bindings
                .iter()
                .all(|binding| unused.contains(&binding.declaration));
            let span = if whole_statement {
                line_extended(&model.text, import.statement)
            } else {
                match binding_removal(model, import, declaration) {
                    Some(span) => span,
                    None => return Vec::new(),
                }
            };
            let description = if whole_statement {
                format!("Remove import from '{}'", import.specifier)
            } else {
                format!("Remove unused declaration for: '{}'", target.name)
            };
            vec![action(
                DELETE_FIX,
                description,
                TextChange {
                    span,
                    new_text: String::new(),
                },
            )]
        }
        _ => {
            // one declarator out of several is left alone
            let shared = model
                .declarations
                .iter()
                .filter(|other| other.statement == target.statement)
                .count();
            if shared > 1 {
                return Vec::new();
            }
            vec![action(
                DELETE_FIX,
                format!("Remove unused declaration for: '{}'", target.name),
                TextChange {
                    span: line_extended(&model.text, target.statement),
                    new_text: String::new(),
                },
            )]
        }
    }
}

/// The text to delete to drop one binding out of an import clause.
fn binding_removal(model: &SourceModel, import: &ImportDecl, declaration: usize) -> Option<Span> {
    let text: &str = &model.text;
    let binding = import
        .bindings
        .iter()
        .find(|binding| binding.declaration == declaration)?;
    let start = binding.segment.start_usize();
    let end = binding.segment.end_usize();

    let after = &text[end..];
    let trailing = after.len() - after.trim_start().len();
    if after[trailing..].starts_with(',') {
        let rest = &after[trailing + 1..];
        let spaces = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        return Some(Span::from_bounds(start, end + trailing + 1 + spaces));
    }

    let before = text[..start].trim_end();
    if before.ends_with(',') {
        return Some(Span::from_bounds(before.len() - 1, end));
    }

    // sole named binding next to a default one: `a, { b }`
    if binding.named && before.ends_with('{') {
        let outer = text[..before.len() - 1].trim_end();
        let close = end + after.find('}')? + 1;
        if outer.ends_with(',') {
            return Some(Span::from_bounds(outer.len() - 1, close));
        }
    }
    None
}

/// Widen `span` to whole lines when nothing else shares them.
pub(crate) fn line_extended(text: &str, span: Span) -> Span {
    let start = span.start_usize().min(text.len());
    let end = span.end_usize().min(text.len());
    let line_start = text[..start].rfind('\n').map_or(0, |newline| newline + 1);
    let line_end = text[end..].find('\n').map_or(text.len(), |newline| end + newline + 1);
    if text[line_start..start].trim().is_empty() && text[end..line_end].trim().is_empty() {
        Span::from_bounds(line_start, line_end)
    } else {
        span
    }
}

/// Sort the leading import block by specifier, optionally dropping
/// bindings that are never read.
pub(crate) fn organize_imports(model: &SourceModel, remove_unused: bool) -> Vec<TextChange> {
    let Some(first) = model.imports.first() else {
        return Vec::new();
    };
    let mut block = vec![first];
    for import in &model.imports[1..] {
        let Some(last) = block.last() else {
            break;
        };
        if import.first_token != last.last_token + 1 {
            break;
        }
        block.push(import);
    }

    let unused = if remove_unused {
        checks::unused_declarations(model, true, false)
    } else {
        Vec::new()
    };

    let mut statements: Vec<(String, String)> = block
        .iter()
        .filter_map(|import| {
            let kept: Vec<_> = import
                .bindings
                .iter()
                .filter(|binding| !unused.contains(&binding.declaration))
                .collect();
            if kept.is_empty() && !import.bindings.is_empty() {
                return None;
            }
            let text = if kept.len() == import.bindings.len() {
                import.statement.slice(&model.text)?.to_string()
            } else {
                rebuild_import(model, import, &kept.iter().map(|b| b.declaration).collect::<Vec<_>>())
            };
            Some((import.specifier.to_lowercase(), text))
        })
        .collect();
    statements.sort_by(|left, right| left.0.cmp(&right.0));

    let Some(last) = block.last() else {
        return Vec::new();
    };
    let span = Span::from_bounds(first.statement.start_usize(), last.statement.end_usize());
    let new_text = statements
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n");

    if span.slice(&model.text) == Some(new_text.as_str()) {
        return Vec::new();
    }
    let span = if new_text.is_empty() {
        line_extended(&model.text, span)
    } else {
        span
    };
    vec![TextChange { span, new_text }]
}

fn rebuild_import(model: &SourceModel, import: &ImportDecl, kept: &[usize]) -> String {
    let mut clauses = Vec::new();
    let mut named = Vec::new();
    for binding in import
        .bindings
        .iter()
        .filter(|binding| kept.contains(&binding.declaration))
    {
        let segment = binding.segment.slice(&model.text).unwrap_or_default();
        match &model.declarations[binding.declaration].import {
            Some((_, ImportedName::Named(_))) => named.push(segment),
            _ => clauses.push(segment.to_string()),
        }
    }
    if !named.is_empty() {
        clauses.push(format!("{{ {} }}", named.join(", ")));
    }
    let quoted = import.specifier_span.slice(&model.text).unwrap_or_default();
    let keyword = if import.type_only {
        "import type"
    } else {
        "import"
    };
    let semicolon = if model.is_punct(import.last_token, ";") {
        ";"
    } else {
        ""
    };
    format!("{keyword} {} from {quoted}{semicolon}", clauses.join(", "))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::host::ScriptKind;

    fn model(text: &str) -> SourceModel {
        SourceModel::build(Arc::from(text), ScriptKind::Ts)
    }

    fn apply(text: &str, changes: &[TextChange]) -> String {
        let mut result = text.to_string();
        let mut sorted = changes.to_vec();
        sorted.sort_by_key(|change| std::cmp::Reverse(change.span.start()));
        for change in sorted {
            result.replace_range(change.span.start_usize()..change.span.end_usize(), &change.new_text);
        }
        result
    }

    fn index_of(model: &SourceModel, name: &str) -> usize {
        model
            .declarations
            .iter()
            .position(|d| d.name == name)
            .unwrap()
    }

    #[test]
    fn test_remove_whole_import_line() {
        let text = "import a from './a';\nimport b from './b';\nexport default b;\n";
        let model = model(text);
        let fixes = unused_fixes(&model, Utf8Path::new("x.ts"), index_of(&model, "a"));
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].fix_name, DELETE_FIX);
        let result = apply(text, &fixes[0].changes[0].changes);
        assert_eq!(result, "import b from './b';\nexport default b;\n");
    }

    #[test]
    fn test_remove_one_named_binding() {
        let text = "import { a, b } from './m';\nexport default b;\n";
        let model = model(text);
        let fixes = unused_fixes(&model, Utf8Path::new("x.ts"), index_of(&model, "a"));
        let result = apply(text, &fixes[0].changes[0].changes);
        assert_eq!(result, "import { b } from './m';\nexport default b;\n");
    }

    #[test]
    fn test_remove_last_named_binding() {
        let text = "import { a, b } from './m';\nexport default a;\n";
        let model = model(text);
        let fixes = unused_fixes(&model, Utf8Path::new("x.ts"), index_of(&model, "b"));
        let result = apply(text, &fixes[0].changes[0].changes);
        assert_eq!(result, "import { a } from './m';\nexport default a;\n");
    }

    #[test]
    fn test_prefix_parameter() {
        let text = "export function f(a) {}\n";
        let model = model(text);
        let fixes = unused_fixes(&model, Utf8Path::new("x.ts"), index_of(&model, "a"));
        assert_eq!(fixes[0].fix_name, PREFIX_FIX);
        assert_eq!(
            apply(text, &fixes[0].changes[0].changes),
            "export function f(_a) {}\n"
        );
    }

    #[test]
    fn test_organize_imports_sorts_and_drops_unused() {
        let text = "import z from './z';\nimport { b, unused } from './b';\nimport gone from './gone';\nexport default [z, b];\n";
        let model = model(text);
        let changes = organize_imports(&model, true);
        insta::assert_snapshot!(apply(text, &changes), @r"
        import { b } from './b';
        import z from './z';
        export default [z, b];
        ");
    }

    #[test]
    fn test_organize_imports_is_idempotent() {
        let text = "import b from './b';\nimport z from './z';\nexport default [z, b];\n";
        let model = model(text);
        assert!(organize_imports(&model, true).is_empty());
    }
}
