use vls_source::Offset;
use vls_source::Span;

use super::model::FunctionKind;
use super::model::SourceModel;
use super::Context;
use crate::lexer::LexErrorKind;
use crate::lexer::TokenKind;
use crate::service::DiagnosticCategory;
use crate::service::ServiceDiagnostic;
use crate::service::SymbolKind;

/// Operators that need an operand on their right.
const BINARY_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=", "=>", "+", "-", "*", "/", "%", "**", "&&", "||", "??", "==", "===", "!=",
    "!==", "<=", ">=", "&", "|", "^", "<<", ">>>", "~",
];

pub(crate) fn syntactic(model: &SourceModel) -> Vec<ServiceDiagnostic> {
    let mut diagnostics: Vec<ServiceDiagnostic> = model
        .lex_errors
        .iter()
        .map(|error| {
            let (code, message) = match error.kind {
                LexErrorKind::UnterminatedString => (1002, "Unterminated string literal."),
                LexErrorKind::UnterminatedTemplate => (1160, "Unterminated template literal."),
                LexErrorKind::UnterminatedComment => (1010, "'*/' expected."),
                LexErrorKind::UnterminatedRegex => {
                    (1161, "Unterminated regular expression literal.")
                }
                LexErrorKind::InvalidCharacter => (1127, "Invalid character."),
            };
            ServiceDiagnostic::error(error.span, code, message)
        })
        .collect();

    for &closer in &model.unmatched_closers {
        diagnostics.push(ServiceDiagnostic::error(
            model.tokens[closer].span,
            1128,
            "Declaration or statement expected.",
        ));
    }

    let end_of_input = model
        .tokens
        .last()
        .map_or(Span::new(0, 0), |token| Span::new(token.span.end(), 0));
    for &opener in &model.unclosed_openers {
        let expected = match model.text_at(opener) {
            "(" => "')' expected.",
            "[" => "']' expected.",
            _ => "'}' expected.",
        };
        diagnostics.push(ServiceDiagnostic::error(end_of_input, 1005, expected));
    }

    for (index, token) in model.tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        let text = token.text(&model.text);
        let next = model.tokens.get(index + 1);
        let missing_operand = next.map_or(true, |next| {
            next.kind == TokenKind::Punct
                && matches!(next.text(&model.text), ";" | ")" | "]" | "}" | ",")
        });
        if !missing_operand {
            continue;
        }
        let at = next.map_or(Span::new(token.span.end(), 0), |next| next.span);
        if BINARY_OPERATORS.contains(&text) {
            diagnostics.push(ServiceDiagnostic::error(at, 1109, "Expression expected."));
        } else if text == "." {
            diagnostics.push(ServiceDiagnostic::error(at, 1003, "Identifier expected."));
        }
    }

    diagnostics.sort_by_key(|diagnostic| (diagnostic.span.start(), diagnostic.code));
    diagnostics
}

/// Declarations whose value is never read. Exported names and parameters
/// starting with `_` are never reported.
pub(crate) fn unused_declarations(
    model: &SourceModel,
    locals: bool,
    parameters: bool,
) -> Vec<usize> {
    let file = model.file_span();
    model
        .declarations
        .iter()
        .enumerate()
        .filter(|(_, declaration)| {
            if declaration.exported {
                return false;
            }
            if declaration.kind == SymbolKind::Parameter {
                return parameters && !declaration.name.starts_with('_');
            }
            // catch clause bindings
            if declaration.kind == SymbolKind::Let && declaration.statement == declaration.span {
                return false;
            }
            // top-level names of a global script are visible to other files
            locals && (model.is_module || declaration.scope != file)
        })
        .filter(|(index, _)| model.references(*index).is_empty())
        .map(|(index, _)| index)
        .collect()
}

pub(crate) fn semantic(cx: &Context<'_>) -> Vec<ServiceDiagnostic> {
    let model = &cx.model;
    let mut diagnostics = Vec::new();

    for import in &model.imports {
        if cx.host.resolve_module(&import.specifier, cx.path).is_none() {
            diagnostics.push(ServiceDiagnostic::error(
                import.specifier_span,
                2307,
                format!(
                    "Cannot find module '{}' or its corresponding type declarations.",
                    import.specifier
                ),
            ));
        }
    }

    missing_this_members(cx, &mut diagnostics);

    let options = cx.options;
    for index in unused_declarations(model, options.no_unused_locals(), options.no_unused_parameters())
    {
        let declaration = &model.declarations[index];
        diagnostics.push(ServiceDiagnostic {
            span: declaration.span,
            message: format!("'{}' is declared but its value is never read.", declaration.name),
            code: 6133,
            category: DiagnosticCategory::Error,
            reports_unnecessary: true,
        });
    }

    if options.no_implicit_any() && model.kind.is_typescript() {
        implicit_any(model, &mut diagnostics);
    }

    diagnostics.sort_by_key(|diagnostic| (diagnostic.span.start(), diagnostic.code));
    diagnostics
}

fn missing_this_members(cx: &Context<'_>, diagnostics: &mut Vec<ServiceDiagnostic>) {
    let model = &cx.model;
    for function in &model.functions {
        let Some(component) = cx.this_component(function) else {
            continue;
        };
        let Some(shape) = component.model.component.as_ref() else {
            continue;
        };
        if shape.open {
            continue;
        }
        let label = shape
            .name
            .clone()
            .unwrap_or_else(|| component_label(component.path.as_str()));

        // nested non-arrow functions rebind `this`
        let rebound: Vec<Span> = model
            .functions
            .iter()
            .filter(|inner| inner.kind != FunctionKind::Arrow)
            .map(|inner| inner.body)
            .filter(|body| function.body.contains_span(*body) && *body != function.body)
            .collect();

        for index in 0..model.tokens.len() {
            let span = model.tokens[index].span;
            if !function.body.contains(Offset::new(span.start()))
                || !model.is_this_member(index)
                || rebound.iter().any(|body| body.contains(span.start_offset()))
            {
                continue;
            }
            let name = model.text_at(index);
            if name.starts_with('$') || shape.member(name).is_some() {
                continue;
            }
            diagnostics.push(ServiceDiagnostic::error(
                span,
                2339,
                format!("Property '{name}' does not exist on type '{label}'."),
            ));
        }
    }
}

/// `src/App.vue.ts` is labelled `App`.
fn component_label(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.split('.').next().unwrap_or(file).to_string()
}

fn implicit_any(model: &SourceModel, diagnostics: &mut Vec<ServiceDiagnostic>) {
    for function in &model.functions {
        if function.kind == FunctionKind::Arrow || function.in_argument {
            continue;
        }
        for &param in &function.params {
            let declaration = &model.declarations[param];
            if declaration.annotation.is_some() || declaration.has_default {
                continue;
            }
            let segment = declaration.statement.slice(&model.text).unwrap_or_default();
            let diagnostic = if segment.starts_with("...") {
                ServiceDiagnostic::error(
                    declaration.span,
                    7019,
                    format!(
                        "Rest parameter '{}' implicitly has an 'any[]' type.",
                        declaration.name
                    ),
                )
            } else if declaration.statement.start() == declaration.span.start() {
                ServiceDiagnostic::error(
                    declaration.span,
                    7006,
                    format!("Parameter '{}' implicitly has an 'any' type.", declaration.name),
                )
            } else {
                ServiceDiagnostic::error(
                    declaration.span,
                    7031,
                    format!(
                        "Binding element '{}' implicitly has an 'any' type.",
                        declaration.name
                    ),
                )
            };
            diagnostics.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::host::ScriptKind;

    fn model(text: &str) -> SourceModel {
        SourceModel::build(Arc::from(text), ScriptKind::Ts)
    }

    fn codes(diagnostics: &[ServiceDiagnostic]) -> Vec<u32> {
        diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_expression_expected_at_end_of_input() {
        let text = "export default { data() { return { x: 1 } } }\nconst y = ";
        let diagnostics = syntactic(&model(text));
        assert_eq!(codes(&diagnostics), vec![1109]);
        assert_eq!(diagnostics[0].span, Span::new(text.trim_end().len() as u32, 0));
    }

    #[test]
    fn test_expression_expected_before_closer() {
        let diagnostics = syntactic(&model("foo(a +);"));
        assert_eq!(codes(&diagnostics), vec![1109]);
        assert_eq!(diagnostics[0].span, Span::new(7, 1));
    }

    #[test]
    fn test_identifier_expected_after_dot() {
        let diagnostics = syntactic(&model("foo(a.)"));
        assert_eq!(codes(&diagnostics), vec![1003]);
    }

    #[test]
    fn test_bracket_errors() {
        assert_eq!(codes(&syntactic(&model("if (a) { b();"))), vec![1005]);
        assert_eq!(codes(&syntactic(&model("a();\n}"))), vec![1128]);
    }

    #[test]
    fn test_lexer_errors_surface() {
        let diagnostics = syntactic(&model("const s = 'abc"));
        assert_eq!(codes(&diagnostics), vec![1002]);
    }

    #[test]
    fn test_non_null_and_increment_are_not_operators() {
        assert!(syntactic(&model("a!;\nb++;\nc--;")).is_empty());
    }

    #[test]
    fn test_unused_declarations() {
        let model = model(
            "import { used, unused } from './x';\nexport const kept = used;\nfunction f(a, _b, c) { return c; }\nf(1, 2, 3);",
        );
        let unused: Vec<&str> = unused_declarations(&model, true, true)
            .into_iter()
            .map(|i| model.declarations[i].name.as_str())
            .collect();
        assert_eq!(unused, vec!["unused", "a"]);

        let locals_only: Vec<&str> = unused_declarations(&model, true, false)
            .into_iter()
            .map(|i| model.declarations[i].name.as_str())
            .collect();
        assert_eq!(locals_only, vec!["unused"]);
    }

    #[test]
    fn test_global_script_top_level_is_not_unused() {
        let model = model("const a = 1;\nfunction f() { const b = 2; }");
        let unused: Vec<&str> = unused_declarations(&model, true, true)
            .into_iter()
            .map(|i| model.declarations[i].name.as_str())
            .collect();
        assert_eq!(unused, vec!["b"]);
    }

    #[test]
    fn test_implicit_any() {
        let model = model(
            "function f(a, b: number, c = 1, ...rest) {}\nconst g = (x) => x;\nitems.map(function (y) { return y; });",
        );
        let mut diagnostics = Vec::new();
        implicit_any(&model, &mut diagnostics);
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Parameter 'a' implicitly has an 'any' type.",
                "Rest parameter 'rest' implicitly has an 'any[]' type.",
            ]
        );
    }

    #[test]
    fn test_component_label() {
        assert_eq!(component_label("/p/src/App.vue.ts"), "App");
        assert_eq!(component_label("Counter.vue.template.ts"), "Counter");
    }
}
