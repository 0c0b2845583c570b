use vls_source::Span;

use super::model::SourceModel;
use crate::lexer::TokenKind;
use crate::service::FormatOptions;
use crate::service::TextChange;

/// Re-indent every line that starts inside `span` by bracket depth and clear
/// whitespace-only lines. Lines inside multi-line literals and comments are
/// left alone.
pub(crate) fn formatting_edits(
    model: &SourceModel,
    span: Span,
    options: &FormatOptions,
) -> Vec<TextChange> {
    let text: &str = &model.text;
    let unit = options.indent_unit();
    let mut changes = Vec::new();
    let mut depth = 0usize;
    let mut next_token = 0usize;

    let line_starts = std::iter::once(0).chain(
        text.char_indices()
            .filter(|(_, c)| *c == '\n')
            .map(|(index, _)| index + 1),
    );

    for line_start in line_starts {
        if line_start > text.len() {
            break;
        }
        let line = &text[line_start..];
        let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        let content_start = line_start + indent_len;

        while let Some(token) = model.tokens.get(next_token) {
            if token.span.start_usize() >= content_start {
                break;
            }
            if token.kind == TokenKind::Punct {
                match token.text(text) {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            next_token += 1;
        }

        let start = u32::try_from(line_start).unwrap_or(u32::MAX);
        if start < span.start() || start > span.end() {
            continue;
        }
        let inside_literal = model
            .tokens
            .get(next_token.wrapping_sub(1))
            .is_some_and(|token| token.span.end_usize() > content_start)
            || model.comments.iter().any(|comment| {
                comment.span.start_usize() < line_start && comment.span.end_usize() > line_start
            });
        if inside_literal {
            continue;
        }

        let indent = Span::from_bounds(line_start, content_start);
        let blank = line[indent_len..].starts_with(['\n', '\r']) || indent_len == line.len();
        let desired = if blank {
            String::new()
        } else {
            let closes = model
                .tokens
                .get(next_token)
                .filter(|token| token.span.start_usize() == content_start)
                .is_some_and(|token| {
                    token.kind == TokenKind::Punct && matches!(token.text(text), ")" | "]" | "}")
                });
            let level = if closes { depth.saturating_sub(1) } else { depth };
            unit.repeat(level)
        };

        if indent.slice(text) != Some(desired.as_str()) {
            changes.push(TextChange {
                span: indent,
                new_text: desired,
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::host::ScriptKind;

    fn format(text: &str, options: &FormatOptions) -> String {
        let model = SourceModel::build(Arc::from(text), ScriptKind::Js);
        let mut result = text.to_string();
        let mut changes = formatting_edits(&model, model.file_span(), options);
        changes.reverse();
        for change in changes {
            result.replace_range(change.span.start_usize()..change.span.end_usize(), &change.new_text);
        }
        result
    }

    #[test]
    fn test_reindents_by_depth() {
        let text = "function f() {\nif (a) {\n      b(\n1);\n    }\n}\n";
        insta::assert_snapshot!(format(text, &FormatOptions::default()), @r"
        function f() {
          if (a) {
            b(
              1);
          }
        }
        ");
    }

    #[test]
    fn test_tabs_and_blank_lines() {
        let options = FormatOptions {
            tab_size: 4,
            insert_spaces: false,
        };
        let text = "{\n  a;\n   \n}";
        assert_eq!(format(text, &options), "{\n\ta;\n\n}");
    }

    #[test]
    fn test_template_literal_lines_untouched() {
        let text = "const s = `\n    keep\n`;\n";
        assert_eq!(format(text, &FormatOptions::default()), text);
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let text = "export default {\n  data() {\n    return { a: 1 }\n  }\n}\n";
        assert_eq!(format(text, &FormatOptions::default()), text);
    }

    #[test]
    fn test_only_lines_starting_in_span() {
        let text = "{\nx;\ny;\n}";
        let model = SourceModel::build(Arc::from(text), ScriptKind::Js);
        let changes = formatting_edits(&model, Span::new(5, 3), &FormatOptions::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].span, Span::new(5, 0));
        assert_eq!(changes[0].new_text, "  ");
    }
}
