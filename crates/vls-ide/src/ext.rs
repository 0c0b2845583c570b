use camino::Utf8Path;
use tower_lsp_server::ls_types;
use url::Url;
use vls_script::DiagnosticCategory;
use vls_script::HighlightKind;
use vls_script::ServiceDiagnostic;
use vls_script::SymbolKind;
use vls_source::LineCol;
use vls_source::Offset;
use vls_source::PositionEncoding;
use vls_source::Span;
use vls_workspace::path_to_url;
use vls_workspace::TextDocument;

pub(crate) trait PositionExt {
    fn to_offset(&self, document: &TextDocument, encoding: PositionEncoding) -> Option<Offset>;
}

impl PositionExt for ls_types::Position {
    fn to_offset(&self, document: &TextDocument, encoding: PositionEncoding) -> Option<Offset> {
        document.position_to_offset(LineCol::new(self.line, self.character), encoding)
    }
}

pub(crate) trait RangeExt {
    fn to_span(&self, document: &TextDocument, encoding: PositionEncoding) -> Option<Span>;
}

impl RangeExt for ls_types::Range {
    fn to_span(&self, document: &TextDocument, encoding: PositionEncoding) -> Option<Span> {
        let start = self.start.to_offset(document, encoding)?;
        let end = self.end.to_offset(document, encoding)?;
        (start <= end).then(|| Span::from_bounds(start.as_usize(), end.as_usize()))
    }
}

pub(crate) trait SpanExt {
    fn to_lsp_range(&self, document: &TextDocument, encoding: PositionEncoding)
        -> ls_types::Range;
}

impl SpanExt for Span {
    fn to_lsp_range(
        &self,
        document: &TextDocument,
        encoding: PositionEncoding,
    ) -> ls_types::Range {
        let position = |offset: Offset| {
            let line_col = document.offset_to_position(offset, encoding);
            ls_types::Position::new(line_col.line(), line_col.column())
        };
        ls_types::Range::new(position(self.start_offset()), position(self.end_offset()))
    }
}

pub(crate) trait PositionEncodingExt {
    fn to_lsp(&self) -> ls_types::PositionEncodingKind;
}

impl PositionEncodingExt for PositionEncoding {
    fn to_lsp(&self) -> ls_types::PositionEncodingKind {
        match self {
            PositionEncoding::Utf8 => ls_types::PositionEncodingKind::new("utf-8"),
            PositionEncoding::Utf16 => ls_types::PositionEncodingKind::new("utf-16"),
            PositionEncoding::Utf32 => ls_types::PositionEncodingKind::new("utf-32"),
        }
    }
}

pub(crate) trait PositionEncodingKindExt {
    fn to_position_encoding(&self) -> Option<PositionEncoding>;
}

impl PositionEncodingKindExt for ls_types::PositionEncodingKind {
    fn to_position_encoding(&self) -> Option<PositionEncoding> {
        match self.as_str() {
            "utf-8" => Some(PositionEncoding::Utf8),
            "utf-16" => Some(PositionEncoding::Utf16),
            "utf-32" => Some(PositionEncoding::Utf32),
            _ => None,
        }
    }
}

pub(crate) trait SymbolKindExt {
    fn to_completion_kind(self) -> ls_types::CompletionItemKind;
    fn to_symbol_kind(self) -> ls_types::SymbolKind;
}

impl SymbolKindExt for SymbolKind {
    fn to_completion_kind(self) -> ls_types::CompletionItemKind {
        match self {
            SymbolKind::Module => ls_types::CompletionItemKind::MODULE,
            SymbolKind::Class => ls_types::CompletionItemKind::CLASS,
            SymbolKind::Interface | SymbolKind::Type => ls_types::CompletionItemKind::INTERFACE,
            SymbolKind::Enum => ls_types::CompletionItemKind::ENUM,
            SymbolKind::Function => ls_types::CompletionItemKind::FUNCTION,
            SymbolKind::Method => ls_types::CompletionItemKind::METHOD,
            SymbolKind::Property => ls_types::CompletionItemKind::PROPERTY,
            SymbolKind::Const => ls_types::CompletionItemKind::CONSTANT,
            SymbolKind::Variable | SymbolKind::Let | SymbolKind::Parameter => {
                ls_types::CompletionItemKind::VARIABLE
            }
            SymbolKind::Alias => ls_types::CompletionItemKind::REFERENCE,
            SymbolKind::Keyword => ls_types::CompletionItemKind::KEYWORD,
        }
    }

    fn to_symbol_kind(self) -> ls_types::SymbolKind {
        match self {
            SymbolKind::Module => ls_types::SymbolKind::MODULE,
            SymbolKind::Class => ls_types::SymbolKind::CLASS,
            SymbolKind::Interface | SymbolKind::Type => ls_types::SymbolKind::INTERFACE,
            SymbolKind::Enum => ls_types::SymbolKind::ENUM,
            SymbolKind::Function => ls_types::SymbolKind::FUNCTION,
            SymbolKind::Method => ls_types::SymbolKind::METHOD,
            SymbolKind::Property => ls_types::SymbolKind::PROPERTY,
            SymbolKind::Const => ls_types::SymbolKind::CONSTANT,
            SymbolKind::Variable
            | SymbolKind::Let
            | SymbolKind::Parameter
            | SymbolKind::Alias
            | SymbolKind::Keyword => ls_types::SymbolKind::VARIABLE,
        }
    }
}

pub(crate) fn highlight_kind(kind: HighlightKind) -> ls_types::DocumentHighlightKind {
    match kind {
        HighlightKind::Read => ls_types::DocumentHighlightKind::READ,
        HighlightKind::Write => ls_types::DocumentHighlightKind::WRITE,
    }
}

pub(crate) fn to_lsp_diagnostic(
    diagnostic: &ServiceDiagnostic,
    range: ls_types::Range,
) -> ls_types::Diagnostic {
    let severity = match diagnostic.category {
        DiagnosticCategory::Error => ls_types::DiagnosticSeverity::ERROR,
        DiagnosticCategory::Warning => ls_types::DiagnosticSeverity::WARNING,
        DiagnosticCategory::Suggestion => ls_types::DiagnosticSeverity::HINT,
        DiagnosticCategory::Message => ls_types::DiagnosticSeverity::INFORMATION,
    };
    ls_types::Diagnostic {
        range,
        severity: Some(severity),
        code: Some(ls_types::NumberOrString::Number(
            i32::try_from(diagnostic.code).unwrap_or(i32::MAX),
        )),
        code_description: None,
        source: Some(crate::SOURCE_NAME.to_string()),
        message: diagnostic.message.clone(),
        related_information: None,
        tags: diagnostic
            .reports_unnecessary
            .then(|| vec![ls_types::DiagnosticTag::UNNECESSARY]),
        data: None,
    }
}

/// Numeric code of a diagnostic this crate produced.
pub(crate) fn diagnostic_code(diagnostic: &ls_types::Diagnostic) -> Option<u32> {
    match diagnostic.code.as_ref()? {
        ls_types::NumberOrString::Number(code) => u32::try_from(*code).ok(),
        ls_types::NumberOrString::String(code) => code.parse().ok(),
    }
}

pub(crate) fn path_to_uri(path: &Utf8Path) -> Option<ls_types::Uri> {
    url_to_uri(&path_to_url(path)?)
}

pub(crate) fn url_to_uri(url: &Url) -> Option<ls_types::Uri> {
    url.as_str()
        .parse()
        .inspect_err(|_| tracing::trace!("Cannot express {} as an LSP URI", url))
        .ok()
}

#[cfg(test)]
mod tests {
    use vls_workspace::LanguageId;

    use super::*;

    #[test]
    fn test_span_to_range_across_lines() {
        let document = TextDocument::new("<template>\n  <p>é</p>\n</template>", 1, LanguageId::Vue);
        let start = document.content().find("<p>").unwrap();
        let span = Span::from_parts(start, "<p>é</p>".len());
        let range = span.to_lsp_range(&document, PositionEncoding::Utf16);
        assert_eq!(range.start, ls_types::Position::new(1, 2));
        assert_eq!(range.end, ls_types::Position::new(1, 10));
        assert_eq!(range.to_span(&document, PositionEncoding::Utf16), Some(span));
    }

    #[test]
    fn test_inverted_range_has_no_span() {
        let document = TextDocument::new("abc\ndef", 1, LanguageId::Vue);
        let range = ls_types::Range::new(
            ls_types::Position::new(1, 0),
            ls_types::Position::new(0, 1),
        );
        assert_eq!(range.to_span(&document, PositionEncoding::Utf16), None);
    }

    #[test]
    fn test_position_encoding_kind_unknown_returns_none() {
        assert_eq!(
            ls_types::PositionEncodingKind::new("unknown").to_position_encoding(),
            None
        );
        assert_eq!(
            PositionEncoding::Utf8.to_lsp().to_position_encoding(),
            Some(PositionEncoding::Utf8)
        );
    }

    #[test]
    fn test_diagnostic_conversion() {
        let diagnostic = ServiceDiagnostic {
            span: Span::new(0, 1),
            message: "'x' is declared but its value is never read.".to_string(),
            code: 6133,
            category: DiagnosticCategory::Warning,
            reports_unnecessary: true,
        };
        let lsp = to_lsp_diagnostic(&diagnostic, ls_types::Range::default());
        assert_eq!(lsp.severity, Some(ls_types::DiagnosticSeverity::WARNING));
        assert_eq!(lsp.tags, Some(vec![ls_types::DiagnosticTag::UNNECESSARY]));
        assert_eq!(diagnostic_code(&lsp), Some(6133));
        assert_eq!(lsp.source.as_deref(), Some("vls"));
    }
}
