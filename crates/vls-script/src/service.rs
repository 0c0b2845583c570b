//! The capability interface every analysis engine implements.
//!
//! All positions are byte offsets into the text the engine read for a path
//! through its [`ServiceHost`](crate::ServiceHost). Translating them into
//! editor coordinates is the caller's job.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use vls_source::Offset;
use vls_source::Span;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("No source file '{0}' in the project")]
    UnknownFile(Utf8PathBuf),
    #[error("Offset {offset} is outside of '{path}'")]
    OffsetOutOfRange { path: Utf8PathBuf, offset: u32 },
    #[error("Unknown refactor '{0}'")]
    UnknownRefactor(String),
    #[error("Language service has been disposed")]
    Disposed,
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Suggestion,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDiagnostic {
    pub span: Span,
    pub message: String,
    pub code: u32,
    pub category: DiagnosticCategory,
    /// The diagnostic flags code that has no effect and could be removed.
    pub reports_unnecessary: bool,
}

impl ServiceDiagnostic {
    pub(crate) fn error(span: Span, code: u32, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            code,
            category: DiagnosticCategory::Error,
            reports_unnecessary: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Module,
    Class,
    Interface,
    Type,
    Enum,
    Function,
    Method,
    Property,
    Variable,
    Const,
    Let,
    Parameter,
    Alias,
    Keyword,
}

impl SymbolKind {
    /// The word a declaration of this kind is introduced with.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Variable => "var",
            SymbolKind::Const => "const",
            SymbolKind::Let => "let",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Alias => "alias",
            SymbolKind::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub sort_text: String,
    /// Text the completion replaces, when the cursor is inside a word.
    pub replacement_span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionDetails {
    pub name: String,
    pub kind: SymbolKind,
    pub display: String,
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickInfo {
    pub span: Span,
    pub kind: SymbolKind,
    pub display: String,
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureItem {
    pub label: String,
    pub parameters: Vec<String>,
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHelpItems {
    pub items: Vec<SignatureItem>,
    pub applicable_span: Span,
    pub active_item: u32,
    pub active_parameter: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub span: Span,
    pub kind: HighlightKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationItem {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub selection_span: Span,
    pub children: Vec<NavigationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpan {
    pub path: Utf8PathBuf,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChange {
    pub span: Span,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTextChanges {
    pub path: Utf8PathBuf,
    pub changes: Vec<TextChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFixAction {
    pub fix_name: String,
    pub description: String,
    pub changes: Vec<FileTextChanges>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactorAction {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactorInfo {
    pub name: String,
    pub description: String,
    pub actions: Vec<RefactorAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactorEdits {
    pub edits: Vec<FileTextChanges>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub tab_size: u32,
    pub insert_spaces: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            tab_size: 2,
            insert_spaces: true,
        }
    }
}

impl FormatOptions {
    #[must_use]
    pub fn indent_unit(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size as usize)
        } else {
            "\t".to_string()
        }
    }
}

/// Analysis operations over the files of one project.
///
/// Every method may fail when the engine has no record of `path` or the
/// request does not fit the file it currently knows about. Callers treat a
/// failure the same as an empty result.
pub trait LanguageService: Send + Sync {
    fn syntactic_diagnostics(&self, path: &Utf8Path) -> ServiceResult<Vec<ServiceDiagnostic>>;

    fn semantic_diagnostics(&self, path: &Utf8Path) -> ServiceResult<Vec<ServiceDiagnostic>>;

    fn completions(&self, path: &Utf8Path, offset: Offset)
        -> ServiceResult<Vec<CompletionEntry>>;

    fn completion_details(
        &self,
        path: &Utf8Path,
        offset: Offset,
        name: &str,
    ) -> ServiceResult<Option<CompletionDetails>>;

    fn quick_info(&self, path: &Utf8Path, offset: Offset) -> ServiceResult<Option<QuickInfo>>;

    fn signature_help(
        &self,
        path: &Utf8Path,
        offset: Offset,
    ) -> ServiceResult<Option<SignatureHelpItems>>;

    fn document_highlights(&self, path: &Utf8Path, offset: Offset)
        -> ServiceResult<Vec<Highlight>>;

    fn navigation_tree(&self, path: &Utf8Path) -> ServiceResult<Vec<NavigationItem>>;

    fn definition(&self, path: &Utf8Path, offset: Offset) -> ServiceResult<Vec<FileSpan>>;

    fn references(&self, path: &Utf8Path, offset: Offset) -> ServiceResult<Vec<FileSpan>>;

    fn code_fixes(
        &self,
        path: &Utf8Path,
        span: Span,
        codes: &[u32],
    ) -> ServiceResult<Vec<CodeFixAction>>;

    fn applicable_refactors(&self, path: &Utf8Path, span: Span)
        -> ServiceResult<Vec<RefactorInfo>>;

    fn edits_for_refactor(
        &self,
        path: &Utf8Path,
        span: Span,
        refactor: &str,
        action: &str,
    ) -> ServiceResult<RefactorEdits>;

    fn formatting_edits(
        &self,
        path: &Utf8Path,
        span: Span,
        options: &FormatOptions,
    ) -> ServiceResult<Vec<TextChange>>;

    /// Release everything the engine holds. Later calls fail with
    /// [`ServiceError::Disposed`].
    fn dispose(&self);
}
