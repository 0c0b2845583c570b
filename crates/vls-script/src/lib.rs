mod factory;
mod host;
pub mod lexer;
mod registry;
mod scan;
mod service;

pub use factory::ScanServiceFactory;
pub use factory::ServiceFactory;
pub use host::ResolvedModule;
pub use host::ScriptKind;
pub use host::ServiceHost;
pub use registry::DocumentRegistry;
pub use scan::ScanService;
pub use service::CodeFixAction;
pub use service::CompletionDetails;
pub use service::CompletionEntry;
pub use service::DiagnosticCategory;
pub use service::FileSpan;
pub use service::FileTextChanges;
pub use service::FormatOptions;
pub use service::Highlight;
pub use service::HighlightKind;
pub use service::LanguageService;
pub use service::NavigationItem;
pub use service::QuickInfo;
pub use service::RefactorAction;
pub use service::RefactorEdits;
pub use service::RefactorInfo;
pub use service::ServiceDiagnostic;
pub use service::ServiceError;
pub use service::ServiceResult;
pub use service::SignatureHelpItems;
pub use service::SignatureItem;
pub use service::SymbolKind;
pub use service::TextChange;
