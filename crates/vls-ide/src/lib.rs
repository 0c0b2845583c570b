//! Editor features for single-file components.
//!
//! [`LanguageServices`] is what a protocol server calls. It owns the open
//! buffers, the virtual filesystem and the project registry, routes every
//! request to the engine responsible for the region under the cursor, and
//! translates results back into positions of the component the editor shows.
//!
//! Every operation is total: a request that cannot be answered yields the
//! operation's empty value and a log line, never an error.

mod actions;
mod completions;
mod context;
mod diagnostics;
mod ext;
mod formatting;
mod hover;
mod navigation;
mod services;

pub use actions::RefactorArguments;
pub use actions::APPLY_EDIT_COMMAND;
pub use actions::APPLY_REFACTOR_COMMAND;
pub use completions::CompletionData;
pub use services::LanguageServices;

/// Reported as the `source` of every diagnostic.
pub const SOURCE_NAME: &str = "vls";
