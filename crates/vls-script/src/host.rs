use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    Js,
    Jsx,
    Ts,
    Tsx,
    Unknown,
}

impl ScriptKind {
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("js" | "mjs" | "cjs") => ScriptKind::Js,
            Some("jsx") => ScriptKind::Jsx,
            Some("ts" | "mts" | "cts") => ScriptKind::Ts,
            Some("tsx") => ScriptKind::Tsx,
            _ => ScriptKind::Unknown,
        }
    }

    /// Map a region language id (`ts`, `typescript`, `tsx`, ...) to a kind.
    #[must_use]
    pub fn from_language_id(language: &str) -> Self {
        match language {
            "javascript" | "js" => ScriptKind::Js,
            "javascriptreact" | "jsx" => ScriptKind::Jsx,
            "typescript" | "ts" => ScriptKind::Ts,
            "typescriptreact" | "tsx" => ScriptKind::Tsx,
            _ => ScriptKind::Unknown,
        }
    }

    #[must_use]
    pub fn is_typescript(self) -> bool {
        matches!(self, ScriptKind::Ts | ScriptKind::Tsx)
    }
}

/// A module specifier resolved to a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedModule {
    pub path: Utf8PathBuf,
    /// Resolved through `node_modules` rather than a project source path.
    pub is_external_library: bool,
}

/// What an engine needs from the project it analyses.
///
/// Engines never touch the filesystem themselves; every path they see,
/// including virtual ones, is answered by the host.
pub trait ServiceHost: Send + Sync {
    /// Files that belong to the project.
    fn script_file_names(&self) -> Vec<Utf8PathBuf>;

    fn has_script(&self, path: &Utf8Path) -> bool {
        self.script_file_names().iter().any(|name| name == path)
    }

    /// An opaque version that changes whenever the text at `path` may have
    /// changed. `None` when the path cannot be read.
    fn script_version(&self, path: &Utf8Path) -> Option<u64>;

    fn script_snapshot(&self, path: &Utf8Path) -> Option<Arc<str>>;

    /// The text at `path` with the version it belongs to. Hosts whose text
    /// can change concurrently must read both from one snapshot.
    fn versioned_snapshot(&self, path: &Utf8Path) -> Option<(u64, Arc<str>)> {
        let version = self.script_version(path)?;
        self.script_snapshot(path).map(|text| (version, text))
    }

    fn resolve_module(&self, specifier: &str, containing_file: &Utf8Path)
        -> Option<ResolvedModule>;

    fn script_kind(&self, path: &Utf8Path) -> ScriptKind {
        ScriptKind::from_path(path)
    }
}
