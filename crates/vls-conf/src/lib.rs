pub mod compiler;
mod jsonc;
pub mod settings;

use directories::ProjectDirs;
use thiserror::Error;

pub use compiler::CompilerOptions;
pub use compiler::ProjectConfig;
pub use compiler::CONFIG_FILE_NAMES;
pub use settings::CacheSettings;
pub use settings::Settings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] config::ConfigError),
    #[error("Failed to read {path}")]
    Io {
        path: camino::Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {message}")]
    Syntax {
        path: camino::Utf8PathBuf,
        message: String,
    },
    #[error("Unexpected configuration shape in {path}")]
    Json {
        path: camino::Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration 'extends' chain loops back to {0}")]
    ExtendsCycle(camino::Utf8PathBuf),
    #[error("Invalid settings object")]
    Settings(#[source] serde_json::Error),
}

/// Platform directories used for the user-level settings file.
#[must_use]
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "vls", "vls")
}
