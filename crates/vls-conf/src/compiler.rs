//! Compiler configuration files (`tsconfig.json` / `jsconfig.json`).

use std::collections::BTreeMap;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use vls_source::clean_utf8_path;
use vls_source::DirectoryFilter;
use vls_source::FileSystem;

use crate::jsonc;
use crate::ConfigError;

/// Configuration file names, in lookup priority order within one directory.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["tsconfig.json", "jsconfig.json"];

const MAX_EXTENDS_DEPTH: usize = 16;

/// The subset of compiler options the analysis engines understand. Unset
/// options are `None` so that `extends` chains and engine defaults can be
/// layered underneath.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    pub strict: Option<bool>,
    pub no_implicit_any: Option<bool>,
    pub no_unused_locals: Option<bool>,
    pub no_unused_parameters: Option<bool>,
    pub allow_js: Option<bool>,
    pub base_url: Option<String>,
    pub paths: Option<BTreeMap<String, Vec<String>>>,
    pub target: Option<String>,
    pub module: Option<String>,
}

impl CompilerOptions {
    /// Options every engine starts from before project configuration applies.
    #[must_use]
    pub fn engine_defaults() -> Self {
        Self {
            allow_js: Some(true),
            target: Some("esnext".to_string()),
            module: Some("esnext".to_string()),
            ..Self::default()
        }
    }

    /// Fill every unset option of `self` from `base`.
    #[must_use]
    pub fn layered_over(self, base: &CompilerOptions) -> Self {
        Self {
            strict: self.strict.or(base.strict),
            no_implicit_any: self.no_implicit_any.or(base.no_implicit_any),
            no_unused_locals: self.no_unused_locals.or(base.no_unused_locals),
            no_unused_parameters: self.no_unused_parameters.or(base.no_unused_parameters),
            allow_js: self.allow_js.or(base.allow_js),
            base_url: self.base_url.or_else(|| base.base_url.clone()),
            paths: self.paths.or_else(|| base.paths.clone()),
            target: self.target.or_else(|| base.target.clone()),
            module: self.module.or_else(|| base.module.clone()),
        }
    }

    /// Switch off the named checks. Unknown names are ignored.
    #[must_use]
    pub fn relaxed(mut self, checks: &[String]) -> Self {
        for check in checks {
            match check.as_str() {
                "noImplicitAny" => self.no_implicit_any = Some(false),
                "noUnusedLocals" => self.no_unused_locals = Some(false),
                "noUnusedParameters" => self.no_unused_parameters = Some(false),
                "strict" => self.strict = Some(false),
                other => tracing::debug!("Ignoring unknown relaxed check '{}'", other),
            }
        }
        self
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    #[must_use]
    pub fn no_implicit_any(&self) -> bool {
        self.no_implicit_any.unwrap_or_else(|| self.is_strict())
    }

    #[must_use]
    pub fn no_unused_locals(&self) -> bool {
        self.no_unused_locals.unwrap_or(false)
    }

    #[must_use]
    pub fn no_unused_parameters(&self) -> bool {
        self.no_unused_parameters.unwrap_or(false)
    }

    #[must_use]
    pub fn allow_js(&self) -> bool {
        self.allow_js.unwrap_or(false)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawConfig {
    extends: Option<String>,
    compiler_options: CompilerOptions,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    files: Option<Vec<String>>,
}

/// A fully resolved project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// The configuration file, or `None` for the default configuration.
    pub path: Option<Utf8PathBuf>,
    /// Directory that `include`/`exclude`/`files` are relative to.
    pub root: Utf8PathBuf,
    pub options: CompilerOptions,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub files: Vec<String>,
    /// Every configuration file that was read, `path` first and then the
    /// `extends` chain.
    pub sources: Vec<Utf8PathBuf>,
}

/// Dependency directories skipped at any depth unless a configuration
/// file lists its own `exclude`.
const DEPENDENCY_DIRECTORIES: [&str; 3] = ["node_modules", "bower_components", "jspm_packages"];

fn default_excludes() -> Vec<String> {
    DEPENDENCY_DIRECTORIES
        .iter()
        .map(|directory| format!("**/{directory}"))
        .collect()
}

impl ProjectConfig {
    /// Configuration used when no configuration file governs a directory, or
    /// the one that does cannot be parsed.
    #[must_use]
    pub fn default_for(root: &Utf8Path) -> Self {
        Self {
            path: None,
            root: root.to_path_buf(),
            options: CompilerOptions::engine_defaults(),
            include: vec!["**/*".to_string()],
            exclude: default_excludes(),
            files: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Read and resolve a configuration file, following `extends`.
    pub fn load(fs: &dyn FileSystem, path: &Utf8Path) -> Result<Self, ConfigError> {
        let root = path
            .parent()
            .map_or_else(|| Utf8PathBuf::from("/"), Utf8Path::to_path_buf);

        let mut chain = vec![path.to_path_buf()];
        let mut raw = read_raw(fs, path)?;
        let mut options = raw.compiler_options.clone();
        let mut include = raw.include.take();
        let mut exclude = raw.exclude.take();
        let mut files = raw.files.take();
        let mut current = path.to_path_buf();

        while let Some(extends) = raw.extends.take() {
            let base_path = resolve_extends(&current, &extends);
            if chain.contains(&base_path) || chain.len() > MAX_EXTENDS_DEPTH {
                return Err(ConfigError::ExtendsCycle(base_path));
            }
            chain.push(base_path.clone());

            raw = read_raw(fs, &base_path)?;
            options = options.layered_over(&raw.compiler_options);
            include = include.or_else(|| raw.include.take());
            exclude = exclude.or_else(|| raw.exclude.take());
            files = files.or_else(|| raw.files.take());
            current = base_path;
        }

        let files = files.unwrap_or_default();
        let include = include.unwrap_or_else(|| {
            if files.is_empty() {
                vec!["**/*".to_string()]
            } else {
                Vec::new()
            }
        });

        Ok(Self {
            path: Some(path.to_path_buf()),
            root,
            options: options.layered_over(&CompilerOptions::engine_defaults()),
            include,
            exclude: exclude.unwrap_or_else(default_excludes),
            files,
            sources: chain,
        })
    }

    /// File extensions the project tracks.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions = vec![".vue".to_string(), ".ts".to_string(), ".tsx".to_string()];
        if self.options.allow_js() {
            extensions.push(".js".to_string());
            extensions.push(".jsx".to_string());
        }
        extensions
    }

    /// Directory walk filter equivalent to `include`/`exclude`.
    #[must_use]
    pub fn directory_filter(&self) -> DirectoryFilter {
        DirectoryFilter::new()
            .with_extensions(self.extensions())
            .with_excludes(&self.exclude)
            .with_includes(&self.include)
    }

    /// Absolute paths listed under `files`.
    #[must_use]
    pub fn explicit_files(&self) -> Vec<Utf8PathBuf> {
        self.files
            .iter()
            .map(|file| clean_utf8_path(&self.root.join(file)))
            .collect()
    }
}

fn read_raw(fs: &dyn FileSystem, path: &Utf8Path) -> Result<RawConfig, ConfigError> {
    let text = fs.read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = jsonc::parse(&text).map_err(|message| ConfigError::Syntax {
        path: path.to_path_buf(),
        message,
    })?;
    serde_json::from_value(value).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_extends(config_path: &Utf8Path, extends: &str) -> Utf8PathBuf {
    let dir = config_path.parent().unwrap_or(Utf8Path::new("/"));
    let target = if Utf8Path::new(extends).is_absolute() {
        Utf8PathBuf::from(extends)
    } else if extends.starts_with('.') {
        dir.join(extends)
    } else {
        dir.join("node_modules").join(extends)
    };
    if target.extension() == Some("json") {
        clean_utf8_path(&target)
    } else {
        clean_utf8_path(Utf8Path::new(&format!("{target}.json")))
    }
}

#[cfg(test)]
mod tests {
    use vls_source::InMemoryFileSystem;

    use super::*;

    #[test]
    fn test_load_plain_config() {
        let fs = InMemoryFileSystem::new();
        fs.add_file(
            "/app/tsconfig.json",
            r#"{
                // comments are allowed
                "compilerOptions": { "strict": true, "baseUrl": "." },
                "include": ["src/**/*"],
            }"#,
        );

        let config = ProjectConfig::load(&fs, Utf8Path::new("/app/tsconfig.json")).unwrap();
        assert_eq!(config.root, Utf8PathBuf::from("/app"));
        assert!(config.options.is_strict());
        assert!(config.options.no_implicit_any());
        assert_eq!(config.options.base_url.as_deref(), Some("."));
        assert_eq!(config.include, vec!["src/**/*".to_string()]);
        assert_eq!(config.exclude, default_excludes());
        assert!(config.options.allow_js());
    }

    #[test]
    fn test_extends_layers_options() {
        let fs = InMemoryFileSystem::new();
        fs.add_file(
            "/app/tsconfig.base.json",
            r#"{ "compilerOptions": { "strict": true, "noUnusedLocals": true }, "exclude": ["dist"] }"#,
        );
        fs.add_file(
            "/app/web/tsconfig.json",
            r#"{ "extends": "../tsconfig.base", "compilerOptions": { "noUnusedLocals": false } }"#,
        );

        let config = ProjectConfig::load(&fs, Utf8Path::new("/app/web/tsconfig.json")).unwrap();
        assert!(config.options.is_strict());
        assert!(!config.options.no_unused_locals());
        assert_eq!(config.exclude, vec!["dist".to_string()]);
        assert_eq!(config.root, Utf8PathBuf::from("/app/web"));
        assert_eq!(
            config.sources,
            vec![
                Utf8PathBuf::from("/app/web/tsconfig.json"),
                Utf8PathBuf::from("/app/tsconfig.base.json"),
            ]
        );
    }

    #[test]
    fn test_extends_cycle_is_an_error() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("/app/a.json", r#"{ "extends": "./b.json" }"#);
        fs.add_file("/app/b.json", r#"{ "extends": "./a.json" }"#);

        let result = ProjectConfig::load(&fs, Utf8Path::new("/app/a.json"));
        assert!(matches!(result, Err(ConfigError::ExtendsCycle(_))));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("/app/tsconfig.json", "{ compilerOptions: ");
        let result = ProjectConfig::load(&fs, Utf8Path::new("/app/tsconfig.json"));
        assert!(matches!(result, Err(ConfigError::Syntax { .. })));

        fs.add_file("/app/tsconfig.json", r#"{ "include": 3 }"#);
        let result = ProjectConfig::load(&fs, Utf8Path::new("/app/tsconfig.json"));
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_files_without_include_disables_default_include() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("/app/tsconfig.json", r#"{ "files": ["main.ts"] }"#);
        let config = ProjectConfig::load(&fs, Utf8Path::new("/app/tsconfig.json")).unwrap();
        assert!(config.include.is_empty());
        assert_eq!(
            config.explicit_files(),
            vec![Utf8PathBuf::from("/app/main.ts")]
        );
    }

    #[test]
    fn test_relaxed_switches_checks_off() {
        let options = CompilerOptions {
            strict: Some(true),
            no_unused_locals: Some(true),
            ..CompilerOptions::default()
        }
        .relaxed(&["noImplicitAny".to_string(), "noUnusedLocals".to_string()]);

        assert!(options.is_strict());
        assert!(!options.no_implicit_any());
        assert!(!options.no_unused_locals());
    }

    #[test]
    fn test_default_config_tracks_all_extensions() {
        let config = ProjectConfig::default_for(Utf8Path::new("/app"));
        let filter = config.directory_filter();
        assert!(filter.extensions().contains(&".vue".to_string()));
        assert!(filter.extensions().contains(&".js".to_string()));
        assert!(filter.is_excluded("node_modules"));
        assert!(filter.is_excluded("packages/ui/bower_components/x.js"));
    }

    #[test]
    fn test_default_config_skips_nested_dependencies() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("/w/App.vue", "");
        fs.add_file("/w/packages/ui/Button.vue", "");
        fs.add_file("/w/packages/ui/node_modules/lodash/index.d.ts", "");
        fs.add_file("/w/node_modules/vue/index.d.ts", "");
        fs.add_file("/w/vendor/jspm_packages/npm/a.js", "");

        let config = ProjectConfig::default_for(Utf8Path::new("/w"));
        let files = fs.read_directory(&config.root, &config.directory_filter());
        assert_eq!(
            files,
            vec![
                Utf8PathBuf::from("/w/App.vue"),
                Utf8PathBuf::from("/w/packages/ui/Button.vue"),
            ]
        );
    }

    #[test]
    fn test_explicit_exclude_replaces_defaults() {
        let fs = InMemoryFileSystem::new();
        fs.add_file("/app/tsconfig.json", r#"{ "exclude": ["dist"] }"#);
        fs.add_file("/app/src/App.vue", "");
        fs.add_file("/app/dist/App.vue", "");

        let config = ProjectConfig::load(&fs, Utf8Path::new("/app/tsconfig.json")).unwrap();
        let files = fs.read_directory(&config.root, &config.directory_filter());
        assert_eq!(files, vec![Utf8PathBuf::from("/app/src/App.vue")]);
    }
}
