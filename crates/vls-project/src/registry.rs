//! Directory to project resolution.
//!
//! A directory belongs to the project of the nearest configuration file above
//! it. Projects are cached by that file (or [`ConfigKey::NoConfig`]), and
//! each project owns the set of directories attached to it, so invalidating
//! one project only touches its own attachments.

use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHashMap;
use vls_conf::ProjectConfig;
use vls_conf::Settings;
use vls_conf::CONFIG_FILE_NAMES;
use vls_script::ServiceFactory;
use vls_workspace::VirtualFileSystem;

use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    File(Utf8PathBuf),
    /// Directories without any configuration file above them.
    NoConfig,
}

impl ConfigKey {
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            ConfigKey::File(path) => Some(path.as_path()),
            ConfigKey::NoConfig => None,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    projects: FxHashMap<ConfigKey, Arc<Project>>,
    directories: FxHashMap<Utf8PathBuf, ConfigKey>,
}

pub struct ProjectRegistry {
    vfs: Arc<VirtualFileSystem>,
    factory: Arc<dyn ServiceFactory>,
    settings: Mutex<Settings>,
    state: Mutex<RegistryState>,
}

impl std::fmt::Debug for ProjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectRegistry")
            .field("projects", &self.lock().projects.len())
            .finish_non_exhaustive()
    }
}

impl ProjectRegistry {
    #[must_use]
    pub fn new(
        vfs: Arc<VirtualFileSystem>,
        factory: Arc<dyn ServiceFactory>,
        settings: Settings,
    ) -> Self {
        Self {
            vfs,
            factory,
            settings: Mutex::new(settings),
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn settings(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The project governing `directory`, created on first use.
    pub fn project_for(&self, directory: &Utf8Path) -> Arc<Project> {
        let mut state = self.lock();

        if let Some(project) = state
            .directories
            .get(directory)
            .and_then(|key| state.projects.get(key))
        {
            return Arc::clone(project);
        }

        let key = self.find_config(directory);
        let project = match state.projects.get(&key) {
            Some(project) => Arc::clone(project),
            None => {
                let project = Arc::new(self.create(&key, directory));
                state.projects.insert(key.clone(), Arc::clone(&project));
                project
            }
        };

        project.attach(directory);
        state.directories.insert(directory.to_path_buf(), key);
        project
    }

    /// Nearest configuration file at or above `directory`. Within one
    /// directory `tsconfig.json` wins over `jsconfig.json`.
    #[must_use]
    pub fn find_config(&self, directory: &Utf8Path) -> ConfigKey {
        let disk = self.vfs.disk();
        directory
            .ancestors()
            .find_map(|ancestor| {
                CONFIG_FILE_NAMES
                    .iter()
                    .map(|name| ancestor.join(name))
                    .find(|candidate| disk.exists(candidate))
            })
            .map_or(ConfigKey::NoConfig, ConfigKey::File)
    }

    fn create(&self, key: &ConfigKey, directory: &Utf8Path) -> Project {
        let config = match key {
            ConfigKey::File(path) => self.load_config(path).unwrap_or_else(|err| {
                tracing::warn!("Using default configuration: {:#}", err);
                let root = path.parent().unwrap_or(directory);
                ProjectConfig {
                    path: Some(path.clone()),
                    sources: vec![path.clone()],
                    ..ProjectConfig::default_for(root)
                }
            }),
            ConfigKey::NoConfig => ProjectConfig::default_for(directory),
        };

        tracing::info!(
            "Creating project for {}",
            config.path.as_ref().map_or("<no configuration>", |path| path.as_str())
        );
        Project::new(config, Arc::clone(&self.vfs), self.factory.as_ref(), &self.settings())
    }

    fn load_config(&self, path: &Utf8Path) -> anyhow::Result<ProjectConfig> {
        ProjectConfig::load(self.vfs.disk(), path)
            .with_context(|| format!("failed to load project configuration {path}"))
    }

    /// Dispose the project keyed by `key` and detach its directories. The
    /// next lookup under them builds a new project.
    pub fn invalidate(&self, key: &ConfigKey) -> bool {
        let mut state = self.lock();
        Self::remove(&mut state, key)
    }

    fn remove(state: &mut RegistryState, key: &ConfigKey) -> bool {
        let Some(project) = state.projects.remove(key) else {
            return false;
        };
        for directory in project.take_attached() {
            state.directories.remove(&directory);
        }
        project.dispose();
        tracing::info!(
            "Disposed project for {}",
            key.path().map_or("<no configuration>", Utf8Path::as_str)
        );
        true
    }

    /// React to a configuration file (or a directory above one) being
    /// created, edited or removed. Returns the invalidated keys.
    pub fn invalidate_for_file(&self, path: &Utf8Path) -> Vec<ConfigKey> {
        let mut state = self.lock();
        let is_config_name = path
            .file_name()
            .is_some_and(|name| CONFIG_FILE_NAMES.contains(&name));
        let scope = path.parent().unwrap_or(path);

        let mut stale: Vec<ConfigKey> = state
            .projects
            .iter()
            .filter(|(_, project)| {
                if project.depends_on_config(path) {
                    return true;
                }
                // A new configuration file takes over every directory below
                // it that currently resolves elsewhere.
                is_config_name
                    && project
                        .attached()
                        .iter()
                        .any(|directory| directory.starts_with(scope))
            })
            .map(|(key, _)| key.clone())
            .collect();
        stale.sort();

        for key in &stale {
            Self::remove(&mut state, key);
        }
        stale
    }

    /// Forward a content change of an ordinary file to every project.
    pub fn file_changed(&self, path: &Utf8Path) {
        for project in self.projects() {
            project.file_changed(path);
        }
    }

    pub fn file_deleted(&self, path: &Utf8Path) {
        for project in self.projects() {
            project.file_deleted(path);
        }
    }

    /// New settings may relax different checks, so every project is rebuilt.
    pub fn update_settings(&self, settings: Settings) {
        let changed = {
            let mut current = self
                .settings
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let changed = current.relaxed_checks() != settings.relaxed_checks();
            *current = settings;
            changed
        };
        if changed {
            self.dispose();
        }
    }

    #[must_use]
    pub fn projects(&self) -> Vec<Arc<Project>> {
        self.lock().projects.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().projects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().projects.is_empty()
    }

    /// Dispose every project.
    pub fn dispose(&self) {
        let mut state = self.lock();
        let keys: Vec<ConfigKey> = state.projects.keys().cloned().collect();
        for key in &keys {
            Self::remove(&mut state, key);
        }
        state.directories.clear();
    }
}
