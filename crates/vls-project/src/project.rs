use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHashSet;
use vls_conf::CompilerOptions;
use vls_conf::ProjectConfig;
use vls_conf::Settings;
use vls_script::DocumentRegistry;
use vls_script::LanguageService;
use vls_script::ServiceFactory;
use vls_script::ServiceHost;
use vls_workspace::PathClass;
use vls_workspace::VirtualFileSystem;

use crate::host::script_names;
use crate::host::ProjectHost;
use crate::resolution::ModuleResolutionCache;

/// One compiler configuration scope and the engines analysing it.
///
/// The script engine runs with the configured options. The template engine
/// runs with the same options minus the checks named in
/// [`Settings::relaxed_checks`]. Both share one host and one
/// [`DocumentRegistry`].
pub struct Project {
    config: ProjectConfig,
    template_options: CompilerOptions,
    host: Arc<ProjectHost>,
    registry: Arc<DocumentRegistry>,
    script: Arc<dyn LanguageService>,
    template: Arc<dyn LanguageService>,
    module_cache: Arc<ModuleResolutionCache>,
    attached: Mutex<FxHashSet<Utf8PathBuf>>,
    disposed: AtomicBool,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("config_path", &self.config.path)
            .field("root", &self.config.root)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl Project {
    #[tracing::instrument(skip_all, fields(root = %config.root))]
    pub fn new(
        config: ProjectConfig,
        vfs: Arc<VirtualFileSystem>,
        factory: &dyn ServiceFactory,
        settings: &Settings,
    ) -> Self {
        let module_cache = Arc::new(ModuleResolutionCache::new());
        let host = Arc::new(ProjectHost::new(
            Arc::clone(&vfs),
            config.root.clone(),
            config.options.clone(),
            Arc::clone(&module_cache),
        ));

        for file in config.explicit_files() {
            host.track(&file);
        }
        for file in vfs.read_directory(&config.root, &config.directory_filter()) {
            host.track(&file);
        }

        let registry = Arc::new(DocumentRegistry::new());
        let template_options = config.options.clone().relaxed(settings.relaxed_checks());
        let shared_host: Arc<dyn ServiceHost> = host.clone();
        let script = factory.create(
            Arc::clone(&shared_host),
            Arc::clone(&registry),
            config.options.clone(),
        );
        let template = factory.create(shared_host, Arc::clone(&registry), template_options.clone());

        tracing::debug!(
            "Project at {} tracks {} files",
            config.root,
            host.script_file_names().len()
        );

        Self {
            config,
            template_options,
            host,
            registry,
            script,
            template,
            module_cache,
            attached: Mutex::new(FxHashSet::default()),
            disposed: AtomicBool::new(false),
        }
    }

    /// The configuration file, `None` for the default configuration.
    #[must_use]
    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config.path.as_deref()
    }

    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.config.root
    }

    #[must_use]
    pub fn options(&self) -> &CompilerOptions {
        &self.config.options
    }

    #[must_use]
    pub fn template_options(&self) -> &CompilerOptions {
        &self.template_options
    }

    #[must_use]
    pub fn files(&self) -> Vec<Utf8PathBuf> {
        self.host.script_file_names()
    }

    #[must_use]
    pub fn host(&self) -> &ProjectHost {
        &self.host
    }

    /// Engine for script views and plain script files.
    #[must_use]
    pub fn script(&self) -> &Arc<dyn LanguageService> {
        &self.script
    }

    /// Engine for template views.
    #[must_use]
    pub fn template(&self) -> &Arc<dyn LanguageService> {
        &self.template
    }

    /// The engine responsible for `path`.
    #[must_use]
    pub fn service_for(&self, path: &Utf8Path) -> &Arc<dyn LanguageService> {
        match PathClass::classify(path) {
            PathClass::VirtualTemplate(_) => &self.template,
            PathClass::Disk(_) | PathClass::VirtualScript(_) => &self.script,
        }
    }

    #[must_use]
    pub fn module_cache(&self) -> &ModuleResolutionCache {
        &self.module_cache
    }

    #[must_use]
    pub fn document_registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    /// Make sure the engines know about `path`, typically a document that was
    /// opened after the project was created.
    pub fn track(&self, path: &Utf8Path) {
        if self.host.track(path) {
            tracing::trace!("Tracking {} in project at {}", path, self.config.root);
        }
    }

    /// Directories currently resolved to this project.
    #[must_use]
    pub fn attached(&self) -> Vec<Utf8PathBuf> {
        let mut directories: Vec<_> = self.lock_attached().iter().cloned().collect();
        directories.sort();
        directories
    }

    pub(crate) fn attach(&self, directory: &Utf8Path) {
        self.lock_attached().insert(directory.to_path_buf());
    }

    pub(crate) fn take_attached(&self) -> Vec<Utf8PathBuf> {
        self.lock_attached().drain().collect()
    }

    fn lock_attached(&self) -> std::sync::MutexGuard<'_, FxHashSet<Utf8PathBuf>> {
        self.attached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Whether a change to `path` alters this project's configuration.
    #[must_use]
    pub fn depends_on_config(&self, path: &Utf8Path) -> bool {
        self.config
            .sources
            .iter()
            .any(|source| source == path || source.starts_with(path))
    }

    /// A file changed outside of the buffers.
    pub fn file_changed(&self, path: &Utf8Path) {
        self.module_cache.invalidate_containing(path);
        self.module_cache.invalidate_target(path);
    }

    /// A file disappeared.
    pub fn file_deleted(&self, path: &Utf8Path) {
        self.host.untrack(path);
        self.file_changed(path);
        for name in script_names(path) {
            self.registry.release(&name);
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Release the engines and everything cached for them.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.script.dispose();
        self.template.dispose();
        self.registry.clear();
        self.module_cache.clear();
        self.host.clear();
        self.lock_attached().clear();
    }
}
