use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use vls_conf::CompilerOptions;
use vls_embedded::RegionKind;
use vls_embedded::SCRIPT_SUFFIX;
use vls_embedded::TEMPLATE_SUFFIX;
use vls_script::ResolvedModule;
use vls_script::ScriptKind;
use vls_script::ServiceHost;
use vls_source::FxDashSet;
use vls_workspace::is_composite;
use vls_workspace::PathClass;
use vls_workspace::VirtualFileSystem;

use crate::resolution::ModuleResolutionCache;
use crate::resolution::ModuleResolver;

/// The [`ServiceHost`] both engines of a project share.
///
/// File names are the project's tracked files, with every component file
/// replaced by its script and template views. Everything else is answered by
/// the [`VirtualFileSystem`].
pub struct ProjectHost {
    vfs: Arc<VirtualFileSystem>,
    root: Utf8PathBuf,
    options: CompilerOptions,
    files: FxDashSet<Utf8PathBuf>,
    module_cache: Arc<ModuleResolutionCache>,
}

impl ProjectHost {
    #[must_use]
    pub fn new(
        vfs: Arc<VirtualFileSystem>,
        root: Utf8PathBuf,
        options: CompilerOptions,
        module_cache: Arc<ModuleResolutionCache>,
    ) -> Self {
        Self {
            vfs,
            root,
            options,
            files: FxDashSet::default(),
            module_cache,
        }
    }

    /// Start tracking `path`. Returns `false` if it was tracked already.
    pub fn track(&self, path: &Utf8Path) -> bool {
        let mut added = false;
        for name in script_names(path) {
            added |= self.files.insert(name);
        }
        added
    }

    pub fn untrack(&self, path: &Utf8Path) {
        for name in script_names(path) {
            self.files.remove(&name);
        }
    }

    #[must_use]
    pub fn is_tracked(&self, path: &Utf8Path) -> bool {
        self.files.contains(path)
    }

    #[must_use]
    pub fn vfs(&self) -> &VirtualFileSystem {
        &self.vfs
    }

    pub(crate) fn clear(&self) {
        self.files.clear();
    }
}

/// Names the engines know `path` by.
pub(crate) fn script_names(path: &Utf8Path) -> Vec<Utf8PathBuf> {
    if is_composite(path) {
        vec![
            Utf8PathBuf::from(format!("{path}{SCRIPT_SUFFIX}")),
            Utf8PathBuf::from(format!("{path}{TEMPLATE_SUFFIX}")),
        ]
    } else {
        vec![path.to_path_buf()]
    }
}

impl ServiceHost for ProjectHost {
    fn script_file_names(&self) -> Vec<Utf8PathBuf> {
        let mut names: Vec<Utf8PathBuf> = self.files.iter().map(|name| name.key().clone()).collect();
        names.sort();
        names
    }

    /// Tracked files, and anything an import reached that can be read.
    fn has_script(&self, path: &Utf8Path) -> bool {
        self.files.contains(path) || self.vfs.exists(path)
    }

    fn script_version(&self, path: &Utf8Path) -> Option<u64> {
        self.vfs.version(path)
    }

    fn script_snapshot(&self, path: &Utf8Path) -> Option<Arc<str>> {
        self.versioned_snapshot(path).map(|(_, text)| text)
    }

    fn versioned_snapshot(&self, path: &Utf8Path) -> Option<(u64, Arc<str>)> {
        match self.vfs.snapshot(path) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::debug!("No snapshot for {}: {}", path, err);
                None
            }
        }
    }

    fn resolve_module(&self, specifier: &str, containing_file: &Utf8Path) -> Option<ResolvedModule> {
        if let Some(cached) = self.module_cache.get(specifier, containing_file) {
            return cached;
        }
        let resolved = ModuleResolver::new(&self.vfs, &self.root, &self.options)
            .resolve(specifier, containing_file);
        self.module_cache
            .set(specifier, containing_file, resolved.clone());
        resolved
    }

    fn script_kind(&self, path: &Utf8Path) -> ScriptKind {
        match PathClass::classify(path) {
            PathClass::Disk(path) => ScriptKind::from_path(&path),
            PathClass::VirtualTemplate(_) => ScriptKind::Ts,
            PathClass::VirtualScript(source) => self
                .vfs
                .regions(&source)
                .ok()
                .and_then(|regions| {
                    regions
                        .first_of(RegionKind::Script)
                        .map(|region| ScriptKind::from_language_id(&region.language))
                })
                .filter(|kind| *kind != ScriptKind::Unknown)
                .unwrap_or(ScriptKind::Js),
        }
    }
}

#[cfg(test)]
mod tests {
    use vls_source::InMemoryFileSystem;
    use vls_workspace::Buffers;

    use super::*;

    fn host() -> ProjectHost {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.add_file("/app/App.vue", "<script lang=\"ts\">export default {}</script>");
        fs.add_file("/app/Plain.vue", "<script>export default {}</script>");
        fs.add_file("/app/util.ts", "export const x = 1;");
        let vfs = Arc::new(VirtualFileSystem::new(fs, Buffers::new()));
        ProjectHost::new(
            vfs,
            Utf8PathBuf::from("/app"),
            CompilerOptions::engine_defaults(),
            Arc::new(ModuleResolutionCache::new()),
        )
    }

    #[test]
    fn test_components_are_tracked_as_views() {
        let host = host();
        assert!(host.track(Utf8Path::new("/app/App.vue")));
        assert!(!host.track(Utf8Path::new("/app/App.vue")));
        host.track(Utf8Path::new("/app/util.ts"));
        assert_eq!(
            host.script_file_names(),
            vec![
                Utf8PathBuf::from("/app/App.vue.template.ts"),
                Utf8PathBuf::from("/app/App.vue.ts"),
                Utf8PathBuf::from("/app/util.ts"),
            ]
        );

        host.untrack(Utf8Path::new("/app/App.vue"));
        assert!(!host.is_tracked(Utf8Path::new("/app/App.vue.ts")));
    }

    #[test]
    fn test_script_kind_follows_region_language() {
        let host = host();
        assert_eq!(host.script_kind(Utf8Path::new("/app/App.vue.ts")), ScriptKind::Ts);
        assert_eq!(host.script_kind(Utf8Path::new("/app/Plain.vue.ts")), ScriptKind::Js);
        assert_eq!(host.script_kind(Utf8Path::new("/app/Plain.vue.template.ts")), ScriptKind::Ts);
        assert_eq!(host.script_kind(Utf8Path::new("/app/util.ts")), ScriptKind::Ts);
    }

    #[test]
    fn test_resolutions_are_cached() {
        let host = host();
        let containing = Utf8Path::new("/app/App.vue.ts");
        let first = host.resolve_module("./util", containing).unwrap();
        assert_eq!(first.path, Utf8PathBuf::from("/app/util.ts"));
        assert_eq!(host.module_cache.len(), 1);
        assert_eq!(host.resolve_module("./util", containing), Some(first));
        assert_eq!(host.module_cache.len(), 1);
    }
}
