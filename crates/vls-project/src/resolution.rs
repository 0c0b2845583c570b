//! Module specifier resolution for the engines of one project.
//!
//! Resolution walks the filesystem, so results are cached per project in a
//! [`ModuleResolutionCache`]. The cache lives exactly as long as the project
//! that owns it: new compiler options always come with a new project and
//! therefore an empty cache.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use vls_conf::CompilerOptions;
use vls_embedded::SCRIPT_SUFFIX;
use vls_script::ResolvedModule;
use vls_source::clean_utf8_path;
use vls_source::FxDashMap;
use vls_workspace::is_composite;
use vls_workspace::PathClass;
use vls_workspace::VirtualFileSystem;

/// Probed in order after the bare specifier.
const EXTENSIONS: [&str; 6] = [".ts", ".tsx", ".d.ts", ".js", ".jsx", ".vue"];

const SCRIPT_EXTENSIONS: [&str; 7] = ["ts", "tsx", "js", "jsx", "mts", "cts", "mjs"];

/// Resolutions keyed by containing file and specifier. Failed lookups are
/// cached too.
#[derive(Debug, Default)]
pub struct ModuleResolutionCache {
    entries: FxDashMap<(Utf8PathBuf, String), Option<ResolvedModule>>,
}

impl ModuleResolutionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` on a miss, `Some(None)` for a cached failure.
    #[must_use]
    pub fn get(&self, specifier: &str, containing: &Utf8Path) -> Option<Option<ResolvedModule>> {
        self.entries
            .get(&(containing.to_path_buf(), specifier.to_string()))
            .map(|entry| entry.clone())
    }

    pub fn set(&self, specifier: &str, containing: &Utf8Path, resolution: Option<ResolvedModule>) {
        self.entries
            .insert((containing.to_path_buf(), specifier.to_string()), resolution);
    }

    /// Drop the resolutions made from `path` or from any view of it.
    pub fn invalidate_containing(&self, path: &Utf8Path) {
        self.entries.retain(|(containing, _), _| {
            containing != path && PathClass::classify(containing).backing_path() != path
        });
    }

    /// Drop cached failures and every resolution that points at `path`. Used
    /// when files appear or disappear.
    pub fn invalidate_target(&self, path: &Utf8Path) {
        self.entries.retain(|_, resolution| match resolution {
            Some(resolved) => {
                resolved.path != path && PathClass::classify(&resolved.path).backing_path() != path
            }
            None => false,
        });
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackageManifest {
    types: Option<String>,
    typings: Option<String>,
    main: Option<String>,
}

/// Resolves specifiers the way the engines expect: relative paths with
/// extension probing, `baseUrl`/`paths` mapping, then `node_modules`.
/// Component files resolve to their script view.
pub struct ModuleResolver<'a> {
    vfs: &'a VirtualFileSystem,
    root: &'a Utf8Path,
    options: &'a CompilerOptions,
}

impl<'a> ModuleResolver<'a> {
    #[must_use]
    pub fn new(vfs: &'a VirtualFileSystem, root: &'a Utf8Path, options: &'a CompilerOptions) -> Self {
        Self { vfs, root, options }
    }

    #[must_use]
    pub fn resolve(&self, specifier: &str, containing: &Utf8Path) -> Option<ResolvedModule> {
        let class = PathClass::classify(containing);
        let directory = class.backing_path().parent()?;

        if is_relative(specifier) {
            return self.probe(&directory.join(specifier)).map(project_file);
        }
        if let Some(found) = self.mapped(specifier) {
            return Some(project_file(found));
        }
        self.node_modules(specifier, directory)
    }

    fn mapped(&self, specifier: &str) -> Option<Utf8PathBuf> {
        let base_url = self
            .root
            .join(self.options.base_url.as_deref().unwrap_or("."));

        if let Some(paths) = &self.options.paths {
            let mut matches: Vec<(usize, &Vec<String>, &str)> = paths
                .iter()
                .filter_map(|(pattern, targets)| {
                    let captured = match pattern.split_once('*') {
                        Some((prefix, suffix)) => specifier
                            .strip_prefix(prefix)
                            .and_then(|rest| rest.strip_suffix(suffix))
                            .map(|captured| (prefix.len(), captured)),
                        None => (pattern == specifier).then_some((pattern.len(), "")),
                    }?;
                    Some((captured.0, targets, captured.1))
                })
                .collect();
            matches.sort_by(|a, b| b.0.cmp(&a.0));

            for (_, targets, captured) in matches {
                for target in targets {
                    let candidate = base_url.join(target.replacen('*', captured, 1));
                    if let Some(found) = self.probe(&candidate) {
                        return Some(found);
                    }
                }
            }
        }

        if self.options.base_url.is_some() {
            return self.probe(&base_url.join(specifier));
        }
        None
    }

    fn node_modules(&self, specifier: &str, directory: &Utf8Path) -> Option<ResolvedModule> {
        let disk = self.vfs.disk();
        for ancestor in directory.ancestors() {
            let modules = ancestor.join("node_modules");
            if !disk.is_directory(&modules) {
                continue;
            }
            let candidates = [
                modules.join(specifier),
                modules.join("@types").join(types_package(specifier)),
            ];
            for candidate in candidates {
                if let Some(path) = self.package_entry(&candidate) {
                    return Some(ResolvedModule {
                        path,
                        is_external_library: true,
                    });
                }
            }
        }
        tracing::trace!("Could not resolve module '{}' from {}", specifier, directory);
        None
    }

    fn package_entry(&self, directory: &Utf8Path) -> Option<Utf8PathBuf> {
        if let Some(file) = self.probe_file(directory) {
            return Some(file);
        }

        let manifest = directory.join("package.json");
        if let Ok(text) = self.vfs.read_text(&manifest) {
            match serde_json::from_str::<PackageManifest>(&text) {
                Ok(manifest) => {
                    let entries = [manifest.types, manifest.typings, manifest.main];
                    for entry in entries.into_iter().flatten() {
                        if let Some(found) = self.probe(&directory.join(entry)) {
                            return Some(found);
                        }
                    }
                }
                Err(err) => tracing::debug!("Ignoring unreadable {}: {}", manifest, err),
            }
        }

        self.probe_index(directory)
    }

    fn probe(&self, base: &Utf8Path) -> Option<Utf8PathBuf> {
        let base = clean_utf8_path(base);
        self.probe_file(&base).or_else(|| self.probe_index(&base))
    }

    fn probe_file(&self, base: &Utf8Path) -> Option<Utf8PathBuf> {
        if self.is_file(base) {
            if is_composite(base) {
                return Some(script_view(base));
            }
            if base
                .extension()
                .is_some_and(|extension| SCRIPT_EXTENSIONS.contains(&extension))
            {
                return Some(base.to_path_buf());
            }
        }

        for extension in EXTENSIONS {
            let candidate = Utf8PathBuf::from(format!("{base}{extension}"));
            if self.is_file(&candidate) {
                return Some(if is_composite(&candidate) {
                    script_view(&candidate)
                } else {
                    candidate
                });
            }
        }

        // `./util.js` may name the TypeScript source it is compiled from.
        let stem = base.as_str().strip_suffix(".js")?;
        [".ts", ".tsx"]
            .into_iter()
            .map(|extension| Utf8PathBuf::from(format!("{stem}{extension}")))
            .find(|candidate| self.is_file(candidate))
    }

    fn probe_index(&self, directory: &Utf8Path) -> Option<Utf8PathBuf> {
        if !self.vfs.disk().is_directory(directory) {
            return None;
        }
        EXTENSIONS
            .into_iter()
            .filter(|extension| *extension != ".vue")
            .map(|extension| directory.join(format!("index{extension}")))
            .find(|candidate| self.is_file(candidate))
    }

    fn is_file(&self, path: &Utf8Path) -> bool {
        matches!(PathClass::classify(path), PathClass::Disk(_))
            && self.vfs.exists(path)
            && !self.vfs.disk().is_directory(path)
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Utf8Path::new(specifier).is_absolute()
}

fn project_file(path: Utf8PathBuf) -> ResolvedModule {
    ResolvedModule {
        path,
        is_external_library: false,
    }
}

fn script_view(source: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{source}{SCRIPT_SUFFIX}"))
}

/// `@scope/name` is published as `@types/scope__name`.
fn types_package(specifier: &str) -> String {
    match specifier.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, name)) => format!("{scope}__{name}"),
        None => specifier.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use vls_source::InMemoryFileSystem;
    use vls_workspace::Buffers;

    use super::*;

    fn vfs(files: &[(&str, &str)]) -> VirtualFileSystem {
        let fs = Arc::new(InMemoryFileSystem::new());
        for (path, text) in files {
            fs.add_file(*path, *text);
        }
        VirtualFileSystem::new(fs, Buffers::new())
    }

    fn resolve(vfs: &VirtualFileSystem, options: &CompilerOptions, specifier: &str) -> Option<ResolvedModule> {
        ModuleResolver::new(vfs, Utf8Path::new("/app"), options)
            .resolve(specifier, Utf8Path::new("/app/src/App.vue.ts"))
    }

    fn path(resolved: Option<ResolvedModule>) -> Option<String> {
        resolved.map(|resolved| resolved.path.to_string())
    }

    #[test]
    fn test_relative_extension_probing() {
        let vfs = vfs(&[
            ("/app/src/util.ts", ""),
            ("/app/src/lib/index.js", ""),
            ("/app/src/Child.vue", "<script></script>"),
            ("/app/src/types.d.ts", ""),
        ]);
        let options = CompilerOptions::default();
        assert_eq!(path(resolve(&vfs, &options, "./util")).as_deref(), Some("/app/src/util.ts"));
        assert_eq!(path(resolve(&vfs, &options, "./util.js")).as_deref(), Some("/app/src/util.ts"));
        assert_eq!(path(resolve(&vfs, &options, "./lib")).as_deref(), Some("/app/src/lib/index.js"));
        assert_eq!(path(resolve(&vfs, &options, "./types")).as_deref(), Some("/app/src/types.d.ts"));
        assert_eq!(path(resolve(&vfs, &options, "./missing")), None);
    }

    #[test]
    fn test_components_resolve_to_script_view() {
        let vfs = vfs(&[("/app/src/Child.vue", "<script></script>")]);
        let options = CompilerOptions::default();
        assert_eq!(
            path(resolve(&vfs, &options, "./Child.vue")).as_deref(),
            Some("/app/src/Child.vue.ts")
        );
        assert_eq!(
            path(resolve(&vfs, &options, "./Child")).as_deref(),
            Some("/app/src/Child.vue.ts")
        );
    }

    #[test]
    fn test_template_view_resolves_its_component() {
        let vfs = vfs(&[("/app/src/App.vue", "<script></script>")]);
        let resolved = ModuleResolver::new(&vfs, Utf8Path::new("/app"), &CompilerOptions::default())
            .resolve("./App.vue", Utf8Path::new("/app/src/App.vue.template.ts"));
        assert_eq!(path(resolved).as_deref(), Some("/app/src/App.vue.ts"));
    }

    #[test]
    fn test_paths_mapping() {
        let vfs = vfs(&[
            ("/app/src/components/Button.vue", ""),
            ("/app/src/store.ts", ""),
        ]);
        let options = CompilerOptions {
            base_url: Some(".".to_string()),
            paths: Some(BTreeMap::from([
                ("@/*".to_string(), vec!["src/*".to_string()]),
                ("~store".to_string(), vec!["src/store".to_string()]),
            ])),
            ..CompilerOptions::default()
        };
        assert_eq!(
            path(resolve(&vfs, &options, "@/components/Button.vue")).as_deref(),
            Some("/app/src/components/Button.vue.ts")
        );
        assert_eq!(path(resolve(&vfs, &options, "~store")).as_deref(), Some("/app/src/store.ts"));
        assert_eq!(path(resolve(&vfs, &options, "src/store")).as_deref(), Some("/app/src/store.ts"));
    }

    #[test]
    fn test_node_modules_walk() {
        let vfs = vfs(&[
            ("/app/node_modules/vue/package.json", r#"{ "types": "dist/vue.d.ts", "main": "index.js" }"#),
            ("/app/node_modules/vue/dist/vue.d.ts", ""),
            ("/app/node_modules/lodash/index.js", ""),
            ("/app/node_modules/@types/scope__pkg/index.d.ts", ""),
        ]);
        let options = CompilerOptions::default();

        let vue = resolve(&vfs, &options, "vue").unwrap();
        assert_eq!(vue.path, Utf8PathBuf::from("/app/node_modules/vue/dist/vue.d.ts"));
        assert!(vue.is_external_library);

        assert_eq!(
            path(resolve(&vfs, &options, "lodash")).as_deref(),
            Some("/app/node_modules/lodash/index.js")
        );
        assert_eq!(
            path(resolve(&vfs, &options, "@scope/pkg")).as_deref(),
            Some("/app/node_modules/@types/scope__pkg/index.d.ts")
        );
        assert_eq!(path(resolve(&vfs, &options, "react")), None);
    }

    #[test]
    fn test_cache_invalidation() {
        let cache = ModuleResolutionCache::new();
        let resolved = ResolvedModule {
            path: Utf8PathBuf::from("/app/src/util.ts"),
            is_external_library: false,
        };
        cache.set("./util", Utf8Path::new("/app/src/App.vue.ts"), Some(resolved.clone()));
        cache.set("./util", Utf8Path::new("/app/src/main.ts"), Some(resolved.clone()));
        cache.set("./gone", Utf8Path::new("/app/src/main.ts"), None);
        assert_eq!(cache.len(), 3);
        assert_eq!(
            cache.get("./util", Utf8Path::new("/app/src/main.ts")),
            Some(Some(resolved))
        );
        assert_eq!(cache.get("./gone", Utf8Path::new("/app/src/main.ts")), Some(None));
        assert_eq!(cache.get("./other", Utf8Path::new("/app/src/main.ts")), None);

        cache.invalidate_containing(Utf8Path::new("/app/src/App.vue"));
        assert_eq!(cache.len(), 2);

        cache.invalidate_target(Utf8Path::new("/app/src/nothing.ts"));
        assert_eq!(cache.len(), 1);

        cache.invalidate_target(Utf8Path::new("/app/src/util.ts"));
        assert!(cache.is_empty());
    }
}
