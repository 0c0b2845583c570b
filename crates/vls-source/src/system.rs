use std::io;
use std::sync::RwLock;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use globset::GlobBuilder;
use globset::GlobSet;
use globset::GlobSetBuilder;
use rustc_hash::FxHashMap;

use crate::path::clean_utf8_path;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: Utf8PathBuf,
    pub is_dir: bool,
}

/// Filter applied by [`FileSystem::read_directory`].
///
/// Include and exclude globs are relative to the walk root and compiled once
/// when the filter is built. A pattern naming a directory covers everything
/// beneath it. Without include patterns every file is included.
#[derive(Debug, Clone, Default)]
pub struct DirectoryFilter {
    extensions: Vec<String>,
    includes: Option<GlobSet>,
    excludes: GlobSet,
    depth: Option<usize>,
}

impl DirectoryFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only list files ending in one of `extensions` (`.vue`, `.ts`, ...).
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_includes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<S> = patterns.into_iter().collect();
        self.includes = (!patterns.is_empty()).then(|| glob_set(&patterns));
        self
    }

    #[must_use]
    pub fn with_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<S> = patterns.into_iter().collect();
        self.excludes = glob_set(&patterns);
        self
    }

    /// Descend at most `depth` directories below the root.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn accepts_extension(&self, path: &Utf8Path) -> bool {
        self.extensions.is_empty()
            || self
                .extensions
                .iter()
                .any(|ext| path.as_str().ends_with(ext.as_str()))
    }

    /// Whether the root-relative path is excluded.
    #[must_use]
    pub fn is_excluded(&self, relative: &str) -> bool {
        self.excludes.is_match(relative)
    }

    /// Whether the root-relative path is included.
    #[must_use]
    pub fn is_included(&self, relative: &str) -> bool {
        self.includes
            .as_ref()
            .map_or(true, |includes| includes.is_match(relative))
    }
}

/// Compile config-style globs: `*` and `?` stay within one path segment,
/// `**` spans any number of them. Invalid patterns are skipped.
fn glob_set<S: AsRef<str>>(patterns: &[S]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let normalized = pattern.trim_start_matches("./").trim_end_matches('/');
        if normalized.is_empty() {
            continue;
        }
        for variant in [normalized.to_string(), format!("{normalized}/**")] {
            match GlobBuilder::new(&variant).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => {
                    tracing::warn!("Ignoring invalid pattern {:?}: {}", pattern, err);
                    break;
                }
            }
        }
    }
    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Cannot compile patterns: {}", err);
        GlobSet::empty()
    })
}

/// Filesystem capability consumed by the core.
///
/// Implementations only need the primitive operations; the recursive
/// [`read_directory`](FileSystem::read_directory) walk is shared.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String>;

    fn exists(&self, path: &Utf8Path) -> bool;

    fn is_directory(&self, path: &Utf8Path) -> bool;

    fn read_dir(&self, path: &Utf8Path) -> io::Result<Vec<DirEntry>>;

    /// Resolve symlinks. Paths that cannot be resolved are returned as-is.
    fn real_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        clean_utf8_path(path)
    }

    /// Recursively list files beneath `root` accepted by `filter`, sorted.
    fn read_directory(&self, root: &Utf8Path, filter: &DirectoryFilter) -> Vec<Utf8PathBuf> {
        let mut found = Vec::new();
        let mut stack = vec![(root.to_path_buf(), 0usize)];

        while let Some((dir, depth)) = stack.pop() {
            let Ok(entries) = self.read_dir(&dir) else {
                continue;
            };

            for entry in entries {
                let Ok(relative) = entry.path.strip_prefix(root) else {
                    continue;
                };
                let relative = relative.as_str().replace('\\', "/");
                if filter.is_excluded(&relative) {
                    continue;
                }

                if entry.is_dir {
                    if filter.depth.map_or(true, |max| depth < max) {
                        stack.push((entry.path, depth + 1));
                    }
                } else if filter.accepts_extension(&entry.path) && filter.is_included(&relative) {
                    found.push(entry.path);
                }
            }
        }

        found.sort();
        found
    }
}

/// Standard file system implementation that uses [`std::fs`].
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Utf8Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Utf8Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in path.read_dir_utf8()? {
            let entry = entry?;
            let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
            entries.push(DirEntry {
                path: entry.into_path(),
                is_dir,
            });
        }
        Ok(entries)
    }

    fn real_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        path.canonicalize_utf8()
            .unwrap_or_else(|_| clean_utf8_path(path))
    }
}

/// In-memory file system, mainly for tests. Directories are implied by the
/// files stored beneath them.
#[derive(Default)]
pub struct InMemoryFileSystem {
    files: RwLock<FxHashMap<Utf8PathBuf, String>>,
}

impl InMemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<Utf8PathBuf>, content: impl Into<String>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(clean_utf8_path(&path.into()), content.into());
        }
    }

    pub fn remove_file(&self, path: &Utf8Path) -> Option<String> {
        self.files
            .write()
            .ok()
            .and_then(|mut files| files.remove(path))
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        self.files
            .read()
            .ok()
            .and_then(|files| files.get(path).cloned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "File not found"))
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        self.files
            .read()
            .is_ok_and(|files| files.contains_key(path))
    }

    fn is_directory(&self, path: &Utf8Path) -> bool {
        self.files.read().is_ok_and(|files| {
            files
                .keys()
                .any(|file| file != path && file.starts_with(path))
        })
    }

    fn read_dir(&self, path: &Utf8Path) -> io::Result<Vec<DirEntry>> {
        let files = self
            .files
            .read()
            .map_err(|_| io::Error::other("file table poisoned"))?;

        let mut entries: Vec<DirEntry> = Vec::new();
        for file in files.keys() {
            let Ok(relative) = file.strip_prefix(path) else {
                continue;
            };
            let mut components = relative.components();
            let Some(first) = components.next() else {
                continue;
            };
            let child = path.join(first.as_str());
            let is_dir = components.next().is_some();
            if !entries.iter().any(|entry| entry.path == child) {
                entries.push(DirEntry { path: child, is_dir });
            }
        }

        if entries.is_empty() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "Directory not found"));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod in_memory {
        use super::*;

        #[test]
        fn test_read_existing_file() {
            let fs = InMemoryFileSystem::new();
            fs.add_file("/app/App.vue", "<template/>");

            assert_eq!(
                fs.read_to_string(Utf8Path::new("/app/App.vue")).unwrap(),
                "<template/>"
            );
        }

        #[test]
        fn test_read_nonexistent_file() {
            let fs = InMemoryFileSystem::new();

            let result = fs.read_to_string(Utf8Path::new("/missing.vue"));
            assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        }

        #[test]
        fn test_directories_are_implied() {
            let fs = InMemoryFileSystem::new();
            fs.add_file("/app/src/main.ts", "");

            assert!(fs.is_directory(Utf8Path::new("/app/src")));
            assert!(!fs.is_directory(Utf8Path::new("/app/src/main.ts")));
            assert!(!fs.exists(Utf8Path::new("/app/src")));
        }
    }

    mod filter {
        use super::*;

        #[test]
        fn test_single_star_stays_in_segment() {
            let filter = DirectoryFilter::new().with_includes(["src/*.ts"]);
            assert!(filter.is_included("src/main.ts"));
            assert!(!filter.is_included("src/nested/main.ts"));
        }

        #[test]
        fn test_double_star_spans_segments() {
            let filter = DirectoryFilter::new().with_includes(["src/**/*.vue", "**/*.d.ts"]);
            assert!(filter.is_included("src/App.vue"));
            assert!(filter.is_included("src/a/b/c.vue"));
            assert!(filter.is_included("types/env.d.ts"));
            assert!(!filter.is_included("lib/App.vue"));
        }

        #[test]
        fn test_question_mark_and_leading_dot() {
            let filter = DirectoryFilter::new().with_includes(["./a?.ts"]);
            assert!(filter.is_included("ab.ts"));
            assert!(!filter.is_included("abc.ts"));
        }

        #[test]
        fn test_directory_pattern_covers_descendants() {
            let filter = DirectoryFilter::new().with_excludes(["dist", "**/node_modules"]);
            assert!(filter.is_excluded("dist"));
            assert!(filter.is_excluded("dist/main.js"));
            assert!(!filter.is_excluded("src/dist.ts"));
            assert!(filter.is_excluded("node_modules/vue/index.js"));
            assert!(filter.is_excluded("packages/ui/node_modules"));
        }

        #[test]
        fn test_invalid_patterns_are_skipped() {
            let filter = DirectoryFilter::new().with_includes(["src/[", "src/*.ts"]);
            assert!(filter.is_included("src/main.ts"));
            assert!(!filter.is_included("src/["));
        }

        #[test]
        fn test_no_includes_means_everything() {
            let filter = DirectoryFilter::new().with_includes(Vec::<String>::new());
            assert!(filter.is_included("anything/at/all.vue"));
        }
    }

    mod read_directory {
        use super::*;

        fn project() -> InMemoryFileSystem {
            let fs = InMemoryFileSystem::new();
            fs.add_file("/app/tsconfig.json", "{}");
            fs.add_file("/app/src/App.vue", "");
            fs.add_file("/app/src/main.ts", "");
            fs.add_file("/app/src/components/Button.vue", "");
            fs.add_file("/app/node_modules/vue/index.d.ts", "");
            fs
        }

        #[test]
        fn test_filters_by_extension_and_exclude() {
            let fs = project();
            let filter = DirectoryFilter::new()
                .with_extensions([".vue", ".ts"])
                .with_excludes(["node_modules"]);

            let files = fs.read_directory(Utf8Path::new("/app"), &filter);
            assert_eq!(
                files,
                vec![
                    Utf8PathBuf::from("/app/src/App.vue"),
                    Utf8PathBuf::from("/app/src/components/Button.vue"),
                    Utf8PathBuf::from("/app/src/main.ts"),
                ]
            );
        }

        #[test]
        fn test_respects_include_and_depth() {
            let fs = project();
            let filter = DirectoryFilter::new()
                .with_extensions([".vue"])
                .with_includes(["src/*.vue"])
                .with_depth(1);

            let files = fs.read_directory(Utf8Path::new("/app"), &filter);
            assert_eq!(files, vec![Utf8PathBuf::from("/app/src/App.vue")]);
        }

        #[test]
        fn test_os_file_system_walk() {
            let tmp = tempfile::tempdir().unwrap();
            let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
            std::fs::create_dir_all(root.join("src")).unwrap();
            std::fs::write(root.join("src/App.vue"), "").unwrap();
            std::fs::write(root.join("notes.txt"), "").unwrap();

            let filter = DirectoryFilter::new().with_extensions([".vue"]);
            let files = OsFileSystem.read_directory(&root, &filter);
            assert_eq!(files, vec![root.join("src/App.vue")]);
        }
    }
}
