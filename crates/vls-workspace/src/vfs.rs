//! Filesystem view handed to the analysis engines.
//!
//! Every path is classified first and then answered by the handler for its
//! class. Component files never reach an engine directly: the engine asks
//! for `App.vue.ts` or `App.vue.template.ts` and receives the synthesized
//! view of `App.vue`, taken from the open buffer when there is one and from
//! disk otherwise.

use std::io;
use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use thiserror::Error;
use vls_embedded::segment;
use vls_embedded::synthesize;
use vls_embedded::Regions;
use vls_embedded::SourceDocument;
use vls_embedded::VirtualDocument;
use vls_embedded::VirtualTarget;
use vls_embedded::COMPOSITE_EXTENSION;
use vls_embedded::SCRIPT_SUFFIX;
use vls_embedded::TEMPLATE_SUFFIX;
use vls_source::DirectoryFilter;
use vls_source::FileSystem;
use vls_source::FxDashMap;

use crate::buffers::Buffers;
use crate::cache::CacheLimits;
use crate::cache::Clock;
use crate::cache::SystemClock;
use crate::cache::VersionedCache;
use crate::document::TextDocument;
use crate::language::LanguageId;

/// Set on versions of open documents so they never collide with the
/// generation counter of the same file on disk.
const OPEN_BIT: u64 = 1 << 63;

/// Generations are packed below `OPEN_BIT`.
const GENERATION_MASK: u32 = u32::MAX >> 1;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("File not found: {0}")]
    NotFound(Utf8PathBuf),
    #[error("Failed to read {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathClass {
    Disk(Utf8PathBuf),
    /// Script view of the component at the contained path.
    VirtualScript(Utf8PathBuf),
    /// Template-as-script view of the component at the contained path.
    VirtualTemplate(Utf8PathBuf),
}

impl PathClass {
    /// Classify `path`. The template suffix ends in the script suffix, so it
    /// is checked first.
    #[must_use]
    pub fn classify(path: &Utf8Path) -> Self {
        let text = path.as_str();
        let stripped = |suffix: &str| {
            text.strip_suffix(suffix)
                .filter(|source| is_composite(Utf8Path::new(source)))
        };
        if let Some(source) = stripped(TEMPLATE_SUFFIX) {
            return PathClass::VirtualTemplate(Utf8PathBuf::from(source));
        }
        if let Some(source) = stripped(SCRIPT_SUFFIX) {
            return PathClass::VirtualScript(Utf8PathBuf::from(source));
        }
        PathClass::Disk(path.to_path_buf())
    }

    /// The file that actually backs this path.
    #[must_use]
    pub fn backing_path(&self) -> &Utf8Path {
        match self {
            PathClass::Disk(path) | PathClass::VirtualScript(path) | PathClass::VirtualTemplate(path) => {
                path
            }
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<VirtualTarget> {
        match self {
            PathClass::Disk(_) => None,
            PathClass::VirtualScript(_) => Some(VirtualTarget::Script),
            PathClass::VirtualTemplate(_) => Some(VirtualTarget::Template),
        }
    }
}

/// Whether `path` names a component file.
#[must_use]
pub fn is_composite(path: &Utf8Path) -> bool {
    path.extension() == Some(COMPOSITE_EXTENSION)
}

pub struct VirtualFileSystem {
    fs: Arc<dyn FileSystem>,
    buffers: Buffers,
    regions: VersionedCache<Utf8PathBuf, Regions>,
    views: VersionedCache<(Utf8PathBuf, VirtualTarget), VirtualDocument>,
    /// Bumped whenever a file changes outside of the buffers or a buffer is
    /// opened or closed.
    generations: FxDashMap<Utf8PathBuf, u32>,
}

impl std::fmt::Debug for VirtualFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFileSystem")
            .field("buffers", &self.buffers)
            .field("regions", &self.regions)
            .field("views", &self.views)
            .finish_non_exhaustive()
    }
}

impl VirtualFileSystem {
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, buffers: Buffers) -> Self {
        Self::with_clock(fs, buffers, CacheLimits::default(), Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        fs: Arc<dyn FileSystem>,
        buffers: Buffers,
        limits: CacheLimits,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fs,
            buffers,
            regions: VersionedCache::new(limits, Arc::clone(&clock)),
            views: VersionedCache::new(limits, clock),
            generations: FxDashMap::default(),
        }
    }

    #[must_use]
    pub fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    #[must_use]
    pub fn disk(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn set_cache_limits(&self, limits: CacheLimits) {
        self.regions.set_limits(limits);
        self.views.set_limits(limits);
    }

    #[must_use]
    pub fn exists(&self, path: &Utf8Path) -> bool {
        let class = PathClass::classify(path);
        let backing = class.backing_path();
        self.buffers.contains(backing) || self.fs.exists(backing)
    }

    pub fn read_text(&self, path: &Utf8Path) -> Result<Arc<str>, VfsError> {
        self.snapshot(path).map(|(_, text)| text)
    }

    /// The text of `path` together with the version it was read at. Both
    /// come from the same buffer snapshot, disk read or view.
    pub fn snapshot(&self, path: &Utf8Path) -> Result<(u64, Arc<str>), VfsError> {
        let (version, view) = match PathClass::classify(path) {
            PathClass::Disk(path) => {
                return match self.buffers.get(&path) {
                    Some(document) => Ok((self.open_version(&path, &document), document.text())),
                    None => {
                        let version = u64::from(self.generation(&path));
                        self.read_disk(&path).map(|text| (version, text))
                    }
                };
            }
            PathClass::VirtualScript(source) => {
                self.versioned_view(&source, VirtualTarget::Script)?
            }
            PathClass::VirtualTemplate(source) => {
                self.versioned_view(&source, VirtualTarget::Template)?
            }
        };
        Ok((version, Arc::clone(&view.text)))
    }

    /// Resolve symlinks of the backing file and reattach the view suffix.
    #[must_use]
    pub fn real_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        match PathClass::classify(path) {
            PathClass::Disk(path) => self.fs.real_path(&path),
            PathClass::VirtualScript(source) => {
                Utf8PathBuf::from(format!("{}{SCRIPT_SUFFIX}", self.fs.real_path(&source)))
            }
            PathClass::VirtualTemplate(source) => {
                Utf8PathBuf::from(format!("{}{TEMPLATE_SUFFIX}", self.fs.real_path(&source)))
            }
        }
    }

    /// Files beneath `root` on disk. Views are never listed; projects derive
    /// them from the component files.
    #[must_use]
    pub fn read_directory(&self, root: &Utf8Path, filter: &DirectoryFilter) -> Vec<Utf8PathBuf> {
        self.fs.read_directory(root, filter)
    }

    /// Opaque version of `path`. A view shares the version of its component.
    #[must_use]
    pub fn version(&self, path: &Utf8Path) -> Option<u64> {
        let class = PathClass::classify(path);
        let backing = class.backing_path();
        match self.buffers.get(backing) {
            Some(document) => Some(self.open_version(backing, &document)),
            None => self
                .fs
                .exists(backing)
                .then(|| u64::from(self.generation(backing))),
        }
    }

    /// Regions of the component at `source`, cached per version.
    pub fn regions(&self, source: &Utf8Path) -> Result<Arc<Regions>, VfsError> {
        let key = source.to_path_buf();
        if let Some(document) = self.buffers.get(source) {
            let version = self.open_version(source, &document);
            return Ok(self
                .regions
                .get_or_compute(&key, version, document.language_id(), || {
                    segment(document.content())
                }));
        }

        let version = u64::from(self.generation(source));
        let language = LanguageId::from_extension(source.extension());
        if let Some(regions) = self.regions.get(&key, version, &language) {
            return Ok(regions);
        }
        let text = self.read_disk(source)?;
        Ok(self.regions.set(key, version, language, segment(&text)))
    }

    /// The `target` view of the component at `source`, cached per version.
    pub fn virtual_document(
        &self,
        source: &Utf8Path,
        target: VirtualTarget,
    ) -> Result<Arc<VirtualDocument>, VfsError> {
        self.versioned_view(source, target).map(|(_, view)| view)
    }

    /// A view and the version it is cached under. A view is always built
    /// from the regions of the very text it is synthesized from.
    fn versioned_view(
        &self,
        source: &Utf8Path,
        target: VirtualTarget,
    ) -> Result<(u64, Arc<VirtualDocument>), VfsError> {
        let key = (source.to_path_buf(), target);
        if let Some(document) = self.buffers.get(source) {
            let version = self.open_version(source, &document);
            let language = document.language_id();
            if let Some(view) = self.views.get(&key, version, language) {
                return Ok((version, view));
            }
            let view = self.synthesize_view(
                SourceDocument {
                    path: source,
                    text: document.content(),
                    version: document.version(),
                },
                version,
                language,
                target,
            );
            return Ok((version, self.views.set(key, version, language.clone(), view)));
        }

        let generation = self.generation(source);
        let version = u64::from(generation);
        let language = LanguageId::from_extension(source.extension());
        if let Some(view) = self.views.get(&key, version, &language) {
            return Ok((version, view));
        }
        let text = self.read_disk(source)?;
        let view = self.synthesize_view(
            SourceDocument {
                path: source,
                text: &text,
                version: i32::try_from(generation).unwrap_or(i32::MAX),
            },
            version,
            &language,
            target,
        );
        Ok((version, self.views.set(key, version, language, view)))
    }

    /// Segment `document.text` and synthesize from those regions. The
    /// regions cache may hold a segmentation of another text at the same
    /// version, so it is only written here, never read.
    fn synthesize_view(
        &self,
        document: SourceDocument<'_>,
        version: u64,
        language: &LanguageId,
        target: VirtualTarget,
    ) -> VirtualDocument {
        let regions = segment(document.text);
        let view = synthesize(document, &regions, target);
        self.regions
            .set(document.path.to_path_buf(), version, language.clone(), regions);
        view
    }

    /// Record that `path` changed outside of the open buffers. Returns the
    /// new generation.
    pub fn mark_changed(&self, path: &Utf8Path) -> u32 {
        let generation = {
            let mut entry = self.generations.entry(path.to_path_buf()).or_insert(0);
            *entry = entry.wrapping_add(1);
            *entry
        };
        tracing::trace!(%path, generation, "file changed");
        self.drop_cached(path);
        generation
    }

    /// Drop every cached derivation of `path`, used when a document is
    /// opened or closed.
    pub fn invalidate(&self, path: &Utf8Path) {
        self.mark_changed(path);
    }

    /// Forget all cached derivations and generations.
    pub fn clear(&self) {
        self.regions.clear();
        self.views.clear();
        self.generations.clear();
    }

    fn drop_cached(&self, path: &Utf8Path) {
        self.regions.invalidate(&path.to_path_buf());
        self.views.invalidate_where(|(source, _)| source == path);
    }

    fn generation(&self, path: &Utf8Path) -> u32 {
        self.generations.get(path).map_or(0, |entry| *entry)
    }

    fn open_version(&self, path: &Utf8Path, document: &TextDocument) -> u64 {
        let client = u32::from_ne_bytes(document.version().to_ne_bytes());
        let generation = self.generation(path) & GENERATION_MASK;
        OPEN_BIT | (u64::from(generation) << 32) | u64::from(client)
    }

    fn read_disk(&self, path: &Utf8Path) -> Result<Arc<str>, VfsError> {
        self.fs
            .read_to_string(path)
            .map(Arc::from)
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    VfsError::NotFound(path.to_path_buf())
                } else {
                    VfsError::Io {
                        path: path.to_path_buf(),
                        source,
                    }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use url::Url;
    use vls_source::InMemoryFileSystem;

    use super::*;

    const APP: &str = "<template><p>{{ a }}</p></template>\n<script>export default { data() { return { a: 1 } } }</script>\n";

    fn vfs() -> (VirtualFileSystem, Arc<InMemoryFileSystem>) {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.add_file("/p/App.vue", APP);
        fs.add_file("/p/util.ts", "export const x = 1;");
        (VirtualFileSystem::new(fs.clone(), Buffers::new()), fs)
    }

    fn url() -> Url {
        Url::parse("file:///p/App.vue").unwrap()
    }

    #[test]
    fn test_classify_template_before_script() {
        assert_eq!(
            PathClass::classify(Utf8Path::new("/p/App.vue.template.ts")),
            PathClass::VirtualTemplate(Utf8PathBuf::from("/p/App.vue"))
        );
        assert_eq!(
            PathClass::classify(Utf8Path::new("/p/App.vue.ts")),
            PathClass::VirtualScript(Utf8PathBuf::from("/p/App.vue"))
        );
        assert_eq!(
            PathClass::classify(Utf8Path::new("/p/util.ts")),
            PathClass::Disk(Utf8PathBuf::from("/p/util.ts"))
        );
        assert_eq!(
            PathClass::classify(Utf8Path::new("/p/layout.template.ts")),
            PathClass::Disk(Utf8PathBuf::from("/p/layout.template.ts"))
        );
    }

    #[test]
    fn test_virtual_paths_exist_with_their_component() {
        let (vfs, fs) = vfs();
        assert!(vfs.exists(Utf8Path::new("/p/App.vue.ts")));
        assert!(vfs.exists(Utf8Path::new("/p/App.vue.template.ts")));
        assert!(!vfs.exists(Utf8Path::new("/p/Missing.vue.ts")));

        fs.remove_file(Utf8Path::new("/p/App.vue"));
        assert!(!vfs.exists(Utf8Path::new("/p/App.vue.ts")));
    }

    #[test]
    fn test_read_virtual_script_from_disk() {
        let (vfs, _) = vfs();
        let text = vfs.read_text(Utf8Path::new("/p/App.vue.ts")).unwrap();
        assert_eq!(text.len(), APP.len());
        assert!(text.trim_start().starts_with("export default"));
        assert_eq!(
            &*vfs.read_text(Utf8Path::new("/p/util.ts")).unwrap(),
            "export const x = 1;"
        );
    }

    #[test]
    fn test_open_buffer_wins() {
        let (vfs, _) = vfs();
        let edited = APP.replace("a: 1", "a: 2");
        vfs.buffers()
            .open(&url(), TextDocument::new(edited.as_str(), 1, LanguageId::Vue));
        let text = vfs.read_text(Utf8Path::new("/p/App.vue.ts")).unwrap();
        assert!(text.contains("a: 2"));
    }

    #[test]
    fn test_version_tracks_buffers_and_disk() {
        let (vfs, _) = vfs();
        let script = Utf8Path::new("/p/App.vue.ts");
        let on_disk = vfs.version(script).unwrap();

        vfs.mark_changed(Utf8Path::new("/p/App.vue"));
        let changed = vfs.version(script).unwrap();
        assert_ne!(on_disk, changed);

        vfs.buffers()
            .open(&url(), TextDocument::new(APP, 1, LanguageId::Vue));
        let open = vfs.version(script).unwrap();
        vfs.buffers()
            .update(&url(), TextDocument::new(APP, 2, LanguageId::Vue));
        let updated = vfs.version(script).unwrap();
        assert_ne!(open, changed);
        assert_ne!(open, updated);
        assert_eq!(vfs.version(Utf8Path::new("/p/App.vue.template.ts")), Some(updated));
        assert_eq!(vfs.version(Utf8Path::new("/p/nope.ts")), None);
    }

    #[test]
    fn test_views_are_cached_per_version() {
        let (vfs, _) = vfs();
        vfs.buffers()
            .open(&url(), TextDocument::new(APP, 1, LanguageId::Vue));
        let source = Utf8Path::new("/p/App.vue");
        let first = vfs.virtual_document(source, VirtualTarget::Template).unwrap();
        let second = vfs.virtual_document(source, VirtualTarget::Template).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        vfs.buffers()
            .update(&url(), TextDocument::new(APP.replace("{{ a }}", "{{ b }}"), 2, LanguageId::Vue));
        let third = vfs.virtual_document(source, VirtualTarget::Template).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.version, 2);
        assert!(third.text.contains("this.b"));
    }

    #[test]
    fn test_view_segments_the_text_it_reads() {
        let (vfs, fs) = vfs();
        let source = Utf8Path::new("/p/Accents.vue");
        fs.add_file("/p/Accents.vue", "<template >ééé{{ a }}</template>");
        vfs.regions(source).unwrap();

        // rewritten behind the generation counter, so cached regions are stale
        fs.add_file("/p/Accents.vue", "<template>ééé{{ a }}</template>");
        let view = vfs.virtual_document(source, VirtualTarget::Template).unwrap();
        assert!(view.text.contains("this.a"));
        let (_, text) = vfs
            .snapshot(Utf8Path::new("/p/Accents.vue.template.ts"))
            .unwrap();
        assert_eq!(text, view.text);
    }

    #[test]
    fn test_snapshot_pairs_text_with_version() {
        let (vfs, _) = vfs();
        let script = Utf8Path::new("/p/App.vue.ts");
        let (version, text) = vfs.snapshot(script).unwrap();
        assert_eq!(Some(version), vfs.version(script));
        assert_eq!(text, vfs.read_text(script).unwrap());

        vfs.buffers()
            .open(&url(), TextDocument::new(APP.replace("a: 1", "a: 2"), 4, LanguageId::Vue));
        let (open, text) = vfs.snapshot(script).unwrap();
        assert_ne!(open, version);
        assert_eq!(Some(open), vfs.version(script));
        assert!(text.contains("a: 2"));
    }

    #[test]
    fn test_open_version_keeps_generation_below_open_bit() {
        let (vfs, _) = vfs();
        let source = Utf8Path::new("/p/App.vue");
        vfs.generations.insert(source.to_path_buf(), u32::MAX);
        vfs.buffers()
            .open(&url(), TextDocument::new(APP, 1, LanguageId::Vue));
        let version = vfs.version(source).unwrap();
        assert_eq!(version >> 32, (OPEN_BIT >> 32) | u64::from(GENERATION_MASK));
    }

    #[test]
    fn test_missing_component() {
        let (vfs, _) = vfs();
        let err = vfs.read_text(Utf8Path::new("/p/Gone.vue.ts")).unwrap_err();
        assert!(matches!(err, VfsError::NotFound(path) if path == "/p/Gone.vue"));
    }

    #[test]
    fn test_real_path_keeps_suffix() {
        let (vfs, _) = vfs();
        assert_eq!(
            vfs.real_path(Utf8Path::new("/p/./App.vue.template.ts")),
            Utf8PathBuf::from("/p/App.vue.template.ts")
        );
    }
}
