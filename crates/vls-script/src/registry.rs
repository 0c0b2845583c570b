use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use vls_source::FxDashMap;

use crate::host::ServiceHost;
use crate::scan::SourceModel;

/// Parsed source models shared by every engine of one project.
///
/// Models are keyed by path and tagged with the host version they were built
/// from, so a model is rebuilt exactly when its file changed.
#[derive(Default)]
pub struct DocumentRegistry {
    models: FxDashMap<Utf8PathBuf, (u64, Arc<SourceModel>)>,
}

impl DocumentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquire(
        &self,
        host: &dyn ServiceHost,
        path: &Utf8Path,
    ) -> Option<Arc<SourceModel>> {
        let version = host.script_version(path)?;
        if let Some(entry) = self.models.get(path) {
            if entry.0 == version {
                return Some(Arc::clone(&entry.1));
            }
        }

        // The text may be newer than the version checked above.
        let (version, text) = host.versioned_snapshot(path)?;
        let model = Arc::new(SourceModel::build(text, host.script_kind(path)));
        tracing::trace!("Built source model for {} at version {}", path, version);
        self.models
            .insert(path.to_path_buf(), (version, Arc::clone(&model)));
        Some(model)
    }

    pub fn release(&self, path: &Utf8Path) {
        self.models.remove(path);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&self) {
        self.models.clear();
    }
}
