use std::sync::Arc;

use vls_conf::CompilerOptions;

use crate::host::ServiceHost;
use crate::registry::DocumentRegistry;
use crate::scan::ScanService;
use crate::service::LanguageService;

/// Creates the engines a project runs.
///
/// A project asks for one engine per option set, all sharing the same host
/// and [`DocumentRegistry`], so a file parsed for one engine is reused by the
/// others.
pub trait ServiceFactory: Send + Sync {
    fn create(
        &self,
        host: Arc<dyn ServiceHost>,
        registry: Arc<DocumentRegistry>,
        options: CompilerOptions,
    ) -> Arc<dyn LanguageService>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScanServiceFactory;

impl ServiceFactory for ScanServiceFactory {
    fn create(
        &self,
        host: Arc<dyn ServiceHost>,
        registry: Arc<DocumentRegistry>,
        options: CompilerOptions,
    ) -> Arc<dyn LanguageService> {
        Arc::new(ScanService::new(host, registry, options))
    }
}
