//! Projects: compiler configuration scopes and the engines that serve them.
//!
//! The [`ProjectRegistry`] maps directories to [`Project`]s. Each project
//! owns two engines created through a [`ServiceFactory`](vls_script::ServiceFactory),
//! a [`ProjectHost`] they share, and a [`ModuleResolutionCache`].

mod host;
mod project;
mod registry;
pub mod resolution;

pub use host::ProjectHost;
pub use project::Project;
pub use registry::ConfigKey;
pub use registry::ProjectRegistry;
pub use resolution::ModuleResolutionCache;
pub use resolution::ModuleResolver;
