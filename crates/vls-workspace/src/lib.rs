//! Open documents, versioned caching and the virtual filesystem.
//!
//! This crate holds the document-level state shared by every project:
//!
//! - [`Buffers`]: documents the client has open, keyed by path
//! - [`VersionedCache`]: memoization keyed by document identity and version
//! - [`VirtualFileSystem`]: the filesystem the analysis engines read through,
//!   serving synthesized views of component files next to ordinary files

mod buffers;
pub mod cache;
mod document;
mod language;
pub mod paths;
mod vfs;

pub use buffers::Buffers;
pub use cache::CacheLimits;
pub use cache::Clock;
pub use cache::ManualClock;
pub use cache::SystemClock;
pub use cache::VersionedCache;
pub use document::TextDocument;
pub use language::LanguageId;
pub use paths::path_to_url;
pub use paths::url_to_path;
pub use vfs::is_composite;
pub use vfs::PathClass;
pub use vfs::VfsError;
pub use vfs::VirtualFileSystem;
