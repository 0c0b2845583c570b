mod collections;
mod path;
mod position;
mod system;

pub use collections::FxDashMap;
pub use collections::FxDashSet;
pub use path::clean_utf8_path;
pub use position::LineCol;
pub use position::LineIndex;
pub use position::Offset;
pub use position::PositionEncoding;
pub use position::Span;
pub use system::DirEntry;
pub use system::DirectoryFilter;
pub use system::FileSystem;
pub use system::InMemoryFileSystem;
pub use system::OsFileSystem;
