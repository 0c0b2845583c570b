//! Embedded-language views of single-file components.
//!
//! A component is split into [`Region`]s by [`segment`]. Each region can be
//! turned into a [`VirtualDocument`]: a file in one language the analysis
//! engines understand, paired with a [`SourceMap`] back to the component.

mod markup;
pub mod regions;
pub mod source_map;
pub mod template;
pub mod virtual_doc;

pub use regions::segment;
pub use regions::Region;
pub use regions::RegionKind;
pub use regions::Regions;
pub use regions::COMPOSITE_LANGUAGE;
pub use source_map::MappedNodes;
pub use source_map::MappingNode;
pub use source_map::SourceMap;
pub use template::COMPONENT_BINDING;
pub use template::RENDER_FUNCTION;
pub use virtual_doc::blank_outside;
pub use virtual_doc::synthesize;
pub use virtual_doc::SourceDocument;
pub use virtual_doc::VirtualDocument;
pub use virtual_doc::VirtualTarget;
pub use virtual_doc::COMPOSITE_EXTENSION;
pub use virtual_doc::SCRIPT_SUFFIX;
pub use virtual_doc::TEMPLATE_SUFFIX;
