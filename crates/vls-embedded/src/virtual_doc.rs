//! Single-language views of a composite document.

use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use vls_source::Span;

use crate::regions::Region;
use crate::regions::RegionKind;
use crate::regions::Regions;
use crate::source_map::MappedNodes;
use crate::source_map::SourceMap;
use crate::template;

/// Appended to a component path to name its script view.
pub const SCRIPT_SUFFIX: &str = ".ts";
/// Appended to a component path to name its template-as-script view.
pub const TEMPLATE_SUFFIX: &str = ".template.ts";
/// Extension of composite documents.
pub const COMPOSITE_EXTENSION: &str = "vue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualTarget {
    Script,
    /// Template expressions rewritten as script.
    Template,
    /// The n-th style block.
    Style(usize),
}

impl VirtualTarget {
    /// Deterministic path of this view of `source`.
    #[must_use]
    pub fn path_for(self, source: &Utf8Path, regions: &Regions) -> Utf8PathBuf {
        match self {
            VirtualTarget::Script => Utf8PathBuf::from(format!("{source}{SCRIPT_SUFFIX}")),
            VirtualTarget::Template => Utf8PathBuf::from(format!("{source}{TEMPLATE_SUFFIX}")),
            VirtualTarget::Style(index) => {
                let language = regions
                    .of_kind(RegionKind::Style)
                    .nth(index)
                    .map_or("css", |region| region.language.as_str());
                Utf8PathBuf::from(format!("{source}.{index}.{language}"))
            }
        }
    }

    fn region(self, regions: &Regions) -> Option<&Region> {
        match self {
            VirtualTarget::Script => regions.first_of(RegionKind::Script),
            VirtualTarget::Template => regions.first_of(RegionKind::Template),
            VirtualTarget::Style(index) => regions.of_kind(RegionKind::Style).nth(index),
        }
    }
}

/// A snapshot of a composite document, as handed to [`synthesize`].
#[derive(Debug, Clone, Copy)]
pub struct SourceDocument<'a> {
    pub path: &'a Utf8Path,
    pub text: &'a str,
    pub version: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDocument {
    pub path: Utf8PathBuf,
    pub language: String,
    pub text: Arc<str>,
    /// Version of the composite snapshot this view was derived from.
    pub version: i32,
    pub source_map: SourceMap,
    /// The region the view was built from; `None` for an empty view.
    pub region: Option<Region>,
}

impl VirtualDocument {
    /// An empty view has nothing to analyse.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Build the `target` view of `document`.
///
/// When no region matches, the result is an empty document whose map
/// translates nothing.
#[must_use]
pub fn synthesize(
    document: SourceDocument<'_>,
    regions: &Regions,
    target: VirtualTarget,
) -> VirtualDocument {
    let path = target.path_for(document.path, regions);
    let Some(region) = target.region(regions) else {
        tracing::trace!(%path, "no region for virtual document");
        return VirtualDocument {
            path,
            language: default_language(target).to_string(),
            text: Arc::from(""),
            version: document.version,
            source_map: SourceMap::empty(),
            region: None,
        };
    };

    let (text, source_map, language) = match target {
        VirtualTarget::Template => {
            let specifier = document
                .path
                .file_name()
                .map_or_else(|| String::from("."), |name| format!("./{name}"));
            let script = template::transform(document.text, region.content_span, &specifier);
            (
                script.text,
                SourceMap::Nodes(MappedNodes::new(script.nodes)),
                "typescript".to_string(),
            )
        }
        VirtualTarget::Script | VirtualTarget::Style(_) => (
            blank_outside(document.text, region.content_span),
            SourceMap::Identity {
                range: region.content_span,
            },
            region.language.clone(),
        ),
    };

    VirtualDocument {
        path,
        language,
        text: Arc::from(text),
        version: document.version,
        source_map,
        region: Some(region.clone()),
    }
}

fn default_language(target: VirtualTarget) -> &'static str {
    match target {
        VirtualTarget::Script => "javascript",
        VirtualTarget::Template => "typescript",
        VirtualTarget::Style(_) => "css",
    }
}

/// Keep `keep` verbatim and replace every other character with spaces of the
/// same byte length. Line breaks survive so line numbers agree too.
#[must_use]
pub fn blank_outside(text: &str, keep: Span) -> String {
    let mut out = String::with_capacity(text.len());
    let start = keep.start_usize().min(text.len());
    let end = keep.end_usize().min(text.len());
    for (index, c) in text.char_indices() {
        if (index >= start && index < end) || matches!(c, '\n' | '\r') {
            out.push(c);
        } else {
            for _ in 0..c.len_utf8() {
                out.push(' ');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use vls_source::Offset;

    use super::*;
    use crate::regions::segment;

    const APP: &str = "<template>\n  <p>{{ msg }}</p>\n</template>\n\n<script>\nexport default { data() { return { msg: 'é' } } }\n</script>\n<style>p { color: red }</style>\n";

    fn document(text: &str) -> SourceDocument<'_> {
        SourceDocument {
            path: Utf8Path::new("/p/App.vue"),
            text,
            version: 3,
        }
    }

    #[test]
    fn test_script_view_preserves_offsets() {
        let regions = segment(APP);
        let view = synthesize(document(APP), &regions, VirtualTarget::Script);
        assert_eq!(view.path, Utf8PathBuf::from("/p/App.vue.ts"));
        assert_eq!(view.language, "javascript");
        assert_eq!(view.version, 3);
        assert_eq!(view.text.len(), APP.len());
        assert_eq!(view.text.lines().count(), APP.lines().count());

        let start = APP.find("export").unwrap();
        assert_eq!(&view.text[start..start + 14], "export default");
        assert!(view.text[..start].trim().is_empty());
        assert!(!view.text.contains("template"));
        assert!(!view.text.contains("color"));
    }

    #[test]
    fn test_everything_but_the_script_is_blank() {
        let text = "<template><p/></template>\n<script>a</script>";
        let view = synthesize(document(text), &segment(text), VirtualTarget::Script);
        assert_eq!(
            &*view.text,
            format!("{}\n{}a{}", " ".repeat(25), " ".repeat(8), " ".repeat(9))
        );
    }

    #[test]
    fn test_identity_round_trip_inside_region() {
        let regions = segment(APP);
        let view = synthesize(document(APP), &regions, VirtualTarget::Script);
        let content = regions.first_of(RegionKind::Script).unwrap().content_span;
        for offset in content.start()..=content.end() {
            let offset = Offset::new(offset);
            let back = view
                .source_map
                .to_virtual(offset)
                .and_then(|o| view.source_map.to_original(o));
            assert_eq!(back, Some(offset));
        }
        assert_eq!(view.source_map.to_original(Offset::new(0)), None);
    }

    #[test]
    fn test_style_view() {
        let regions = segment(APP);
        let view = synthesize(document(APP), &regions, VirtualTarget::Style(0));
        assert_eq!(view.path, Utf8PathBuf::from("/p/App.vue.0.css"));
        assert_eq!(view.text.trim(), "p { color: red }");
    }

    #[test]
    fn test_template_view() {
        let regions = segment(APP);
        let view = synthesize(document(APP), &regions, VirtualTarget::Template);
        assert_eq!(view.path, Utf8PathBuf::from("/p/App.vue.template.ts"));
        assert!(view.text.starts_with("import __vlsComponent from \"./App.vue\";\n"));
        let msg = view.text.find("msg").unwrap();
        assert_eq!(
            view.source_map.to_original(Offset::from_usize(msg)),
            Some(Offset::from_usize(APP.find("msg").unwrap()))
        );
    }

    #[test]
    fn test_missing_region_gives_empty_document() {
        let text = "<template><p/></template>";
        let regions = segment(text);
        let view = synthesize(document(text), &regions, VirtualTarget::Script);
        assert!(view.is_empty());
        assert!(view.region.is_none());
        assert!(view.source_map.is_empty());
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let regions = segment(APP);
        for target in [
            VirtualTarget::Script,
            VirtualTarget::Template,
            VirtualTarget::Style(0),
        ] {
            let first = synthesize(document(APP), &regions, target);
            let second = synthesize(document(APP), &segment(APP), target);
            assert_eq!(first.text, second.text);
        }
    }

    #[test]
    fn test_blank_outside_multibyte() {
        let text = "é<b>x</b>";
        let blanked = blank_outside(text, Span::new(5, 1));
        assert_eq!(blanked, "     x    ");
        assert_eq!(blanked.len(), text.len());
    }
}
