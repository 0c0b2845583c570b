//! Splitting a single-file component into per-language regions.
//!
//! Only top-level blocks are recognized. Anything between blocks belongs to
//! the composite document itself and has the `vue` language id.

use std::collections::BTreeMap;

use serde::Serialize;
use vls_source::Offset;
use vls_source::Span;

use crate::markup::find_close_tag;
use crate::markup::scan_open_tag;

/// Language id of text outside any region.
pub const COMPOSITE_LANGUAGE: &str = "vue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegionKind {
    Template,
    Script,
    Style,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub kind: RegionKind,
    pub language: String,
    /// The whole block, tags included.
    pub span: Span,
    /// Text between the opening and closing tags.
    pub content_span: Span,
    pub attributes: BTreeMap<String, Option<String>>,
}

impl Region {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)?.as_deref()
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Ordered, non-overlapping regions of one document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Regions(Vec<Region>);

impl Regions {
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The region whose content contains `offset`. Both content boundaries
    /// count as inside.
    #[must_use]
    pub fn region_at(&self, offset: Offset) -> Option<&Region> {
        let index = self
            .0
            .partition_point(|region| region.content_span.end() < offset.get());
        self.0
            .get(index)
            .filter(|region| region.content_span.contains(offset))
    }

    #[must_use]
    pub fn language_at(&self, offset: Offset) -> &str {
        self.region_at(offset)
            .map_or(COMPOSITE_LANGUAGE, |region| region.language.as_str())
    }

    #[must_use]
    pub fn first_of(&self, kind: RegionKind) -> Option<&Region> {
        self.0.iter().find(|region| region.kind == kind)
    }

    pub fn of_kind(&self, kind: RegionKind) -> impl Iterator<Item = &Region> {
        self.0.iter().filter(move |region| region.kind == kind)
    }
}

impl<'a> IntoIterator for &'a Regions {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn language_for(kind: RegionKind, name: &str, lang: Option<&str>) -> String {
    match (kind, lang) {
        (RegionKind::Template, None | Some("html")) => "vue-html".to_string(),
        (RegionKind::Script, None | Some("js" | "javascript")) => "javascript".to_string(),
        (RegionKind::Script, Some("ts" | "typescript")) => "typescript".to_string(),
        (RegionKind::Style, None) => "css".to_string(),
        (RegionKind::Custom, None) => name.to_string(),
        (_, Some(lang)) => lang.to_string(),
    }
}

/// Segment `text` into regions.
///
/// Never fails. Unterminated blocks run to the end of the text and unknown
/// markup outside blocks is ignored.
#[must_use]
pub fn segment(text: &str) -> Regions {
    let mut regions = Vec::new();
    let mut pos = 0;

    while let Some(index) = text[pos..].find('<') {
        let start = pos + index;
        let rest = &text[start..];

        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(close) => {
                    pos = start + close + 3;
                    continue;
                }
                None => break,
            }
        }
        if rest.starts_with("</") {
            pos = rest.find('>').map_or(text.len(), |close| start + close + 1);
            continue;
        }

        let Some(tag) = scan_open_tag(text, start, text.len()) else {
            pos = start + 1;
            continue;
        };
        let name = tag.name(text).to_ascii_lowercase();
        let kind = match name.as_str() {
            "template" => RegionKind::Template,
            "script" => RegionKind::Script,
            "style" => RegionKind::Style,
            _ => RegionKind::Custom,
        };

        let attributes: BTreeMap<String, Option<String>> = tag
            .attributes
            .iter()
            .filter_map(|attribute| {
                let key = attribute.name.slice(text)?.to_ascii_lowercase();
                let value = attribute
                    .value
                    .and_then(|value| value.slice(text))
                    .map(str::to_string);
                Some((key, value))
            })
            .collect();
        let language = language_for(
            kind,
            &name,
            attributes.get("lang").and_then(|lang| lang.as_deref()),
        );

        let content_start = tag.end;
        let (content_end, end) = if tag.self_closing || !tag.terminated {
            (content_start, tag.end)
        } else if kind == RegionKind::Template {
            close_nested_template(text, content_start)
        } else {
            find_close_tag(text, &name, content_start).unwrap_or((text.len(), text.len()))
        };

        regions.push(Region {
            kind,
            language,
            span: Span::from_bounds(start, end),
            content_span: Span::from_bounds(content_start, content_end),
            attributes,
        });
        pos = end;
        if pos >= text.len() {
            break;
        }
    }

    tracing::trace!(count = regions.len(), "segmented document");
    Regions(regions)
}

/// Locate the `</template>` matching an already opened one, counting nested
/// `<template>` elements.
fn close_nested_template(text: &str, from: usize) -> (usize, usize) {
    let mut depth = 1usize;
    let mut pos = from;

    while let Some(index) = text[pos..].find('<') {
        let start = pos + index;
        let rest = &text[start..];
        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(text.len(), |close| start + close + 3);
            continue;
        }
        if let Some((close_start, close_end)) = rest
            .starts_with("</")
            .then(|| find_close_tag(text, "template", start))
            .flatten()
            .filter(|(close, _)| *close == start)
        {
            depth -= 1;
            if depth == 0 {
                return (close_start, close_end);
            }
            pos = close_end;
            continue;
        }
        if let Some(tag) = scan_open_tag(text, start, text.len()) {
            if tag.name(text).eq_ignore_ascii_case("template") && !tag.self_closing {
                depth += 1;
            }
            pos = tag.end.max(start + 1);
            continue;
        }
        pos = start + 1;
    }
    (text.len(), text.len())
}
