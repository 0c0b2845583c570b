//! Offset translation between a virtual document and its composite source.
//!
//! Lookups never fail loudly: an offset that no node covers has no mapping,
//! and callers drop whatever carried it.

use serde::Serialize;
use vls_source::Offset;
use vls_source::Span;

/// One rewritten token: where it sits in the virtual text and where it came
/// from in the composite text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MappingNode {
    pub virtual_span: Span,
    pub original_span: Span,
}

impl MappingNode {
    fn original_at(&self, offset: Offset) -> Offset {
        Offset::new(translate(self.virtual_span, self.original_span, offset))
    }

    fn virtual_at(&self, offset: Offset) -> Offset {
        Offset::new(translate(self.original_span, self.virtual_span, offset))
    }
}

/// Move `offset` from `from` into `to`, clamping when the two spans differ
/// in length.
fn translate(from: Span, to: Span, offset: Offset) -> u32 {
    let delta = offset.get().saturating_sub(from.start());
    to.start() + delta.min(to.length())
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MappedNodes {
    /// Sorted by virtual start.
    nodes: Vec<MappingNode>,
    /// Indices into `nodes`, sorted by original start.
    by_original: Vec<usize>,
}

impl MappedNodes {
    #[must_use]
    pub fn new(mut nodes: Vec<MappingNode>) -> Self {
        nodes.sort_by_key(|node| node.virtual_span.start());
        debug_assert!(
            nodes
                .windows(2)
                .all(|pair| pair[0].virtual_span.end() <= pair[1].virtual_span.start()),
            "mapping nodes overlap in the virtual text"
        );
        let mut by_original: Vec<usize> = (0..nodes.len()).collect();
        by_original.sort_by_key(|&index| nodes[index].original_span.start());
        Self { nodes, by_original }
    }

    #[must_use]
    pub fn nodes(&self) -> &[MappingNode] {
        &self.nodes
    }

    fn covering_virtual(&self, offset: Offset) -> Option<&MappingNode> {
        let index = self
            .nodes
            .partition_point(|node| node.virtual_span.end() < offset.get());
        self.nodes
            .get(index)
            .filter(|node| node.virtual_span.contains(offset))
    }

    fn covering_original(&self, offset: Offset) -> Option<&MappingNode> {
        let index = self
            .by_original
            .partition_point(|&node| self.nodes[node].original_span.end() < offset.get());
        self.by_original
            .get(index)
            .map(|&node| &self.nodes[node])
            .filter(|node| node.original_span.contains(offset))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceMap {
    /// Offsets are shared by both documents inside `range` and unmapped
    /// outside it.
    Identity { range: Span },
    Nodes(MappedNodes),
}

impl Default for SourceMap {
    fn default() -> Self {
        SourceMap::Nodes(MappedNodes::default())
    }
}

impl SourceMap {
    /// A map under which nothing translates.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn to_original(&self, offset: Offset) -> Option<Offset> {
        match self {
            SourceMap::Identity { range } => range.contains(offset).then_some(offset),
            SourceMap::Nodes(nodes) => nodes
                .covering_virtual(offset)
                .map(|node| node.original_at(offset)),
        }
    }

    #[must_use]
    pub fn to_virtual(&self, offset: Offset) -> Option<Offset> {
        match self {
            SourceMap::Identity { range } => range.contains(offset).then_some(offset),
            SourceMap::Nodes(nodes) => nodes
                .covering_original(offset)
                .map(|node| node.virtual_at(offset)),
        }
    }

    /// Map a virtual span back. The start must map; an end that falls outside
    /// every node is clamped to the end of the node holding the start.
    #[must_use]
    pub fn span_to_original(&self, span: Span) -> Option<Span> {
        match self {
            SourceMap::Identity { range } => {
                if !range.contains(span.start_offset()) {
                    return None;
                }
                let end = span.end().min(range.end());
                Some(Span::new(span.start(), end - span.start()))
            }
            SourceMap::Nodes(nodes) => {
                let first = nodes.covering_virtual(span.start_offset())?;
                let start = first.original_at(span.start_offset());
                let end = nodes
                    .covering_virtual(span.end_offset())
                    .map_or(first.original_span.end_offset(), |last| {
                        last.original_at(span.end_offset())
                    });
                Some(Span::new(
                    start.get(),
                    end.get().saturating_sub(start.get()),
                ))
            }
        }
    }

    #[must_use]
    pub fn span_to_virtual(&self, span: Span) -> Option<Span> {
        match self {
            SourceMap::Identity { range } => {
                if !range.contains(span.start_offset()) {
                    return None;
                }
                let end = span.end().min(range.end());
                Some(Span::new(span.start(), end - span.start()))
            }
            SourceMap::Nodes(nodes) => {
                let first = nodes.covering_original(span.start_offset())?;
                let start = first.virtual_at(span.start_offset());
                let end = nodes
                    .covering_original(span.end_offset())
                    .map_or(first.virtual_span.end_offset(), |last| {
                        last.virtual_at(span.end_offset())
                    });
                Some(Span::new(
                    start.get(),
                    end.get().saturating_sub(start.get()),
                ))
            }
        }
    }

    /// True when no offset of the virtual document translates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            SourceMap::Identity { .. } => false,
            SourceMap::Nodes(nodes) => nodes.nodes.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(virtual_start: u32, original_start: u32, length: u32) -> MappingNode {
        MappingNode {
            virtual_span: Span::new(virtual_start, length),
            original_span: Span::new(original_start, length),
        }
    }

    #[test]
    fn test_identity_round_trip() {
        let map = SourceMap::Identity {
            range: Span::new(10, 20),
        };
        for offset in 10..=30 {
            let offset = Offset::new(offset);
            assert_eq!(
                map.to_virtual(offset).and_then(|o| map.to_original(o)),
                Some(offset)
            );
        }
        assert_eq!(map.to_original(Offset::new(9)), None);
        assert_eq!(map.to_original(Offset::new(31)), None);
    }

    #[test]
    fn test_identity_span_clamped() {
        let map = SourceMap::Identity {
            range: Span::new(10, 5),
        };
        assert_eq!(map.span_to_original(Span::new(12, 10)), Some(Span::new(12, 3)));
        assert_eq!(map.span_to_original(Span::new(2, 10)), None);
    }

    #[test]
    fn test_nodes_lookup() {
        let map = SourceMap::Nodes(MappedNodes::new(vec![
            node(100, 5, 3),
            node(120, 20, 1),
            node(140, 30, 4),
        ]));
        assert_eq!(map.to_original(Offset::new(101)), Some(Offset::new(6)));
        assert_eq!(map.to_original(Offset::new(103)), Some(Offset::new(8)));
        assert_eq!(map.to_original(Offset::new(110)), None);
        assert_eq!(map.to_original(Offset::new(0)), None);
        assert_eq!(map.to_original(Offset::new(999)), None);
        assert_eq!(map.to_virtual(Offset::new(31)), Some(Offset::new(141)));
        assert_eq!(map.to_virtual(Offset::new(25)), None);
    }

    #[test]
    fn test_nodes_out_of_original_order() {
        let map = SourceMap::Nodes(MappedNodes::new(vec![node(0, 50, 2), node(10, 5, 2)]));
        assert_eq!(map.to_virtual(Offset::new(6)), Some(Offset::new(11)));
        assert_eq!(map.to_virtual(Offset::new(51)), Some(Offset::new(1)));
    }

    #[test]
    fn test_zero_length_original() {
        let map = SourceMap::Nodes(MappedNodes::new(vec![MappingNode {
            virtual_span: Span::new(40, 1),
            original_span: Span::new(7, 0),
        }]));
        assert_eq!(map.to_original(Offset::new(40)), Some(Offset::new(7)));
        assert_eq!(map.to_original(Offset::new(41)), Some(Offset::new(7)));
        assert_eq!(map.span_to_original(Span::new(40, 1)), Some(Span::new(7, 0)));
    }

    #[test]
    fn test_span_end_clamped_to_node() {
        let map = SourceMap::Nodes(MappedNodes::new(vec![node(10, 0, 3)]));
        assert_eq!(map.span_to_original(Span::new(11, 20)), Some(Span::new(1, 2)));
        assert_eq!(map.span_to_original(Span::new(20, 2)), None);
    }

    #[test]
    fn test_empty_map() {
        let map = SourceMap::empty();
        assert!(map.is_empty());
        assert_eq!(map.to_original(Offset::new(0)), None);
        assert_eq!(map.to_virtual(Offset::new(0)), None);
    }
}
