//! Tag-level scanning shared by the segmenter and the template transform.

use vls_source::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attribute {
    pub name: Span,
    /// Value without its quotes.
    pub value: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag {
    pub name: Span,
    pub attributes: Vec<Attribute>,
    /// Offset just past the closing `>`, or the end of the scanned text when
    /// the tag never closes.
    pub end: usize,
    pub self_closing: bool,
    pub terminated: bool,
}

impl Tag {
    pub fn name<'a>(&self, text: &'a str) -> &'a str {
        self.name.slice(text).unwrap_or_default()
    }

    pub fn attribute(&self, text: &str, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name.slice(text) == Some(name))
    }
}

pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b':' | b'.')
}

/// Scan the opening tag starting at the `<` at `start`, stopping at `limit`.
///
/// Returns `None` when `<` does not start an element name.
pub(crate) fn scan_open_tag(text: &str, start: usize, limit: usize) -> Option<Tag> {
    let bytes = text.as_bytes();
    let limit = limit.min(bytes.len());
    let name_start = start + 1;
    if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    let mut pos = name_start;
    while pos < limit && is_name_char(bytes[pos]) {
        pos += 1;
    }
    let name = Span::from_bounds(name_start, pos);
    let mut attributes = Vec::new();

    loop {
        while pos < limit && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= limit {
            return Some(Tag {
                name,
                attributes,
                end: limit,
                self_closing: false,
                terminated: false,
            });
        }
        match bytes[pos] {
            b'>' => {
                return Some(Tag {
                    name,
                    attributes,
                    end: pos + 1,
                    self_closing: false,
                    terminated: true,
                });
            }
            b'/' if bytes.get(pos + 1) == Some(&b'>') && pos + 1 < limit => {
                return Some(Tag {
                    name,
                    attributes,
                    end: pos + 2,
                    self_closing: true,
                    terminated: true,
                });
            }
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let attribute_start = pos;
        while pos < limit
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>')
            && !(bytes[pos] == b'/' && bytes.get(pos + 1) == Some(&b'>'))
        {
            pos += 1;
        }
        let attribute_name = Span::from_bounds(attribute_start, pos);

        let mut lookahead = pos;
        while lookahead < limit && bytes[lookahead].is_ascii_whitespace() {
            lookahead += 1;
        }
        if lookahead < limit && bytes[lookahead] == b'=' {
            pos = lookahead + 1;
            while pos < limit && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let value = match bytes.get(pos).copied().filter(|_| pos < limit) {
                Some(quote @ (b'"' | b'\'')) => {
                    let value_start = pos + 1;
                    let value_end = text[value_start..limit]
                        .find(quote as char)
                        .map_or(limit, |index| value_start + index);
                    pos = (value_end + 1).min(limit);
                    Span::from_bounds(value_start, value_end)
                }
                _ => {
                    let value_start = pos;
                    while pos < limit && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>'
                    {
                        pos += 1;
                    }
                    Span::from_bounds(value_start, pos)
                }
            };
            attributes.push(Attribute {
                name: attribute_name,
                value: Some(value),
            });
        } else {
            attributes.push(Attribute {
                name: attribute_name,
                value: None,
            });
        }
    }
}

/// Find `</name` (ASCII case-insensitive) at or after `from`. Returns the
/// offset of `<` and the offset past the closing `>`.
pub(crate) fn find_close_tag(text: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(index) = text.get(pos..)?.find("</") {
        let start = pos + index;
        let name_start = start + 2;
        let name_end = name_start + name.len();
        let matches = text
            .get(name_start..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
            && !bytes.get(name_end).copied().is_some_and(is_name_char);
        if matches {
            let end = text[name_end..]
                .find('>')
                .map_or(text.len(), |close| name_end + close + 1);
            return Some((start, end));
        }
        pos = name_start;
    }
    None
}
