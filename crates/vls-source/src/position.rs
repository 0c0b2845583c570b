use serde::Serialize;

/// A byte offset within a text document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Offset(u32);

impl Offset {
    #[must_use]
    pub fn new(offset: u32) -> Self {
        Self(offset)
    }

    #[must_use]
    pub fn from_usize(offset: usize) -> Self {
        Self(u32::try_from(offset).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Offset {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A half-open byte range `[start, start + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Span {
    start: u32,
    length: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    #[must_use]
    pub fn from_parts(start: usize, length: usize) -> Self {
        let start_u32 = u32::try_from(start).unwrap_or(u32::MAX);
        let length_u32 = u32::try_from(length).unwrap_or(u32::MAX.saturating_sub(start_u32));
        Span::new(start_u32, length_u32)
    }

    /// Construct a span from integer bounds expressed as byte offsets.
    #[must_use]
    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self::from_parts(start, end.saturating_sub(start))
    }

    #[must_use]
    pub fn start(self) -> u32 {
        self.start
    }

    #[must_use]
    pub fn start_usize(self) -> usize {
        self.start as usize
    }

    #[must_use]
    pub fn end(self) -> u32 {
        self.start.saturating_add(self.length)
    }

    #[must_use]
    pub fn end_usize(self) -> usize {
        self.end() as usize
    }

    #[must_use]
    pub fn length(self) -> u32 {
        self.length
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.length == 0
    }

    #[must_use]
    pub fn start_offset(self) -> Offset {
        Offset(self.start)
    }

    #[must_use]
    pub fn end_offset(self) -> Offset {
        Offset(self.end())
    }

    /// Whether `offset` lies inside the span. The end bound counts as inside so
    /// that a cursor placed right after a token still belongs to it.
    #[must_use]
    pub fn contains(self, offset: Offset) -> bool {
        self.start <= offset.0 && offset.0 <= self.end()
    }

    #[must_use]
    pub fn contains_span(self, other: Span) -> bool {
        self.start <= other.start && other.end() <= self.end()
    }

    #[must_use]
    pub fn intersects(self, other: Span) -> bool {
        self.start <= other.end() && other.start <= self.end()
    }

    /// Slice `text` with this span, returning `None` when out of bounds or not
    /// on a character boundary.
    #[must_use]
    pub fn slice(self, text: &str) -> Option<&str> {
        text.get(self.start_usize()..self.end_usize())
    }
}

/// A zero-based line and column position. The column unit depends on the
/// [`PositionEncoding`] it was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    line: u32,
    column: u32,
}

impl LineCol {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }
}

/// Unit in which clients count columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PositionEncoding {
    Utf8,
    #[default]
    Utf16,
    Utf32,
}

impl PositionEncoding {
    fn width(self, c: char) -> u32 {
        match self {
            PositionEncoding::Utf8 => u32::try_from(c.len_utf8()).unwrap_or(0),
            PositionEncoding::Utf16 => u32::try_from(c.len_utf16()).unwrap_or(0),
            PositionEncoding::Utf32 => 1,
        }
    }
}

/// Pre-computed line start positions for offset/position conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    length: u32,
}

impl LineIndex {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => line_starts.push(u32::try_from(i + 1).unwrap_or(u32::MAX)),
                b'\r' if bytes.get(i + 1) != Some(&b'\n') => {
                    line_starts.push(u32::try_from(i + 1).unwrap_or(u32::MAX));
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            line_starts,
            length: u32::try_from(text.len()).unwrap_or(u32::MAX),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    #[must_use]
    pub fn line_start(&self, line: u32) -> Option<Offset> {
        self.line_starts.get(line as usize).copied().map(Offset)
    }

    /// Convert a byte offset into a line/column pair. Offsets past the end of
    /// the text are clamped to the end.
    #[must_use]
    pub fn line_col(&self, offset: Offset, text: &str, encoding: PositionEncoding) -> LineCol {
        let offset = offset.0.min(self.length);
        let line = self
            .line_starts
            .partition_point(|start| *start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line];

        let mut end = offset as usize;
        while end > line_start as usize && !text.is_char_boundary(end) {
            end -= 1;
        }

        let column = match encoding {
            PositionEncoding::Utf8 => offset - line_start,
            _ => text
                .get(line_start as usize..end)
                .map_or(0, |prefix| prefix.chars().map(|c| encoding.width(c)).sum()),
        };

        LineCol::new(u32::try_from(line).unwrap_or(u32::MAX), column)
    }

    /// Convert a line/column pair into a byte offset. A column past the end of
    /// its line is clamped to the line end; a line past the end of the text
    /// yields `None`.
    #[must_use]
    pub fn offset(&self, line_col: LineCol, text: &str, encoding: PositionEncoding) -> Option<Offset> {
        let line_start = *self.line_starts.get(line_col.line as usize)?;
        let next_start = self
            .line_starts
            .get(line_col.line as usize + 1)
            .copied()
            .unwrap_or(self.length);
        let line_text = text.get(line_start as usize..next_start as usize)?;

        let mut units = 0;
        let mut bytes = 0;
        for c in line_text.chars() {
            if units >= line_col.column || c == '\n' || c == '\r' {
                break;
            }
            units += encoding.width(c);
            bytes += u32::try_from(c.len_utf8()).unwrap_or(0);
        }

        Some(Offset(line_start + bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_round_trip_ascii() {
        let text = "<template>\n  <div/>\n</template>\n";
        let index = LineIndex::from_text(text);
        let offset = Offset::new(13);
        let lc = index.line_col(offset, text, PositionEncoding::Utf16);
        assert_eq!(lc, LineCol::new(1, 2));
        assert_eq!(index.offset(lc, text, PositionEncoding::Utf16), Some(offset));
    }

    #[test]
    fn utf16_columns_count_surrogate_pairs() {
        let text = "const s = '😀'; x";
        let index = LineIndex::from_text(text);
        let x = Offset::from_usize(text.find('x').unwrap());
        let lc = index.line_col(x, text, PositionEncoding::Utf16);
        assert_eq!(lc.column(), 16);
        assert_eq!(index.offset(lc, text, PositionEncoding::Utf16), Some(x));

        let lc8 = index.line_col(x, text, PositionEncoding::Utf8);
        assert_eq!(lc8.column(), x.get());
    }

    #[test]
    fn column_past_line_end_is_clamped() {
        let text = "ab\ncd";
        let index = LineIndex::from_text(text);
        assert_eq!(
            index.offset(LineCol::new(0, 99), text, PositionEncoding::Utf16),
            Some(Offset::new(2))
        );
        assert_eq!(
            index.offset(LineCol::new(5, 0), text, PositionEncoding::Utf16),
            None
        );
    }

    #[test]
    fn crlf_counts_as_one_line_break() {
        let text = "a\r\nb\rc";
        let index = LineIndex::from_text(text);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_start(1), Some(Offset::new(3)));
        assert_eq!(index.line_start(2), Some(Offset::new(5)));
    }

    #[test]
    fn span_contains_end_bound() {
        let span = Span::new(4, 3);
        assert!(span.contains(Offset::new(4)));
        assert!(span.contains(Offset::new(7)));
        assert!(!span.contains(Offset::new(8)));
        assert!(span.contains_span(Span::new(5, 2)));
        assert!(!span.contains_span(Span::new(5, 9)));
    }
}
