//! Open text documents as sent by the client.
//!
//! [`TextDocument`] is an immutable snapshot: the client always sends full
//! text, so an update replaces the whole document.

use std::sync::Arc;

use vls_source::LineCol;
use vls_source::LineIndex;
use vls_source::Offset;
use vls_source::PositionEncoding;

use crate::language::LanguageId;

#[derive(Clone, Debug)]
pub struct TextDocument {
    content: Arc<str>,
    /// The version number of this document (from the client)
    version: i32,
    language_id: LanguageId,
    line_index: Arc<LineIndex>,
}

impl TextDocument {
    #[must_use]
    pub fn new(content: impl Into<Arc<str>>, version: i32, language_id: LanguageId) -> Self {
        let content = content.into();
        let line_index = Arc::new(LineIndex::from_text(&content));
        Self {
            content,
            version,
            language_id,
            line_index,
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn text(&self) -> Arc<str> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn language_id(&self) -> &LanguageId {
        &self.language_id
    }

    #[must_use]
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    #[must_use]
    pub fn position_to_offset(&self, position: LineCol, encoding: PositionEncoding) -> Option<Offset> {
        self.line_index.offset(position, &self.content, encoding)
    }

    #[must_use]
    pub fn offset_to_position(&self, offset: Offset, encoding: PositionEncoding) -> LineCol {
        self.line_index.line_col(offset, &self.content, encoding)
    }
}
