//! UTF-16 projection of document text

use super::TextRange;

/// A string viewed as UTF-16 code units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utf16Text {
    units: Vec<u16>,
}

impl Utf16Text {
    pub fn new(text: &str) -> Self {
        Self {
            units: text.encode_utf16().collect(),
        }
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Whether the code unit at `offset` is whitespace or a newline.
    ///
    /// Surrogate halves are never whitespace.
    pub fn is_whitespace_at(&self, offset: usize) -> bool {
        self.units
            .get(offset)
            .and_then(|unit| char::from_u32(u32::from(*unit)))
            .is_some_and(char::is_whitespace)
    }

    /// Extract the text covered by `range`, clamped to this text.
    ///
    /// Split surrogate pairs at the edges are replaced with U+FFFD.
    pub fn slice(&self, range: TextRange) -> Option<String> {
        let range = range.clamp(self.len())?;
        Some(String::from_utf16_lossy(&self.units[range.start..range.end()]))
    }
}

/// Maps UTF-8 byte offsets of a `&str` to UTF-16 offsets.
///
/// Optimized for monotonically increasing queries, which is what regex match
/// iteration produces. A query behind the cursor restarts from the beginning.
#[derive(Debug)]
pub struct Utf16Cursor<'a> {
    text: &'a str,
    byte: usize,
    unit: usize,
}

impl<'a> Utf16Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            unit: 0,
        }
    }

    /// UTF-16 offset of the char boundary at `byte_offset`.
    ///
    /// Offsets past the end map to the total UTF-16 length.
    pub fn offset_of(&mut self, byte_offset: usize) -> usize {
        let target = byte_offset.min(self.text.len());
        if target < self.byte {
            self.byte = 0;
            self.unit = 0;
        }
        let skipped = self
            .text
            .get(self.byte..target)
            .map(|s| s.encode_utf16().count())
            .unwrap_or(0);
        self.byte = target;
        self.unit += skipped;
        self.unit
    }

    /// Convert a byte range to a UTF-16 `TextRange`
    pub fn range_of(&mut self, bytes: std::ops::Range<usize>) -> TextRange {
        let start = self.offset_of(bytes.start);
        let end = self.offset_of(bytes.end);
        TextRange::new(start, end.saturating_sub(start))
    }
}
