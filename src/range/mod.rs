//! Text range model
//!
//! All offsets in Folio are UTF-16 code units into a document's plain text,
//! which is what the platform text views report for selections and taps.
//!
//! - `TextRange` is a half-open `start..start + length` interval
//! - `Utf16Text` is the UTF-16 projection of a string, used for trimming
//!   and snippet extraction
//! - `Utf16Cursor` maps increasing UTF-8 byte offsets (e.g. regex matches)
//!   to UTF-16 offsets in a single pass

mod utf16;

pub use utf16::{Utf16Cursor, Utf16Text};

use serde::{Deserialize, Serialize};

/// A contiguous span of UTF-16 code units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub length: usize,
}

impl TextRange {
    pub const fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Build a range from signed values as stored in SQLite or sent by clients.
    ///
    /// Returns `None` when either value is negative.
    pub fn from_raw(start: i64, length: i64) -> Option<Self> {
        let start = usize::try_from(start).ok()?;
        let length = usize::try_from(length).ok()?;
        Some(Self { start, length })
    }

    /// Build a range from a `start..end` pair, `None` if `end < start`
    pub fn from_bounds(start: usize, end: usize) -> Option<Self> {
        end.checked_sub(start).map(|length| Self { start, length })
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether `offset` falls inside the range
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }

    /// True iff both ranges share at least one code unit.
    ///
    /// Empty ranges never intersect anything.
    pub fn intersects(&self, other: &TextRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end()
            && other.start < self.end()
    }

    /// The shared part of two ranges, if any
    pub fn intersection(&self, other: &TextRange) -> Option<TextRange> {
        if !self.intersects(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        TextRange::from_bounds(start, end)
    }

    /// Fit the range into a text of `to_length` code units.
    ///
    /// Returns `None` if the range starts past the end of the text, otherwise
    /// the range with its length truncated so that `end() <= to_length`.
    pub fn clamp(self, to_length: usize) -> Option<TextRange> {
        if self.start > to_length {
            return None;
        }
        let length = self.length.min(to_length - self.start);
        Some(TextRange::new(self.start, length))
    }

    /// Shrink the range inward while its boundary units are whitespace or newlines.
    ///
    /// The range is clamped to `text` first. Returns `None` if nothing but
    /// whitespace remains.
    pub fn trim_whitespace_and_newlines(self, text: &Utf16Text) -> Option<TextRange> {
        let clamped = self.clamp(text.len())?;
        let mut start = clamped.start;
        let mut end = clamped.end();

        while start < end && text.is_whitespace_at(start) {
            start += 1;
        }
        while end > start && text.is_whitespace_at(end - 1) {
            end -= 1;
        }

        if start == end {
            None
        } else {
            TextRange::from_bounds(start, end)
        }
    }
}

impl From<TextRange> for std::ops::Range<usize> {
    fn from(range: TextRange) -> Self {
        range.start..range.end()
    }
}
