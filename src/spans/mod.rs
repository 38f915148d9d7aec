//! Span model
//!
//! Annotations attached to text ranges:
//!
//! - `Highlight`: user-created, persisted, owned by one document
//! - `LinkSpan`: derived from text by pattern rules, ephemeral
//! - `IndentSpan`: derived per paragraph, ephemeral

mod color;
mod rules;

pub use color::{Color, InvalidColor};
pub use rules::{paragraph_ranges, IndentRule, LinkRule, SpanRules};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::range::TextRange;

/// A colored highlight over a document range
///
/// Equality is by `id`; use [`Highlight::same_span`] for structural comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub id: Uuid,
    pub range: TextRange,
    pub color: Color,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Highlight {
    /// Create a new highlight with a fresh id
    pub fn new(range: TextRange, color: Color) -> Self {
        Self {
            id: Uuid::new_v4(),
            range,
            color,
            created_at: Utc::now(),
        }
    }

    /// Whether both highlights cover the same range with the same color
    pub fn same_span(&self, other: &Highlight) -> bool {
        self.range == other.range && self.color.to_hex() == other.color.to_hex()
    }
}

impl PartialEq for Highlight {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Highlight {}

/// A link region detected in the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpan {
    /// Ordinal within one detection pass
    pub id: usize,
    pub range: TextRange,
    pub destination: String,
}

/// Paragraph indentation metrics for a range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndentSpan {
    /// Ordinal within one detection pass
    pub id: usize,
    pub range: TextRange,
    #[serde(rename = "headIndent")]
    pub head_indent: f32,
    #[serde(rename = "tailIndent")]
    pub tail_indent: f32,
    #[serde(rename = "firstLineIndent")]
    pub first_line_indent: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_id() {
        let a = Highlight::new(TextRange::new(0, 4), Color::PALETTE[0].1);
        let mut b = a.clone();
        b.range = TextRange::new(10, 2);
        assert_eq!(a, b);

        let c = Highlight::new(TextRange::new(0, 4), Color::PALETTE[0].1);
        assert_ne!(a, c);
        assert!(a.same_span(&c));
    }

    #[test]
    fn test_highlight_serialization() {
        let h = Highlight::new(TextRange::new(3, 7), Color::rgb(0xFE, 0xF3, 0xB5));
        let json = serde_json::to_string(&h).unwrap();
        assert!(json.contains("\"color\":\"#FEF3B5\""));
        assert!(json.contains("\"start\":3"));
        assert!(json.contains("createdAt"));

        let parsed: Highlight = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, h.id);
        assert!(parsed.same_span(&h));
    }
}
