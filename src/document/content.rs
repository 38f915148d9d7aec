//! Document content: plain text or pre-styled text

use serde::{Deserialize, Serialize};

use crate::range::{TextRange, Utf16Text};

/// Inline emphasis carried by pre-styled content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Emphasis {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Link { href: String },
}

/// An emphasis applied to a range of styled content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSpan {
    pub range: TextRange,
    #[serde(flatten)]
    pub emphasis: Emphasis,
}

/// The body of a document
///
/// Range-based operations (snippets, clamping) always work on the plain-text
/// projection returned by [`Content::text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Plain { text: String },
    Styled { text: String, spans: Vec<InlineSpan> },
}

impl Content {
    pub fn plain(text: impl Into<String>) -> Self {
        Content::Plain { text: text.into() }
    }

    pub fn styled(text: impl Into<String>, spans: Vec<InlineSpan>) -> Self {
        Content::Styled {
            text: text.into(),
            spans,
        }
    }

    /// Plain-text projection
    pub fn text(&self) -> &str {
        match self {
            Content::Plain { text } | Content::Styled { text, .. } => text,
        }
    }

    /// Inline spans (empty for plain content)
    pub fn inline_spans(&self) -> &[InlineSpan] {
        match self {
            Content::Plain { .. } => &[],
            Content::Styled { spans, .. } => spans,
        }
    }

    /// Stored discriminator: `plain` or `styled`
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Plain { .. } => "plain",
            Content::Styled { .. } => "styled",
        }
    }

    /// Length of the text in UTF-16 code units
    pub fn utf16_len(&self) -> usize {
        self.text().encode_utf16().count()
    }

    /// Text covered by `range`, clamped to the content.
    ///
    /// `None` when the range starts past the end or clamps to nothing.
    pub fn snippet(&self, range: TextRange) -> Option<String> {
        let units = Utf16Text::new(self.text());
        let clamped = range.clamp(units.len()).filter(|r| !r.is_empty())?;
        units.slice(clamped)
    }
}
