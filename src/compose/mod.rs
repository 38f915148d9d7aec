//! Highlight and span composer
//!
//! Layers a document's base text, derived indent and link spans, and user
//! highlights into one [`StyledText`]:
//!
//! 1. Uniform base style (font, text color, paragraph layout), then inline
//!    emphasis of pre-styled content
//! 2. Indentation per paragraph
//! 3. Links (destination, underline, link color)
//! 4. Highlights, clamped and whitespace-trimmed (background tint + id tag)
//!
//! Composition is pure: identical inputs always produce an identical
//! `StyledText`, so callers can diff outputs to decide whether to redraw.
//! Out-of-range spans are skipped, never reported.

mod html;
mod styled;

pub use html::HtmlConfig;
pub use styled::{Alignment, AttributeRun, Attributes, Font, ParagraphStyle, StyledText};

use serde::{Deserialize, Serialize};

use crate::document::{Content, Emphasis};
use crate::range::Utf16Text;
use crate::spans::{Color, Highlight, IndentSpan, LinkSpan};

/// Alpha applied over a highlight's stored color when rendering
pub const DEFAULT_HIGHLIGHT_ALPHA: f32 = 0.25;

/// Rendering configuration consumed by [`compose`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: Color,
    pub background_color: Color,
    pub link_color: Color,
    pub line_height_multiple: f32,
    pub paragraph_spacing: f32,
    pub alignment: Alignment,
    pub highlight_alpha: f32,
    pub enable_links: bool,
    pub enable_indentation: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_family: "System".to_string(),
            font_size: 17.0,
            text_color: Color::BLACK,
            background_color: Color::WHITE,
            link_color: Color::LINK,
            line_height_multiple: 1.2,
            paragraph_spacing: 4.0,
            alignment: Alignment::Left,
            highlight_alpha: DEFAULT_HIGHLIGHT_ALPHA,
            enable_links: true,
            enable_indentation: true,
        }
    }
}

impl StyleConfig {
    /// Attributes applied uniformly before any span
    pub fn base_attributes(&self) -> Attributes {
        Attributes {
            font: Font {
                family: self.font_family.clone(),
                size: self.font_size,
                bold: false,
                italic: false,
                monospace: false,
            },
            foreground: self.text_color,
            background: None,
            paragraph: ParagraphStyle {
                line_height_multiple: self.line_height_multiple,
                paragraph_spacing: self.paragraph_spacing,
                alignment: self.alignment,
                head_indent: 0.0,
                tail_indent: 0.0,
                first_line_head_indent: 0.0,
            },
            link: None,
            underline: false,
            strikethrough: false,
            highlight_id: None,
        }
    }
}

/// Compose base content and spans into one styled text
pub fn compose(
    base: &Content,
    links: &[LinkSpan],
    indents: &[IndentSpan],
    highlights: &[Highlight],
    style: &StyleConfig,
) -> StyledText {
    let mut out = StyledText::new(base.text(), style.base_attributes());

    for span in base.inline_spans() {
        out.apply(span.range, |a| match &span.emphasis {
            Emphasis::Bold => a.font.bold = true,
            Emphasis::Italic => a.font.italic = true,
            Emphasis::Underline => a.underline = true,
            Emphasis::Strikethrough => a.strikethrough = true,
            Emphasis::Code => a.font.monospace = true,
            Emphasis::Link { href } => a.link = Some(href.clone()),
        });
    }

    if style.enable_indentation {
        for indent in indents {
            out.apply(indent.range, |a| {
                a.paragraph.head_indent = indent.head_indent;
                a.paragraph.tail_indent = indent.tail_indent;
                a.paragraph.first_line_head_indent = indent.first_line_indent;
            });
        }
    }

    if style.enable_links {
        for link in links {
            out.apply(link.range, |a| {
                a.link = Some(link.destination.clone());
                a.underline = true;
                a.foreground = style.link_color;
            });
        }
    }

    if !highlights.is_empty() {
        let units = Utf16Text::new(base.text());
        for highlight in highlights {
            let Some(range) = highlight.range.trim_whitespace_and_newlines(&units) else {
                tracing::trace!(highlight = %highlight.id, "skipping empty or stale highlight");
                continue;
            };
            let tint = highlight.color.with_alpha(style.highlight_alpha);
            out.apply(range, |a| {
                a.background = Some(tint);
                a.highlight_id = Some(highlight.id);
            });
        }
    }

    out.coalesce();
    out
}
