//! Export transforms over a composition's sorted fragments

use serde::{Deserialize, Serialize};

use super::types::Composition;
use crate::compose::{HtmlConfig, StyleConfig, StyledText};
use crate::range::TextRange;
use crate::spans::Color;

/// Separator between snippets in plain-text exports
pub const PLAIN_TEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Background alpha of exported snippets
const EXPORT_ALPHA: f32 = 0.3;
const EXPORT_PARAGRAPH_SPACING: f32 = 12.0;
const CITATION_FONT_SIZE: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[serde(alias = "text", alias = "txt")]
    Plain,
    #[serde(alias = "md")]
    Markdown,
    /// Styled text, serialized as HTML
    #[serde(alias = "html")]
    Styled,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Plain => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Styled => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Plain => "text/plain; charset=utf-8",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Styled => "text/html; charset=utf-8",
        }
    }
}

/// Snippets joined by [`PLAIN_TEXT_SEPARATOR`]
pub fn to_plain_text(composition: &Composition) -> String {
    composition
        .sorted_fragments()
        .iter()
        .map(|f| f.text_snippet.as_str())
        .collect::<Vec<_>>()
        .join(PLAIN_TEXT_SEPARATOR)
}

/// Title heading, then one blockquote per snippet with an italic citation
pub fn to_markdown(composition: &Composition) -> String {
    let mut out = format!("# {}\n\n", composition.title);

    for fragment in composition.sorted_fragments() {
        for line in fragment.text_snippet.lines() {
            if line.is_empty() {
                out.push_str(">\n");
            } else {
                out.push_str("> ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str(">\n");
        out.push_str(&format!("> — *{}*\n\n", fragment.document_title));
    }

    out
}

/// Snippets tinted with their highlight color, each followed by an
/// un-tinted citation line
pub fn to_styled_text(composition: &Composition, style: &StyleConfig) -> StyledText {
    let base = style.base_attributes();
    let fragments = composition.sorted_fragments();
    let mut out = StyledText::empty();

    for (index, fragment) in fragments.iter().enumerate() {
        let mut snippet = StyledText::new(fragment.text_snippet.as_str(), base.clone());
        let tint = fragment.color.with_alpha(EXPORT_ALPHA);
        snippet.apply(TextRange::new(0, snippet.len()), |a| {
            a.background = Some(tint);
            a.highlight_id = Some(fragment.highlight_id);
            a.paragraph.paragraph_spacing = EXPORT_PARAGRAPH_SPACING;
        });
        out.append(snippet);

        let mut citation = StyledText::new(format!("\n— {}\n", fragment.document_title), base.clone());
        citation.apply(TextRange::new(0, citation.len()), |a| {
            a.foreground = Color::SECONDARY;
            a.font.italic = true;
            a.font.size = CITATION_FONT_SIZE;
        });
        out.append(citation);

        if index + 1 < fragments.len() {
            out.append(StyledText::new("\n", base.clone()));
        }
    }

    out.coalesce();
    out
}

/// Render a composition in `format`
pub fn export(composition: &Composition, format: ExportFormat, style: &StyleConfig) -> String {
    match format {
        ExportFormat::Plain => to_plain_text(composition),
        ExportFormat::Markdown => to_markdown(composition),
        ExportFormat::Styled => {
            to_styled_text(composition, style).to_html(&HtmlConfig::default())
        }
    }
}
