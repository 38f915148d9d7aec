//! HTML rendering of composed text
//!
//! Each paragraph becomes a `<p>` carrying its paragraph style; each run
//! becomes a `<span>` (or `<a>` for links). Highlight runs get a class and
//! an id attribute so a web view can hit-test them the same way a native
//! text view would.

use std::fmt::Write;

use super::styled::{Alignment, AttributeRun, StyledText};
use crate::range::{TextRange, Utf16Text};
use crate::spans::paragraph_ranges;

/// Configuration for HTML output
#[derive(Debug, Clone)]
pub struct HtmlConfig {
    /// CSS class for highlight spans
    pub class_prefix: String,
    /// Data attribute carrying the highlight id
    pub id_attribute: String,
    /// Whether to emit inline `style` attributes
    pub include_inline_styles: bool,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            class_prefix: "folio-highlight".to_string(),
            id_attribute: "data-highlight-id".to_string(),
            include_inline_styles: true,
        }
    }
}

impl StyledText {
    /// Render as a sequence of HTML paragraphs
    pub fn to_html(&self, config: &HtmlConfig) -> String {
        let units = Utf16Text::new(self.text());
        let mut out = String::new();

        for paragraph in paragraph_ranges(self.text()) {
            let runs: Vec<(TextRange, &AttributeRun)> = self
                .runs()
                .iter()
                .filter_map(|run| run.range.intersection(&paragraph).map(|r| (r, run)))
                .collect();

            out.push_str("<p");
            if config.include_inline_styles {
                if let Some((_, first)) = runs.first() {
                    let _ = write!(out, " style=\"{}\"", paragraph_css(first));
                }
            }
            out.push('>');

            for (range, run) in runs {
                let Some(text) = units.slice(range) else { continue };
                let text = text.trim_end_matches(['\n', '\u{2028}', '\u{2029}']);
                if text.is_empty() {
                    continue;
                }
                write_run(&mut out, text, run, config);
            }

            out.push_str("</p>\n");
        }

        out
    }
}

fn paragraph_css(run: &AttributeRun) -> String {
    let p = &run.attributes.paragraph;
    let align = match p.alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justified => "justify",
    };
    format!(
        "margin: 0 {}px {}px {}px; text-indent: {}px; line-height: {}; text-align: {};",
        -p.tail_indent,
        p.paragraph_spacing,
        p.head_indent,
        p.first_line_head_indent - p.head_indent,
        p.line_height_multiple,
        align
    )
}

fn run_css(run: &AttributeRun) -> String {
    let a = &run.attributes;
    let mut css = format!(
        "font-family: {}; font-size: {}px; color: {};",
        a.font.family,
        a.font.size,
        a.foreground.to_css()
    );
    if a.font.bold {
        css.push_str(" font-weight: bold;");
    }
    if a.font.italic {
        css.push_str(" font-style: italic;");
    }
    if a.font.monospace {
        css.push_str(" font-family: monospace;");
    }
    let decorations: Vec<&str> = [
        a.underline.then_some("underline"),
        a.strikethrough.then_some("line-through"),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !decorations.is_empty() {
        let _ = write!(css, " text-decoration: {};", decorations.join(" "));
    }
    if let Some(background) = a.background {
        let _ = write!(css, " background-color: {};", background.to_css());
    }
    css
}

fn write_run(out: &mut String, text: &str, run: &AttributeRun, config: &HtmlConfig) {
    let a = &run.attributes;
    let tag = if a.link.is_some() { "a" } else { "span" };

    let _ = write!(out, "<{tag}");
    if let Some(href) = &a.link {
        let _ = write!(
            out,
            " href=\"{}\"",
            html_escape::encode_double_quoted_attribute(href)
        );
    }
    if let Some(id) = a.highlight_id {
        let _ = write!(
            out,
            " class=\"{}\" {}=\"{}\"",
            config.class_prefix, config.id_attribute, id
        );
    }
    if config.include_inline_styles {
        let _ = write!(
            out,
            " style=\"{}\"",
            html_escape::encode_double_quoted_attribute(&run_css(run))
        );
    }
    let _ = write!(out, ">{}</{tag}>", html_escape::encode_text(text));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, StyleConfig};
    use crate::document::Content;
    use crate::spans::{Color, Highlight, SpanRules};

    fn render(text: &str, highlights: &[Highlight], config: &HtmlConfig) -> String {
        let rules = SpanRules::default();
        compose(
            &Content::plain(text),
            &rules.detect_links(text),
            &rules.compute_indents(text),
            highlights,
            &StyleConfig::default(),
        )
        .to_html(config)
    }

    #[test]
    fn test_one_paragraph_per_line() {
        let html = render("first\nsecond", &[], &HtmlConfig::default());
        assert_eq!(html.matches("<p").count(), 2);
        assert!(html.contains(">first</span>"));
        assert!(html.contains(">second</span>"));
    }

    #[test]
    fn test_highlight_span_attributes() {
        let h = Highlight::new(TextRange::new(0, 5), Color::PALETTE[0].1);
        let html = render("hello world", &[h.clone()], &HtmlConfig::default());

        assert!(html.contains("class=\"folio-highlight\""));
        assert!(html.contains(&format!("data-highlight-id=\"{}\"", h.id)));
        assert!(html.contains("background-color: rgba(254, 243, 181, 0.25)"));
    }

    #[test]
    fn test_links_become_anchors() {
        let config = HtmlConfig {
            include_inline_styles: false,
            ..HtmlConfig::default()
        };
        let html = render("See Article 2", &[], &config);
        assert!(html.contains("<a href=\"folio://article/2\">Article 2</a>"));
        assert!(!html.contains("style="));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render("a < b & c", &[], &HtmlConfig::default());
        assert!(html.contains("a &lt; b &amp; c"));
    }
}
