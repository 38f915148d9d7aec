//! Pattern rules deriving link and indentation spans from text
//!
//! Both rule sets are pure functions of the text, so their output only has
//! to be recomputed when the text changes.

use regex::Regex;

use super::{IndentSpan, LinkSpan};
use crate::range::{TextRange, Utf16Cursor};

/// A regex whose matches become links
///
/// The destination is produced by expanding `template` against the match
/// captures (`$1`, `${name}`, `$0`).
#[derive(Debug, Clone)]
pub struct LinkRule {
    pattern: Regex,
    template: String,
}

impl LinkRule {
    pub fn new(pattern: &str, template: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            template: template.to_string(),
        })
    }

    /// `Article 12` → `folio://article/12`
    pub fn article_references() -> Result<Self, regex::Error> {
        Self::new(r"Article\s+(\d+)", "folio://article/$1")
    }

    /// Bare `http(s)://` URLs, linked to themselves
    pub fn web_urls() -> Result<Self, regex::Error> {
        Self::new(r#"https?://[^\s<>"()]+[^\s<>"().,;:!?]"#, "$0")
    }
}

/// Multilevel list indentation computed per paragraph
#[derive(Debug, Clone)]
pub struct IndentRule {
    /// Indent step in points
    pub base: f32,
    numbered: Regex,
    lettered: Regex,
    roman: Regex,
    leaders: Vec<char>,
}

impl IndentRule {
    pub fn new(base: f32) -> Result<Self, regex::Error> {
        Ok(Self {
            base,
            numbered: Regex::new(r"^\s*\d+\.")?,
            lettered: Regex::new(r"^\s*\([a-zA-Z]\)")?,
            roman: Regex::new(r"^\s*\([ivxlcdmIVXLCDM]+\)")?,
            leaders: vec!['–', '—', '•'],
        })
    }

    /// List nesting level of one paragraph
    fn level(&self, paragraph: &str) -> u8 {
        if self.numbered.is_match(paragraph) {
            0
        } else if self.lettered.is_match(paragraph) {
            1
        } else if self.roman.is_match(paragraph) {
            2
        } else if paragraph
            .trim_start()
            .starts_with(|c: char| self.leaders.contains(&c))
        {
            3
        } else {
            0
        }
    }
}

/// The rule set applied to a document's text before composing
#[derive(Debug, Clone)]
pub struct SpanRules {
    pub links: Vec<LinkRule>,
    pub indentation: Option<IndentRule>,
}

impl Default for SpanRules {
    fn default() -> Self {
        Self {
            links: [LinkRule::article_references(), LinkRule::web_urls()]
                .into_iter()
                .filter_map(Result::ok)
                .collect(),
            indentation: IndentRule::new(20.0).ok(),
        }
    }
}

impl SpanRules {
    /// No links, no indentation
    pub fn none() -> Self {
        Self {
            links: Vec::new(),
            indentation: None,
        }
    }

    /// Detect link spans, ordered by start offset
    pub fn detect_links(&self, text: &str) -> Vec<LinkSpan> {
        let mut found: Vec<(TextRange, String)> = Vec::new();

        for rule in &self.links {
            let mut cursor = Utf16Cursor::new(text);
            for caps in rule.pattern.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                let mut destination = String::new();
                caps.expand(&rule.template, &mut destination);
                if destination.is_empty() {
                    continue;
                }
                found.push((cursor.range_of(whole.range()), destination));
            }
        }

        found.sort_by_key(|(range, _)| range.start);
        found
            .into_iter()
            .enumerate()
            .map(|(id, (range, destination))| LinkSpan {
                id,
                range,
                destination,
            })
            .collect()
    }

    /// One indent span per paragraph, or nothing when indentation is disabled
    pub fn compute_indents(&self, text: &str) -> Vec<IndentSpan> {
        let Some(rule) = &self.indentation else {
            return Vec::new();
        };

        let mut offset = 0;
        paragraphs(text)
            .enumerate()
            .map(|(id, paragraph)| {
                let length = paragraph.encode_utf16().count();
                let range = TextRange::new(offset, length);
                offset += length;

                let indent = f32::from(rule.level(paragraph)) * rule.base + rule.base;
                IndentSpan {
                    id,
                    range,
                    head_indent: indent,
                    tail_indent: -indent,
                    first_line_indent: indent,
                }
            })
            .collect()
    }
}

fn is_paragraph_separator(c: char) -> bool {
    matches!(c, '\n' | '\u{2028}' | '\u{2029}')
}

fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(is_paragraph_separator)
}

/// UTF-16 ranges of each paragraph, terminators included
pub fn paragraph_ranges(text: &str) -> Vec<TextRange> {
    let mut offset = 0;
    paragraphs(text)
        .map(|paragraph| {
            let length = paragraph.encode_utf16().count();
            let range = TextRange::new(offset, length);
            offset += length;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_links() {
        let text = "See Article 12 and Article  3.";
        let links = SpanRules::default().detect_links(text);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].range, TextRange::new(4, 10));
        assert_eq!(links[0].destination, "folio://article/12");
        assert_eq!(links[1].destination, "folio://article/3");
        assert_eq!(links[1].id, 1);
    }

    #[test]
    fn test_web_url_links() {
        let text = "Read https://example.com/a?b=1. Then stop";
        let links = SpanRules::default().detect_links(text);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].destination, "https://example.com/a?b=1");
        assert_eq!(links[0].range, TextRange::new(5, 25));
    }

    #[test]
    fn test_link_offsets_are_utf16() {
        let text = "😀 Article 7";
        let links = SpanRules::default().detect_links(text);
        assert_eq!(links[0].range, TextRange::new(3, 9));
    }

    #[test]
    fn test_paragraph_ranges() {
        let ranges = paragraph_ranges("ab\ncd\r\n\nef");
        assert_eq!(
            ranges,
            vec![
                TextRange::new(0, 3),
                TextRange::new(3, 4),
                TextRange::new(7, 1),
                TextRange::new(8, 2),
            ]
        );
    }

    #[test]
    fn test_indent_levels() {
        let text = "1. first\n(a) letter\n(ii) roman\n• bullet\nplain";
        let spans = SpanRules::default().compute_indents(text);
        let heads: Vec<f32> = spans.iter().map(|s| s.head_indent).collect();

        assert_eq!(heads, vec![20.0, 40.0, 60.0, 80.0, 20.0]);
        assert!(spans.iter().all(|s| s.tail_indent == -s.head_indent));
        assert!(spans.iter().all(|s| s.first_line_indent == s.head_indent));
    }

    #[test]
    fn test_indent_spans_cover_text() {
        let text = "one\ntwo\nthree";
        let spans = SpanRules::default().compute_indents(text);
        let total: usize = spans.iter().map(|s| s.range.length).sum();
        assert_eq!(total, text.encode_utf16().count());
    }

    #[test]
    fn test_no_rules() {
        let rules = SpanRules::none();
        assert!(rules.detect_links("Article 5").is_empty());
        assert!(rules.compute_indents("1. x").is_empty());
    }
}
