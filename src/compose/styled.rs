//! Styled text: a string partitioned into runs of uniform attributes

use serde::Serialize;
use uuid::Uuid;

use crate::range::TextRange;
use crate::spans::Color;

/// Horizontal paragraph alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

/// Font selection for a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
}

/// Paragraph-level layout attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    pub line_height_multiple: f32,
    pub paragraph_spacing: f32,
    pub alignment: Alignment,
    pub head_indent: f32,
    pub tail_indent: f32,
    pub first_line_head_indent: f32,
}

/// Every attribute key a run can carry
///
/// Keys are independent: setting one never clears another.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    pub font: Font,
    pub foreground: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    pub paragraph: ParagraphStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub underline: bool,
    pub strikethrough: bool,
    /// Highlight that produced the background, for hit testing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_id: Option<Uuid>,
}

/// A maximal range of uniform attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeRun {
    pub range: TextRange,
    pub attributes: Attributes,
}

/// Text plus a gap-free, non-overlapping partition into attribute runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledText {
    text: String,
    length: usize,
    runs: Vec<AttributeRun>,
}

impl StyledText {
    /// Text with `attributes` applied everywhere
    pub fn new(text: impl Into<String>, attributes: Attributes) -> Self {
        let text = text.into();
        let length = text.encode_utf16().count();
        let runs = if length == 0 {
            Vec::new()
        } else {
            vec![AttributeRun {
                range: TextRange::new(0, length),
                attributes,
            }]
        };
        Self { text, length, runs }
    }

    /// An empty styled text
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            length: 0,
            runs: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn runs(&self) -> &[AttributeRun] {
        &self.runs
    }

    /// Mutate the attributes of every code unit in `range`.
    ///
    /// The range is clamped to the text; an empty result is a no-op.
    pub fn apply(&mut self, range: TextRange, mut update: impl FnMut(&mut Attributes)) {
        let Some(range) = range.clamp(self.length).filter(|r| !r.is_empty()) else {
            return;
        };
        let first = self.split_at(range.start);
        let last = self.split_at(range.end());
        for run in &mut self.runs[first..last] {
            update(&mut run.attributes);
        }
    }

    /// Split the run containing `offset` so that a run starts exactly there.
    ///
    /// Returns the index of that run (or `runs.len()` at the end of the text).
    fn split_at(&mut self, offset: usize) -> usize {
        let index = self.runs.partition_point(|run| run.range.end() <= offset);
        let Some(run) = self.runs.get(index) else {
            return index;
        };
        if run.range.start == offset {
            return index;
        }

        let head = TextRange::new(run.range.start, offset - run.range.start);
        let tail = TextRange::new(offset, run.range.end() - offset);
        let tail_run = AttributeRun {
            range: tail,
            attributes: run.attributes.clone(),
        };
        self.runs[index].range = head;
        self.runs.insert(index + 1, tail_run);
        index + 1
    }

    /// Merge adjacent runs whose attributes are equal
    pub fn coalesce(&mut self) {
        let mut merged: Vec<AttributeRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match merged.last_mut() {
                Some(prev) if prev.attributes == run.attributes => {
                    prev.range.length += run.range.length;
                }
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }

    /// Append another styled text after this one
    pub fn append(&mut self, other: StyledText) {
        let shift = self.length;
        self.text.push_str(&other.text);
        self.length += other.length;
        self.runs.extend(other.runs.into_iter().map(|mut run| {
            run.range.start += shift;
            run
        }));
    }

    /// Attributes in effect at `offset`
    pub fn attributes_at(&self, offset: usize) -> Option<&Attributes> {
        let index = self.runs.partition_point(|run| run.range.end() <= offset);
        self.runs
            .get(index)
            .filter(|run| run.range.contains(offset))
            .map(|run| &run.attributes)
    }

    /// Highlight tagged at `offset`
    pub fn highlight_at(&self, offset: usize) -> Option<Uuid> {
        self.attributes_at(offset).and_then(|a| a.highlight_id)
    }

    /// Link destination at `offset`
    pub fn link_at(&self, offset: usize) -> Option<&str> {
        self.attributes_at(offset).and_then(|a| a.link.as_deref())
    }
}
