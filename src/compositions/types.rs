//! Composition model with resolved fragments

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::range::TextRange;
use crate::spans::Color;

/// Ordering applied to a composition's fragments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Manual,
    Recent,
    Color,
    Source,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [
        SortMode::Manual,
        SortMode::Recent,
        SortMode::Color,
        SortMode::Source,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Manual => "manual",
            SortMode::Recent => "recent",
            SortMode::Color => "color",
            SortMode::Source => "source",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown sort mode: {}", s))
    }
}

/// One highlight inside a composition, resolved against its document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub id: Uuid,
    pub highlight_id: Uuid,
    pub document_id: Uuid,
    pub document_title: String,
    pub text_snippet: String,
    pub range: TextRange,
    pub color: Color,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Fragment {}

/// A curated, ordered collection of highlights
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub id: Uuid,
    pub title: String,
    pub sort_mode: SortMode,
    pub fragments: Vec<Fragment>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Composition {
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments in the order of the current sort mode (stable sorts)
    pub fn sorted_fragments(&self) -> Vec<Fragment> {
        let mut fragments = self.fragments.clone();
        match self.sort_mode {
            SortMode::Manual => fragments.sort_by_key(|f| f.sort_order),
            SortMode::Recent => fragments.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortMode::Color => fragments.sort_by_cached_key(|f| f.color.to_hex()),
            SortMode::Source => fragments.sort_by(|a, b| {
                a.document_title
                    .cmp(&b.document_title)
                    .then(a.sort_order.cmp(&b.sort_order))
            }),
        }
        fragments
    }

    /// Short preview: the first snippets, each cut to `max_len` characters,
    /// joined by ` • `
    pub fn preview_text(&self, max_fragments: usize, max_len: usize) -> String {
        let preview = self
            .sorted_fragments()
            .iter()
            .take(max_fragments)
            .map(|f| f.text_snippet.chars().take(max_len).collect::<String>())
            .collect::<Vec<_>>()
            .join(" • ");
        preview.chars().take(max_len * max_fragments).collect()
    }
}

impl PartialEq for Composition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Composition {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fragment(snippet: &str, title: &str, color: Color, sort_order: i64, age_secs: i64) -> Fragment {
        Fragment {
            id: Uuid::new_v4(),
            highlight_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            document_title: title.to_string(),
            text_snippet: snippet.to_string(),
            range: TextRange::new(0, snippet.len()),
            color,
            sort_order,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    fn composition(mode: SortMode, fragments: Vec<Fragment>) -> Composition {
        Composition {
            id: Uuid::new_v4(),
            title: "Notes".to_string(),
            sort_mode: mode,
            fragments,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    fn snippets(c: &Composition) -> Vec<String> {
        c.sorted_fragments().into_iter().map(|f| f.text_snippet).collect()
    }

    #[test]
    fn test_manual_sorts_by_order() {
        let c = composition(
            SortMode::Manual,
            vec![
                fragment("c", "T", Color::BLACK, 5, 0),
                fragment("a", "T", Color::BLACK, 0, 0),
                fragment("b", "T", Color::BLACK, 2, 0),
            ],
        );
        assert_eq!(snippets(&c), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_recent_sorts_newest_first() {
        let c = composition(
            SortMode::Recent,
            vec![
                fragment("old", "T", Color::BLACK, 0, 100),
                fragment("new", "T", Color::BLACK, 1, 1),
                fragment("mid", "T", Color::BLACK, 2, 50),
            ],
        );
        assert_eq!(snippets(&c), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_color_sorts_by_hex() {
        let c = composition(
            SortMode::Color,
            vec![
                fragment("yellow", "T", Color::rgb(0xFE, 0xF3, 0xB5), 0, 0),
                fragment("blue", "T", Color::rgb(0xBB, 0xDE, 0xFB), 1, 0),
                fragment("green", "T", Color::rgb(0xC8, 0xE6, 0xC9), 2, 0),
            ],
        );
        assert_eq!(snippets(&c), vec!["blue", "green", "yellow"]);
    }

    #[test]
    fn test_source_sorts_by_title_then_order() {
        let c = composition(
            SortMode::Source,
            vec![
                fragment("b2", "B", Color::BLACK, 1, 0),
                fragment("a1", "A", Color::BLACK, 3, 0),
                fragment("b1", "B", Color::BLACK, 0, 0),
            ],
        );
        assert_eq!(snippets(&c), vec!["a1", "b1", "b2"]);
    }

    #[test]
    fn test_sorts_are_stable() {
        let c = composition(
            SortMode::Manual,
            vec![
                fragment("first", "T", Color::BLACK, 1, 0),
                fragment("second", "T", Color::BLACK, 1, 0),
            ],
        );
        assert_eq!(snippets(&c), vec!["first", "second"]);
    }

    #[test]
    fn test_preview_text() {
        let c = composition(
            SortMode::Manual,
            vec![
                fragment("alpha beta", "T", Color::BLACK, 0, 0),
                fragment("gamma", "T", Color::BLACK, 1, 0),
                fragment("delta", "T", Color::BLACK, 2, 0),
            ],
        );
        assert_eq!(c.preview_text(2, 5), "alpha • ga");
        assert_eq!(c.preview_text(2, 100), "alpha beta • gamma");
    }

    #[test]
    fn test_sort_mode_strings() {
        for mode in SortMode::ALL {
            assert_eq!(mode.as_str().parse::<SortMode>().unwrap(), mode);
        }
        assert!("random".parse::<SortMode>().is_err());
        assert_eq!(serde_json::to_string(&SortMode::Source).unwrap(), "\"source\"");
    }
}
