//! Interactive edit controller for one open document
//!
//! Translates gestures into store mutations: selecting a range and picking
//! a color adds a highlight; tapping a highlight stages it for removal
//! until confirmed; tapping a link forwards its destination untouched.
//! The editor follows the store's snapshot channel and re-composes whenever
//! any writer changed the highlights, so [`HighlightEditor::rendered`] and
//! [`HighlightEditor::tap`] always reflect the latest committed state.

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use super::store::{HighlightSnapshot, HighlightStore};
use crate::compose::{compose, StyleConfig, StyledText};
use crate::document::Document;
use crate::error::Result;
use crate::range::{TextRange, Utf16Text};
use crate::spans::{Color, Highlight, IndentSpan, LinkSpan, SpanRules};

/// What a tap at an offset resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// A link region; the destination is handed back to the caller
    Link(String),
    /// A highlight region; removal is staged until confirmed or cancelled
    ConfirmRemoval(Uuid),
    Nothing,
}

pub struct HighlightEditor {
    document: Arc<Document>,
    store: HighlightStore,
    changes: watch::Receiver<Arc<HighlightSnapshot>>,
    style: StyleConfig,
    units: Utf16Text,
    links: Vec<LinkSpan>,
    indents: Vec<IndentSpan>,
    rendered: StyledText,
    selection: Option<TextRange>,
    pending_removal: Option<Uuid>,
}

impl HighlightEditor {
    /// Open an editor; link and indent spans are derived once from the text
    pub fn new(
        document: Arc<Document>,
        store: HighlightStore,
        rules: &SpanRules,
        style: StyleConfig,
    ) -> Self {
        let text = document.content.text();
        let units = Utf16Text::new(text);
        let links = rules.detect_links(text);
        let indents = rules.compute_indents(text);
        let changes = store.subscribe();

        let mut editor = Self {
            document,
            store,
            changes,
            style,
            units,
            links,
            indents,
            rendered: StyledText::empty(),
            selection: None,
            pending_removal: None,
        };
        editor.refresh();
        editor
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Latest composed output
    pub fn rendered(&mut self) -> &StyledText {
        self.sync();
        &self.rendered
    }

    /// Re-run the composer over the store's current highlights
    pub fn refresh(&mut self) {
        let snapshot = self.changes.borrow_and_update().clone();
        self.rendered = compose(
            &self.document.content,
            &self.links,
            &self.indents,
            snapshot.highlights(self.document.id),
            &self.style,
        );
    }

    /// Re-compose if the store published a snapshot since the last compose
    fn sync(&mut self) {
        if self.changes.has_changed().unwrap_or(false) {
            self.refresh();
        }
    }

    /// Swap the style (e.g. after a theme change) and re-compose
    pub fn set_style(&mut self, style: StyleConfig) {
        self.style = style;
        self.refresh();
    }

    pub fn select(&mut self, range: TextRange) {
        self.selection = Some(range);
    }

    pub fn selection(&self) -> Option<TextRange> {
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn pending_removal(&self) -> Option<Uuid> {
        self.pending_removal
    }

    /// Highlight the current selection with `color`.
    ///
    /// The selection is clamped and whitespace-trimmed first; if nothing
    /// remains this is a no-op. The selection is cleared either way.
    pub async fn add_highlight(&mut self, color: Color) -> Result<Option<Highlight>> {
        let Some(selection) = self.selection.take() else {
            return Ok(None);
        };
        let Some(range) = selection.trim_whitespace_and_newlines(&self.units) else {
            tracing::debug!(document = %self.document.id, "ignoring blank selection");
            return Ok(None);
        };

        let highlight = Highlight::new(range, color);
        self.store.add(&highlight, self.document.id).await?;
        self.refresh();
        Ok(Some(highlight))
    }

    /// Resolve a tap. Links take precedence over highlights.
    pub fn tap(&mut self, offset: usize) -> TapOutcome {
        self.selection = None;
        self.sync();

        if let Some(destination) = self.rendered.link_at(offset) {
            return TapOutcome::Link(destination.to_string());
        }
        match self.rendered.highlight_at(offset) {
            Some(id) => {
                self.pending_removal = Some(id);
                TapOutcome::ConfirmRemoval(id)
            }
            None => TapOutcome::Nothing,
        }
    }

    /// Remove the highlight staged by the last tap, if any
    pub async fn confirm_removal(&mut self) -> Result<bool> {
        let Some(id) = self.pending_removal.take() else {
            return Ok(false);
        };
        let removed = self.store.remove(id, self.document.id).await?;
        self.refresh();
        Ok(removed)
    }

    pub fn cancel_removal(&mut self) {
        self.pending_removal = None;
    }

    /// Remove every highlight intersecting the current selection
    pub async fn remove_in_selection(&mut self) -> Result<Vec<Uuid>> {
        let Some(selection) = self.selection.take() else {
            return Ok(Vec::new());
        };
        let removed = self
            .store
            .remove_intersecting(selection, self.document.id)
            .await?;
        self.refresh();
        Ok(removed)
    }
}
