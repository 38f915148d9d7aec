//! Highlights
//!
//! - `store`: durable, cached, observable set of highlights per document
//! - `editor`: gesture-level contract (select, color, tap, confirm) over the store

mod editor;
mod store;

pub use editor::{HighlightEditor, TapOutcome};
pub use store::{DocumentHighlight, HighlightLookup, HighlightSnapshot, HighlightStore};
