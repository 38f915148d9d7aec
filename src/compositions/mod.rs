//! Compositions: curated, ordered collections of highlights
//!
//! A composition only stores references to highlights. Snippet text,
//! color and source title are resolved against the highlight and document
//! stores whenever the composition snapshot is rebuilt.

mod export;
mod store;
mod types;

pub use export::{
    export, to_markdown, to_plain_text, to_styled_text, ExportFormat, PLAIN_TEXT_SEPARATOR,
};
pub use store::{CompositionStore, DEFAULT_SNIPPET_MAX_LEN};
pub use types::{Composition, Fragment, SortMode};
