//! Folio
//!
//! Document highlighting and excerpt composition. Users highlight ranges of
//! imported documents; highlights are layered with derived link and indent
//! spans into styled text, and can be gathered into compositions that
//! export as plain text, markdown or styled HTML.
//!
//! # Modules
//!
//! - `range`: UTF-16 text ranges
//! - `spans`: highlights, derived link and indent spans, colors
//! - `compose`: the span composer and styled text
//! - `highlights`: highlight store and interactive editor
//! - `compositions`: composition store, sorting and export
//! - `settings`: reader themes with debounced persistence

pub mod compose;
pub mod compositions;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod highlights;
pub mod range;
pub mod routes;
pub mod settings;
pub mod spans;
pub mod state;
