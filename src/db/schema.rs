//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Create every table and index that doesn't exist yet
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Imported documents; styled content keeps its inline spans as JSON
CREATE TABLE IF NOT EXISTS document (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content_kind TEXT NOT NULL,
    text TEXT NOT NULL,
    spans_json TEXT,
    source_url TEXT,
    created_at TEXT NOT NULL,
    modified_at TEXT NOT NULL
);

-- Highlights; location/length are UTF-16 code units
CREATE TABLE IF NOT EXISTS highlight (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES document(id) ON DELETE CASCADE,
    location INTEGER NOT NULL,
    length INTEGER NOT NULL,
    color_hex TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_highlight_document ON highlight(document_id, location);

-- Compositions
CREATE TABLE IF NOT EXISTS composition (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    sort_mode TEXT NOT NULL DEFAULT 'manual',
    created_at TEXT NOT NULL,
    modified_at TEXT NOT NULL
);

-- Composition membership; one fragment per highlight per composition
CREATE TABLE IF NOT EXISTS composition_fragment (
    id TEXT PRIMARY KEY,
    composition_id TEXT NOT NULL REFERENCES composition(id) ON DELETE CASCADE,
    highlight_id TEXT NOT NULL REFERENCES highlight(id) ON DELETE CASCADE,
    sort_order INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (composition_id, highlight_id)
);

CREATE INDEX IF NOT EXISTS idx_fragment_composition ON composition_fragment(composition_id);
CREATE INDEX IF NOT EXISTS idx_fragment_highlight ON composition_fragment(highlight_id);

-- Key/value settings, values stored as JSON
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
