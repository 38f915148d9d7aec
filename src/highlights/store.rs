//! Authoritative highlight store
//!
//! SQLite is the source of truth. Every mutation rebuilds the snapshot from
//! inside its own transaction and publishes it on a watch channel only once
//! the commit succeeded, so readers only ever see whole committed result
//! sets. Writers are serialized by an async mutex; a write that fails leaves
//! the previous snapshot in place.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, to_sql_int};
use crate::error::{AppError, Result};
use crate::range::TextRange;
use crate::spans::{Color, Highlight};

/// A highlight together with the document that owns it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHighlight {
    pub document_id: Uuid,
    #[serde(flatten)]
    pub highlight: Highlight,
}

/// Resolve a highlight by id, as needed by compositions
pub trait HighlightLookup: Send + Sync {
    fn highlight(&self, id: Uuid) -> Option<DocumentHighlight>;
}

/// Every highlight, grouped by document, each group in ascending start order
#[derive(Debug, Default)]
pub struct HighlightSnapshot {
    by_document: HashMap<Uuid, Vec<Highlight>>,
    owners: HashMap<Uuid, Uuid>,
}

impl HighlightSnapshot {
    pub fn highlights(&self, document_id: Uuid) -> &[Highlight] {
        self.by_document
            .get(&document_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn find(&self, id: Uuid) -> Option<DocumentHighlight> {
        let document_id = *self.owners.get(&id)?;
        self.highlights(document_id)
            .iter()
            .find(|h| h.id == id)
            .map(|h| DocumentHighlight {
                document_id,
                highlight: h.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = DocumentHighlight> + '_ {
        self.by_document.iter().flat_map(|(document_id, highlights)| {
            highlights.iter().map(|h| DocumentHighlight {
                document_id: *document_id,
                highlight: h.clone(),
            })
        })
    }
}

/// Durable, cached, observable highlight store
#[derive(Clone)]
pub struct HighlightStore {
    inner: Arc<HighlightStoreInner>,
}

struct HighlightStoreInner {
    pool: SqlitePool,
    write_lock: Mutex<()>,
    snapshot: watch::Sender<Arc<HighlightSnapshot>>,
}

impl HighlightStore {
    /// Open the store and load the initial snapshot
    pub async fn open(pool: SqlitePool) -> Result<Self> {
        let snapshot = load_snapshot(&mut *pool.acquire().await?).await?;
        tracing::info!("Loaded {} highlights", snapshot.len());
        let (sender, _) = watch::channel(Arc::new(snapshot));

        Ok(Self {
            inner: Arc::new(HighlightStoreInner {
                pool,
                write_lock: Mutex::new(()),
                snapshot: sender,
            }),
        })
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<HighlightSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    /// Receive a new snapshot after every committed write
    pub fn subscribe(&self) -> watch::Receiver<Arc<HighlightSnapshot>> {
        self.inner.snapshot.subscribe()
    }

    /// Highlights of one document, ascending start, ties by creation order.
    ///
    /// Unknown documents have no highlights.
    pub fn highlights(&self, document_id: Uuid) -> Vec<Highlight> {
        self.snapshot().highlights(document_id).to_vec()
    }

    pub fn highlight(&self, id: Uuid) -> Option<DocumentHighlight> {
        self.snapshot().find(id)
    }

    /// Every highlight across all documents
    pub fn all_highlights(&self) -> Vec<DocumentHighlight> {
        let mut all: Vec<DocumentHighlight> = self.snapshot().iter().collect();
        all.sort_by(|a, b| {
            a.document_id
                .cmp(&b.document_id)
                .then(a.highlight.range.start.cmp(&b.highlight.range.start))
                .then(a.highlight.created_at.cmp(&b.highlight.created_at))
        });
        all
    }

    /// Highlights whose color has the given canonical hex (`#RRGGBB`)
    pub fn highlights_with_color(&self, hex: &str) -> Vec<DocumentHighlight> {
        let Some(color) = Color::from_hex(hex) else {
            return Vec::new();
        };
        let wanted = color.to_hex();
        self.all_highlights()
            .into_iter()
            .filter(|h| h.highlight.color.to_hex() == wanted)
            .collect()
    }

    pub fn count(&self, document_id: Uuid) -> usize {
        self.snapshot().highlights(document_id).len()
    }

    pub fn total_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Persist a highlight for a document
    pub async fn add(&self, highlight: &Highlight, document_id: Uuid) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        ensure_document(&mut tx, document_id).await?;
        insert(&mut tx, highlight, document_id).await?;
        let snapshot = load_snapshot(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(
            document = %document_id,
            highlight = %highlight.id,
            "added highlight at {}+{}",
            highlight.range.start,
            highlight.range.length
        );
        self.publish(snapshot);
        Ok(())
    }

    /// Remove a highlight; a missing id is a no-op.
    ///
    /// Returns whether anything was removed.
    pub async fn remove(&self, id: Uuid, document_id: Uuid) -> Result<bool> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        let result = sqlx::query("DELETE FROM highlight WHERE id = ? AND document_id = ?")
            .bind(id.to_string())
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        let snapshot = load_snapshot(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(document = %document_id, highlight = %id, "removed highlight");
        self.publish(snapshot);
        Ok(true)
    }

    /// Remove every highlight sharing at least one code unit with `range`.
    ///
    /// Returns the removed ids.
    pub async fn remove_intersecting(
        &self,
        range: TextRange,
        document_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        let rows = sqlx::query_as::<_, HighlightRow>(
            r#"
            SELECT id, document_id, location, length, color_hex, created_at
            FROM highlight
            WHERE document_id = ?
            "#,
        )
        .bind(document_id.to_string())
        .fetch_all(&mut *tx)
        .await?;

        let mut removed = Vec::new();
        for row in rows {
            let Some(existing) = TextRange::from_raw(row.location, row.length) else {
                continue;
            };
            if !existing.intersects(&range) {
                continue;
            }
            sqlx::query("DELETE FROM highlight WHERE id = ?")
                .bind(&row.id)
                .execute(&mut *tx)
                .await?;
            if let Ok(id) = Uuid::parse_str(&row.id) {
                removed.push(id);
            }
        }

        if removed.is_empty() {
            return Ok(removed);
        }
        let snapshot = load_snapshot(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(
            document = %document_id,
            "removed {} highlights intersecting {}+{}",
            removed.len(),
            range.start,
            range.length
        );
        self.publish(snapshot);
        Ok(removed)
    }

    /// Replace a document's highlights wholesale.
    ///
    /// Duplicates (same id, or same range and color) are dropped, first wins.
    pub async fn replace_all(&self, highlights: &[Highlight], document_id: Uuid) -> Result<()> {
        let mut unique: Vec<&Highlight> = Vec::with_capacity(highlights.len());
        for highlight in highlights {
            if unique
                .iter()
                .any(|kept| kept.id == highlight.id || kept.same_span(highlight))
            {
                continue;
            }
            unique.push(highlight);
        }

        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        ensure_document(&mut tx, document_id).await?;
        sqlx::query("DELETE FROM highlight WHERE document_id = ?")
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await?;
        for highlight in &unique {
            insert(&mut tx, highlight, document_id).await?;
        }
        let snapshot = load_snapshot(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(
            document = %document_id,
            "replaced highlights with {} entries",
            unique.len()
        );
        self.publish(snapshot);
        Ok(())
    }

    /// Remove every highlight of one document.
    ///
    /// Returns how many were removed.
    pub async fn delete_for_document(&self, document_id: Uuid) -> Result<u64> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        let result = sqlx::query("DELETE FROM highlight WHERE document_id = ?")
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await?;
        let removed = result.rows_affected();
        if removed == 0 {
            return Ok(0);
        }
        let snapshot = load_snapshot(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(document = %document_id, "cleared {} highlights", removed);
        self.publish(snapshot);
        Ok(removed)
    }

    /// Remove every highlight of every document.
    ///
    /// Returns how many were removed.
    pub async fn clear_all(&self) -> Result<u64> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        let result = sqlx::query("DELETE FROM highlight")
            .execute(&mut *tx)
            .await?;
        let snapshot = load_snapshot(&mut tx).await?;

        tx.commit().await?;
        tracing::info!("cleared {} highlights", result.rows_affected());
        self.publish(snapshot);
        Ok(result.rows_affected())
    }

    /// Re-read the database, e.g. after a cascade triggered elsewhere
    pub async fn reload(&self) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        let mut conn = self.inner.pool.acquire().await?;
        let snapshot = load_snapshot(&mut conn).await?;
        self.publish(snapshot);
        Ok(())
    }

    fn publish(&self, snapshot: HighlightSnapshot) {
        self.inner.snapshot.send_replace(Arc::new(snapshot));
    }
}

impl HighlightLookup for HighlightStore {
    fn highlight(&self, id: Uuid) -> Option<DocumentHighlight> {
        HighlightStore::highlight(self, id)
    }
}

async fn ensure_document(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    document_id: Uuid,
) -> Result<()> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM document WHERE id = ?")
        .bind(document_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("Document not found: {}", document_id))),
    }
}

async fn insert(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    highlight: &Highlight,
    document_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO highlight (id, document_id, location, length, color_hex, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(highlight.id.to_string())
    .bind(document_id.to_string())
    .bind(to_sql_int(highlight.range.start)?)
    .bind(to_sql_int(highlight.range.length)?)
    .bind(highlight.color.to_hex_with_alpha())
    .bind(format_timestamp(&highlight.created_at))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn load_snapshot(conn: &mut SqliteConnection) -> Result<HighlightSnapshot> {
    let rows = sqlx::query_as::<_, HighlightRow>(
        r#"
        SELECT id, document_id, location, length, color_hex, created_at
        FROM highlight
        ORDER BY document_id, location, created_at, rowid
        "#,
    )
    .fetch_all(conn)
    .await?;

    let mut snapshot = HighlightSnapshot::default();
    for row in rows {
        match row.into_highlight() {
            Ok((document_id, highlight)) => {
                snapshot.owners.insert(highlight.id, document_id);
                snapshot
                    .by_document
                    .entry(document_id)
                    .or_default()
                    .push(highlight);
            }
            Err(e) => tracing::warn!("Skipping unreadable highlight row: {}", e),
        }
    }
    Ok(snapshot)
}

/// Internal row type for SQLite queries
#[derive(sqlx::FromRow)]
struct HighlightRow {
    id: String,
    document_id: String,
    location: i64,
    length: i64,
    color_hex: String,
    created_at: String,
}

impl HighlightRow {
    fn into_highlight(self) -> Result<(Uuid, Highlight)> {
        let parse_id = |value: &str| {
            Uuid::parse_str(value)
                .map_err(|e| AppError::Internal(format!("Invalid id {}: {}", value, e)))
        };
        let range = TextRange::from_raw(self.location, self.length).ok_or_else(|| {
            AppError::Internal(format!(
                "Negative range {}+{} for highlight {}",
                self.location, self.length, self.id
            ))
        })?;
        let color = Color::from_hex(&self.color_hex)
            .ok_or_else(|| AppError::Internal(format!("Invalid color {}", self.color_hex)))?;

        Ok((
            parse_id(&self.document_id)?,
            Highlight {
                id: parse_id(&self.id)?,
                range,
                color,
                created_at: parse_timestamp(&self.created_at)?,
            },
        ))
    }
}
