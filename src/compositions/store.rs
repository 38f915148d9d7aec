//! Composition persistence and resolution
//!
//! Compositions and their fragment rows live in SQLite. Fragment rows only
//! reference highlights; snippet text, color and document title are resolved
//! when the snapshot is built, through the [`HighlightLookup`] and
//! [`DocumentLookup`] collaborators. Fragments that no longer resolve are
//! left out of the snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use super::types::{Composition, Fragment, SortMode};
use crate::db::{format_timestamp, parse_timestamp};
use crate::document::DocumentLookup;
use crate::error::{AppError, Result};
use crate::highlights::HighlightLookup;

/// Default maximum snippet length, in characters
pub const DEFAULT_SNIPPET_MAX_LEN: usize = 200;

type Transaction<'a> = sqlx::Transaction<'a, sqlx::Sqlite>;

#[derive(Clone)]
pub struct CompositionStore {
    inner: Arc<CompositionStoreInner>,
}

struct CompositionStoreInner {
    pool: SqlitePool,
    write_lock: Mutex<()>,
    highlights: Arc<dyn HighlightLookup>,
    documents: Arc<dyn DocumentLookup>,
    snippet_max_len: usize,
    snapshot: watch::Sender<Arc<Vec<Composition>>>,
}

impl CompositionStore {
    /// Open the store and resolve the initial snapshot
    pub async fn open(
        pool: SqlitePool,
        highlights: Arc<dyn HighlightLookup>,
        documents: Arc<dyn DocumentLookup>,
        snippet_max_len: usize,
    ) -> Result<Self> {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let store = Self {
            inner: Arc::new(CompositionStoreInner {
                pool,
                write_lock: Mutex::new(()),
                highlights,
                documents,
                snippet_max_len,
                snapshot,
            }),
        };
        let compositions = store.load(&mut *store.inner.pool.acquire().await?).await?;
        tracing::info!("Loaded {} compositions", compositions.len());
        store.publish(compositions);
        Ok(store)
    }

    /// All compositions, most recently modified first
    pub fn compositions(&self) -> Vec<Composition> {
        self.inner.snapshot.borrow().as_ref().clone()
    }

    pub fn composition(&self, id: Uuid) -> Option<Composition> {
        self.inner
            .snapshot
            .borrow()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Receive a new snapshot after every committed change or reload
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Composition>>> {
        self.inner.snapshot.subscribe()
    }

    pub async fn create_composition(&self, title: &str) -> Result<Uuid> {
        let title = validate_title(title)?;
        let id = Uuid::new_v4();
        let now = format_timestamp(&Utc::now());

        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO composition (id, title, sort_mode, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(title)
        .bind(SortMode::default().as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let compositions = self.load(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(composition = %id, "created composition {:?}", title);
        self.publish(compositions);
        Ok(id)
    }

    pub async fn update_title(&self, id: Uuid, title: &str) -> Result<()> {
        self.update(id, Some(title), None).await
    }

    pub async fn update_sort_mode(&self, id: Uuid, mode: SortMode) -> Result<()> {
        self.update(id, None, Some(mode)).await
    }

    /// Change title and/or sort mode together; either both apply or neither
    pub async fn update(&self, id: Uuid, title: Option<&str>, mode: Option<SortMode>) -> Result<()> {
        let title = title.map(validate_title).transpose()?;

        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;
        ensure_composition(&mut tx, id).await?;

        if let Some(title) = title {
            sqlx::query("UPDATE composition SET title = ? WHERE id = ?")
                .bind(title)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        if let Some(mode) = mode {
            sqlx::query("UPDATE composition SET sort_mode = ? WHERE id = ?")
                .bind(mode.as_str())
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        touch(&mut tx, id).await?;
        let compositions = self.load(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(composition = %id, "updated composition");
        self.publish(compositions);
        Ok(())
    }

    /// Delete a composition and its fragments; a missing id is a no-op
    pub async fn delete_composition(&self, id: Uuid) -> Result<bool> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;
        let result = sqlx::query("DELETE FROM composition WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        let compositions = self.load(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(composition = %id, "deleted composition");
        self.publish(compositions);
        Ok(true)
    }

    /// Add one highlight at the end of the manual order.
    ///
    /// Adding a highlight that is already present is a no-op.
    pub async fn add_highlight(&self, highlight_id: Uuid, composition_id: Uuid) -> Result<()> {
        self.add_highlights(&[highlight_id], composition_id)
            .await
            .map(|_| ())
    }

    /// Add highlights in order, skipping ones already present.
    ///
    /// New fragments get strictly increasing sort orders starting after the
    /// current maximum. Returns how many fragments were created.
    pub async fn add_highlights(&self, highlight_ids: &[Uuid], composition_id: Uuid) -> Result<usize> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        ensure_composition(&mut tx, composition_id).await?;
        for highlight_id in highlight_ids {
            ensure_highlight(&mut tx, *highlight_id).await?;
        }

        let (mut next_order,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM composition_fragment WHERE composition_id = ?",
        )
        .bind(composition_id.to_string())
        .fetch_one(&mut *tx)
        .await?;

        let now = format_timestamp(&Utc::now());
        let mut added = 0;
        for highlight_id in highlight_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO composition_fragment (id, composition_id, highlight_id, sort_order, created_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (composition_id, highlight_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(composition_id.to_string())
            .bind(highlight_id.to_string())
            .bind(next_order)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                next_order += 1;
                added += 1;
            }
        }

        if added == 0 {
            return Ok(0);
        }
        touch(&mut tx, composition_id).await?;
        let compositions = self.load(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(composition = %composition_id, "added {} fragments", added);
        self.publish(compositions);
        Ok(added)
    }

    /// Remove one fragment; sort orders of the others are left as they are
    pub async fn remove_fragment(&self, fragment_id: Uuid, composition_id: Uuid) -> Result<bool> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;

        let result = sqlx::query("DELETE FROM composition_fragment WHERE id = ? AND composition_id = ?")
            .bind(fragment_id.to_string())
            .bind(composition_id.to_string())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        touch(&mut tx, composition_id).await?;
        let compositions = self.load(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(composition = %composition_id, fragment = %fragment_id, "removed fragment");
        self.publish(compositions);
        Ok(true)
    }

    /// Move the fragments at `from_offsets` of the current sorted order so
    /// they land before the fragment originally at `to_offset`, then
    /// renumber every fragment by its new position. Rows that no longer
    /// resolve are numbered after the resolved ones, keeping their order.
    pub async fn reorder_fragments(
        &self,
        composition_id: Uuid,
        from_offsets: &[usize],
        to_offset: usize,
    ) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        let composition = self
            .composition(composition_id)
            .ok_or_else(|| not_found(composition_id))?;

        let mut fragments = composition.sorted_fragments();
        move_items(&mut fragments, from_offsets, to_offset);

        let resolved: Vec<String> = fragments.iter().map(|f| f.id.to_string()).collect();

        let mut tx = self.inner.pool.begin().await?;
        let stored: Vec<(String,)> = sqlx::query_as(
            "SELECT id FROM composition_fragment WHERE composition_id = ? ORDER BY sort_order, rowid",
        )
        .bind(composition_id.to_string())
        .fetch_all(&mut *tx)
        .await?;
        let unresolved = stored
            .into_iter()
            .map(|(id,)| id)
            .filter(|id| !resolved.contains(id));

        for (index, id) in resolved.iter().cloned().chain(unresolved).enumerate() {
            sqlx::query("UPDATE composition_fragment SET sort_order = ? WHERE id = ?")
                .bind(index as i64)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        touch(&mut tx, composition_id).await?;
        let compositions = self.load(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(composition = %composition_id, "reordered {} fragments", fragments.len());
        self.publish(compositions);
        Ok(())
    }

    /// Move one fragment to `new_index` in the current sorted order
    pub async fn move_fragment(
        &self,
        fragment_id: Uuid,
        composition_id: Uuid,
        new_index: usize,
    ) -> Result<()> {
        let composition = self
            .composition(composition_id)
            .ok_or_else(|| not_found(composition_id))?;
        let current = composition
            .sorted_fragments()
            .iter()
            .position(|f| f.id == fragment_id)
            .ok_or_else(|| AppError::NotFound(format!("Fragment not found: {}", fragment_id)))?;

        let to_offset = if new_index > current { new_index + 1 } else { new_index };
        self.reorder_fragments(composition_id, &[current], to_offset)
            .await
    }

    /// Re-read and re-resolve everything, e.g. after highlights changed
    pub async fn reload(&self) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        let mut conn = self.inner.pool.acquire().await?;
        let compositions = self.load(&mut conn).await?;
        self.publish(compositions);
        Ok(())
    }

    fn publish(&self, compositions: Vec<Composition>) {
        self.inner.snapshot.send_replace(Arc::new(compositions));
    }

    async fn load(&self, conn: &mut SqliteConnection) -> Result<Vec<Composition>> {
        let rows = sqlx::query_as::<_, CompositionRow>(
            r#"
            SELECT id, title, sort_mode, created_at, modified_at
            FROM composition
            ORDER BY modified_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let fragment_rows = sqlx::query_as::<_, FragmentRow>(
            r#"
            SELECT id, composition_id, highlight_id, sort_order, created_at
            FROM composition_fragment
            ORDER BY composition_id, sort_order, rowid
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut grouped: HashMap<String, Vec<FragmentRow>> = HashMap::new();
        for row in fragment_rows {
            grouped.entry(row.composition_id.clone()).or_default().push(row);
        }

        let mut compositions = Vec::with_capacity(rows.len());
        for row in rows {
            let fragments = grouped
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|f| self.resolve(f))
                .collect();
            match row.into_composition(fragments) {
                Ok(composition) => compositions.push(composition),
                Err(e) => tracing::warn!("Skipping unreadable composition row: {}", e),
            }
        }
        Ok(compositions)
    }

    /// Resolve a fragment row against its highlight and document
    fn resolve(&self, row: FragmentRow) -> Option<Fragment> {
        let id = Uuid::parse_str(&row.id).ok()?;
        let highlight_id = Uuid::parse_str(&row.highlight_id).ok()?;
        let created_at = parse_timestamp(&row.created_at).ok()?;

        let Some(found) = self.inner.highlights.highlight(highlight_id) else {
            tracing::debug!(fragment = %id, "highlight no longer exists");
            return None;
        };
        let Some(document) = self.inner.documents.document(found.document_id) else {
            tracing::debug!(fragment = %id, "document no longer exists");
            return None;
        };
        let Some(snippet) = document.content.snippet(found.highlight.range) else {
            tracing::warn!(fragment = %id, "highlight range is outside its document");
            return None;
        };

        Some(Fragment {
            id,
            highlight_id,
            document_id: found.document_id,
            document_title: document.title.clone(),
            text_snippet: truncate(&snippet, self.inner.snippet_max_len),
            range: found.highlight.range,
            color: found.highlight.color,
            sort_order: row.sort_order,
            created_at,
        })
    }
}

fn validate_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Composition title must not be empty".to_string()));
    }
    Ok(title)
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Composition not found: {}", id))
}

fn truncate(snippet: &str, max_len: usize) -> String {
    match snippet.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}…", &snippet[..cut]),
        None => snippet.to_string(),
    }
}

/// List move: take the items at `from` out and re-insert them, in their
/// original relative order, before the item originally at `to`.
pub(crate) fn move_items<T>(items: &mut Vec<T>, from: &[usize], to: usize) {
    let len = items.len();
    let to = to.min(len);
    let mut offsets: Vec<usize> = from.iter().copied().filter(|&i| i < len).collect();
    offsets.sort_unstable();
    offsets.dedup();
    if offsets.is_empty() {
        return;
    }

    let insert_at = to - offsets.iter().filter(|&&i| i < to).count();
    let mut moving = Vec::with_capacity(offsets.len());
    for &offset in offsets.iter().rev() {
        moving.push(items.remove(offset));
    }
    moving.reverse();

    let tail = items.split_off(insert_at);
    items.extend(moving);
    items.extend(tail);
}

async fn ensure_composition(tx: &mut Transaction<'_>, id: Uuid) -> Result<()> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM composition WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
    exists.map(|_| ()).ok_or_else(|| not_found(id))
}

async fn ensure_highlight(tx: &mut Transaction<'_>, id: Uuid) -> Result<()> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM highlight WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
    exists
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Highlight not found: {}", id)))
}

async fn touch(tx: &mut Transaction<'_>, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE composition SET modified_at = ? WHERE id = ?")
        .bind(format_timestamp(&Utc::now()))
        .bind(id.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct CompositionRow {
    id: String,
    title: String,
    sort_mode: String,
    created_at: String,
    modified_at: String,
}

impl CompositionRow {
    fn into_composition(self, fragments: Vec<Fragment>) -> Result<Composition> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| AppError::Internal(format!("Invalid composition id {}: {}", self.id, e)))?;

        Ok(Composition {
            id,
            title: self.title,
            sort_mode: self.sort_mode.parse().unwrap_or_default(),
            fragments,
            created_at: parse_timestamp(&self.created_at)?,
            modified_at: parse_timestamp(&self.modified_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FragmentRow {
    id: String,
    composition_id: String,
    highlight_id: String,
    sort_order: i64,
    created_at: String,
}
