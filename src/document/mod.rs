//! Documents
//!
//! A document is imported once (text already fetched by the caller) and is
//! then only renamed or deleted. Deleting a document cascades in SQLite to
//! its highlights and, through them, to composition fragments.

mod content;

pub use content::{Content, Emphasis, InlineSpan};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp};
use crate::error::{AppError, Result};

/// An imported document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Import request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    pub content: Content,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Read access to document content, as needed by compositions and editors
pub trait DocumentLookup: Send + Sync {
    fn document(&self, id: Uuid) -> Option<Arc<Document>>;
}

type DocumentSnapshot = HashMap<Uuid, Arc<Document>>;

/// Durable document store with an in-memory snapshot
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<DocumentStoreInner>,
}

struct DocumentStoreInner {
    pool: SqlitePool,
    write_lock: Mutex<()>,
    snapshot: watch::Sender<Arc<DocumentSnapshot>>,
}

impl DocumentStore {
    /// Open the store and load every document
    pub async fn open(pool: SqlitePool) -> Result<Self> {
        let documents = load_all(&mut *pool.acquire().await?).await?;
        tracing::info!("Loaded {} documents", documents.len());
        let (snapshot, _) = watch::channel(Arc::new(documents));

        Ok(Self {
            inner: Arc::new(DocumentStoreInner {
                pool,
                write_lock: Mutex::new(()),
                snapshot,
            }),
        })
    }

    /// All documents, oldest import first
    pub fn list(&self) -> Vec<Arc<Document>> {
        let snapshot = self.inner.snapshot.borrow().clone();
        let mut documents: Vec<Arc<Document>> = snapshot.values().cloned().collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        documents
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Document>> {
        self.inner.snapshot.borrow().get(&id).cloned()
    }

    /// Persist a new document
    pub async fn import(&self, new: NewDocument) -> Result<Arc<Document>> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("Document title must not be empty".to_string()));
        }

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: new.content,
            source_url: new.source_url,
            created_at: now,
            modified_at: now,
        };
        let spans_json = match &document.content {
            Content::Plain { .. } => None,
            Content::Styled { spans, .. } => Some(serde_json::to_string(spans)?),
        };

        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO document (id, title, content_kind, text, spans_json, source_url, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.id.to_string())
        .bind(&document.title)
        .bind(document.content.kind())
        .bind(document.content.text())
        .bind(spans_json)
        .bind(&document.source_url)
        .bind(format_timestamp(&document.created_at))
        .bind(format_timestamp(&document.modified_at))
        .execute(&mut *tx)
        .await?;
        let documents = load_all(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(document = %document.id, "imported document {:?}", document.title);
        self.publish(documents);
        self.get(document.id)
            .ok_or_else(|| AppError::Internal(format!("Document vanished after import: {}", document.id)))
    }

    /// Change a document's title
    pub async fn rename(&self, id: Uuid, title: &str) -> Result<Arc<Document>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("Document title must not be empty".to_string()));
        }

        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;
        let result = sqlx::query("UPDATE document SET title = ?, modified_at = ? WHERE id = ?")
            .bind(title)
            .bind(format_timestamp(&Utc::now()))
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Document not found: {}", id)));
        }
        let documents = load_all(&mut tx).await?;

        tx.commit().await?;
        self.publish(documents);
        self.get(id)
            .ok_or_else(|| AppError::NotFound(format!("Document not found: {}", id)))
    }

    /// Delete a document and, by cascade, its highlights and fragments.
    ///
    /// Returns whether a document was deleted.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let _guard = self.inner.write_lock.lock().await;
        let mut tx = self.inner.pool.begin().await?;
        let result = sqlx::query("DELETE FROM document WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        let documents = load_all(&mut tx).await?;

        tx.commit().await?;
        tracing::debug!(document = %id, "deleted document");
        self.publish(documents);
        Ok(true)
    }

    /// Receive a new snapshot after every committed change
    pub fn subscribe(&self) -> watch::Receiver<Arc<HashMap<Uuid, Arc<Document>>>> {
        self.inner.snapshot.subscribe()
    }

    fn publish(&self, documents: DocumentSnapshot) {
        self.inner.snapshot.send_replace(Arc::new(documents));
    }
}

impl DocumentLookup for DocumentStore {
    fn document(&self, id: Uuid) -> Option<Arc<Document>> {
        self.get(id)
    }
}

async fn load_all(conn: &mut SqliteConnection) -> Result<DocumentSnapshot> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT id, title, content_kind, text, spans_json, source_url, created_at, modified_at
        FROM document
        "#,
    )
    .fetch_all(conn)
    .await?;

    let mut documents = HashMap::with_capacity(rows.len());
    for row in rows {
        match row.into_document() {
            Ok(document) => {
                documents.insert(document.id, Arc::new(document));
            }
            Err(e) => tracing::warn!("Skipping unreadable document row: {}", e),
        }
    }
    Ok(documents)
}

/// Internal row type for SQLite queries
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    title: String,
    content_kind: String,
    text: String,
    spans_json: Option<String>,
    source_url: Option<String>,
    created_at: String,
    modified_at: String,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| AppError::Internal(format!("Invalid document id {}: {}", self.id, e)))?;

        let content = match (self.content_kind.as_str(), self.spans_json) {
            ("styled", Some(json)) => Content::Styled {
                text: self.text,
                spans: serde_json::from_str(&json)?,
            },
            _ => Content::Plain { text: self.text },
        };

        Ok(Document {
            id,
            title: self.title,
            content,
            source_url: self.source_url,
            created_at: parse_timestamp(&self.created_at)?,
            modified_at: parse_timestamp(&self.modified_at)?,
        })
    }
}
