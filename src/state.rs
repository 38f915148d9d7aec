//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::compose::StyleConfig;
use crate::compositions::CompositionStore;
use crate::config::Config;
use crate::document::DocumentStore;
use crate::error::Result;
use crate::highlights::HighlightStore;
use crate::settings::{SettingsStore, SqliteSettingsSink};
use crate::spans::SpanRules;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    documents: DocumentStore,
    highlights: HighlightStore,
    compositions: CompositionStore,
    settings: SettingsStore,
    rules: SpanRules,
    fan_out: JoinHandle<()>,
}

impl AppState {
    /// Open every store over `db` and start the change fan-out
    pub async fn new(config: Config, db: SqlitePool) -> Result<Self> {
        let documents = DocumentStore::open(db.clone()).await?;
        let highlights = HighlightStore::open(db.clone()).await?;
        let compositions = CompositionStore::open(
            db.clone(),
            Arc::new(highlights.clone()),
            Arc::new(documents.clone()),
            config.render.snippet_max_len,
        )
        .await?;
        let settings = SettingsStore::open(
            Arc::new(SqliteSettingsSink::new(db.clone())),
            config.settings.debounce(),
        )
        .await?;

        let fan_out = spawn_fan_out(&documents, &highlights, compositions.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                documents,
                highlights,
                compositions,
                settings,
                rules: SpanRules::default(),
                fan_out,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.inner.documents
    }

    pub fn highlights(&self) -> &HighlightStore {
        &self.inner.highlights
    }

    pub fn compositions(&self) -> &CompositionStore {
        &self.inner.compositions
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.inner.settings
    }

    /// Link and indentation rules applied to every document
    pub fn rules(&self) -> &SpanRules {
        &self.inner.rules
    }

    /// Composer configuration for the current reader theme
    pub fn style(&self) -> StyleConfig {
        self.inner
            .settings
            .style_config(self.inner.config.render.highlight_alpha)
    }

    /// Delete a document; highlights and compositions are reloaded before
    /// returning so the cascade is visible to the next read
    pub async fn delete_document(&self, id: Uuid) -> Result<bool> {
        let deleted = self.inner.documents.delete(id).await?;
        if deleted {
            self.inner.highlights.reload().await?;
            self.inner.compositions.reload().await?;
        }
        Ok(deleted)
    }

    /// Remove every highlight of one document; compositions are reloaded
    /// before returning
    pub async fn clear_document_highlights(&self, document_id: Uuid) -> Result<u64> {
        let removed = self.inner.highlights.delete_for_document(document_id).await?;
        if removed > 0 {
            self.inner.compositions.reload().await?;
        }
        Ok(removed)
    }

    /// Remove every highlight of every document; compositions are reloaded
    /// before returning
    pub async fn clear_highlights(&self) -> Result<u64> {
        let removed = self.inner.highlights.clear_all().await?;
        self.inner.compositions.reload().await?;
        Ok(removed)
    }

    /// Stop background work and write pending settings
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down application state...");
        self.inner.fan_out.abort();
        self.inner.settings.flush_now().await
    }
}

/// Re-resolve compositions whenever highlights or documents change
fn spawn_fan_out(
    documents: &DocumentStore,
    highlights: &HighlightStore,
    compositions: CompositionStore,
) -> JoinHandle<()> {
    let mut document_changes = documents.subscribe();
    let mut highlight_changes = highlights.subscribe();

    tokio::spawn(async move {
        loop {
            let changed = tokio::select! {
                r = highlight_changes.changed() => r,
                r = document_changes.changed() => r,
            };
            if changed.is_err() {
                break;
            }
            if let Err(e) = compositions.reload().await {
                tracing::error!("Failed to reload compositions: {}", e);
            }
        }
        tracing::debug!("composition fan-out stopped");
    })
}

#[cfg(test)]
pub(crate) async fn test_state() -> AppState {
    let pool = crate::db::memory_pool().await;
    AppState::new(Config::default(), pool).await.unwrap()
}
