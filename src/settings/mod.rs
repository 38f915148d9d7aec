//! Reader settings
//!
//! The current value lives in memory and is published on a watch channel;
//! persistence goes through a [`SettingsSink`] behind a debounced writer so
//! bursts of changes (a slider being dragged) produce one write.

mod debounce;
mod theme;

pub use debounce::{DebouncedWriter, DEFAULT_DEBOUNCE};
pub use theme::{Theme, CUSTOM_THEME};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::watch;

use crate::compose::StyleConfig;
use crate::db::format_timestamp;
use crate::error::{AppError, Result};

const SETTINGS_KEY: &str = "reader";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderSettings {
    /// A preset name or [`CUSTOM_THEME`]
    pub selected_theme: String,
    pub custom_theme: Theme,
    pub use_page_layout: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            selected_theme: "System".to_string(),
            custom_theme: Theme::system(),
            use_page_layout: false,
        }
    }
}

impl ReaderSettings {
    /// Theme in effect; unknown preset names fall back to Light
    pub fn current_theme(&self) -> Theme {
        let mut theme = if self.selected_theme == CUSTOM_THEME {
            self.custom_theme.clone()
        } else {
            Theme::named(&self.selected_theme).unwrap_or_else(Theme::light)
        };
        theme.use_page_layout = self.use_page_layout;
        theme
    }

    pub fn available_themes() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Theme::presets().iter().map(|(n, _)| *n).collect();
        names.push(CUSTOM_THEME);
        names
    }

    pub fn style_config(&self, highlight_alpha: f32) -> StyleConfig {
        self.current_theme().style_config(highlight_alpha)
    }
}

/// Where settings are persisted
#[async_trait]
pub trait SettingsSink: Send + Sync + 'static {
    async fn load(&self) -> Result<Option<ReaderSettings>>;

    async fn save(&self, settings: &ReaderSettings) -> Result<()>;
}

/// Stores settings as one JSON row of the `settings` table
pub struct SqliteSettingsSink {
    pool: SqlitePool,
}

impl SqliteSettingsSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsSink for SqliteSettingsSink {
    async fn load(&self) -> Result<Option<ReaderSettings>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(SETTINGS_KEY)
            .fetch_optional(&self.pool)
            .await?;

        let Some((value,)) = row else {
            return Ok(None);
        };
        match serde_json::from_str(&value) {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable reader settings: {}", e);
                Ok(None)
            }
        }
    }

    async fn save(&self, settings: &ReaderSettings) -> Result<()> {
        let value = serde_json::to_string(settings)?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(SETTINGS_KEY)
        .bind(value)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<SettingsStoreInner>,
}

struct SettingsStoreInner {
    current: watch::Sender<Arc<ReaderSettings>>,
    writer: DebouncedWriter,
}

impl SettingsStore {
    /// Load persisted settings (or defaults) and set up the debounced writer
    pub async fn open(sink: Arc<dyn SettingsSink>, debounce: Duration) -> Result<Self> {
        let settings = sink.load().await?.unwrap_or_default();
        tracing::info!("Reader theme: {}", settings.selected_theme);
        let (current, _) = watch::channel(Arc::new(settings));

        Ok(Self {
            inner: Arc::new(SettingsStoreInner {
                current,
                writer: DebouncedWriter::new(sink, debounce),
            }),
        })
    }

    pub fn current(&self) -> ReaderSettings {
        self.inner.current.borrow().as_ref().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ReaderSettings>> {
        self.inner.current.subscribe()
    }

    /// Apply immediately in memory, persist after the quiet period
    pub async fn update(&self, settings: ReaderSettings) -> Result<()> {
        let known = settings.selected_theme == CUSTOM_THEME
            || Theme::named(&settings.selected_theme).is_some();
        if !known {
            return Err(AppError::BadRequest(format!(
                "Unknown theme: {}",
                settings.selected_theme
            )));
        }

        self.inner.current.send_replace(Arc::new(settings.clone()));
        self.inner.writer.schedule(settings).await;
        Ok(())
    }

    pub async fn reset(&self) -> Result<()> {
        self.update(ReaderSettings::default()).await
    }

    /// Write any pending change now, e.g. before exit
    pub async fn flush_now(&self) -> Result<()> {
        self.inner.writer.flush_now().await
    }

    pub fn style_config(&self, highlight_alpha: f32) -> StyleConfig {
        self.inner.current.borrow().style_config(highlight_alpha)
    }
}
