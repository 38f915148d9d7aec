//! Configuration management for Folio

use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::compose::DEFAULT_HIGHLIGHT_ALPHA;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub render: RenderConfig,
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Maximum characters of a fragment snippet before truncation
    pub snippet_max_len: usize,
    /// Alpha over highlight colors in rendered documents
    pub highlight_alpha: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    pub debounce_ms: u64,
}

impl SettingsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// A variable was present but couldn't be parsed
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./folio.db".to_string(),
            },
            render: RenderConfig {
                snippet_max_len: 200,
                highlight_alpha: DEFAULT_HIGHLIGHT_ALPHA,
            },
            settings: SettingsConfig { debounce_ms: 300 },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parsed("SERVER_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            render: RenderConfig {
                snippet_max_len: parsed("SNIPPET_MAX_LEN", defaults.render.snippet_max_len)?,
                highlight_alpha: parsed("HIGHLIGHT_ALPHA", defaults.render.highlight_alpha)?,
            },
            settings: SettingsConfig {
                debounce_ms: parsed("SETTINGS_DEBOUNCE_MS", defaults.settings.debounce_ms)?,
            },
        })
    }
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError { name, value }),
        Err(_) => Ok(default),
    }
}
