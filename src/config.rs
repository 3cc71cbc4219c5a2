//! Configuration for the practicum system
//!
//! Layered with the `config` crate, highest precedence last:
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>`, else `<config_dir>/practicum/config.toml` if present)
//! 3. Environment variables (`PRACTICUM_` prefix, `__` between sections,
//!    e.g. `PRACTICUM_GEMINI__API_KEY`)
//!
//! The plain `GEMINI_API_KEY` variable is honoured when no key was set
//! through the layers above. A missing key is not an error here.

use crate::error::Result;
use crate::services::llm::LlmConfig;
use crate::storage::libsql::ConnectionMode;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub gemini: GeminiSettings,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the document store lives
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Local database file; defaults to the platform data dir
    pub path: Option<String>,

    /// Remote libSQL endpoint; takes precedence over `path` when set
    pub url: Option<String>,
    pub token: Option<String>,
}

/// Generative-text service settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Default database path under the platform data dir
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("practicum")
        .join("practicum.db")
}

impl AppConfig {
    /// User-level config file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("practicum").join("config.toml"))
    }

    /// Load configuration from defaults, file and environment
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("gemini.model", DEFAULT_MODEL)?
            .set_default("gemini.base_url", DEFAULT_BASE_URL)?
            .set_default("log_level", "info")?;

        match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_config_path() {
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("PRACTICUM")
                .prefix_separator("_")
                .separator("__"),
        );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        if config.gemini.api_key.as_deref().map_or(true, str::is_empty) {
            config.gemini.api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        }

        Ok(config)
    }

    /// Store connection derived from the database section
    pub fn connection_mode(&self) -> ConnectionMode {
        match (&self.database.url, &self.database.token) {
            (Some(url), token) => ConnectionMode::Remote {
                url: url.clone(),
                token: token.clone().unwrap_or_default(),
            },
            (None, _) => ConnectionMode::Local(
                self.database
                    .path
                    .clone()
                    .unwrap_or_else(|| default_db_path().to_string_lossy().into_owned()),
            ),
        }
    }

    /// Client configuration, or `None` when no credential is configured
    pub fn llm_config(&self) -> Option<LlmConfig> {
        let api_key = self.gemini.api_key.clone().filter(|k| !k.is_empty())?;
        Some(LlmConfig {
            api_key,
            model: self.gemini.model.clone(),
            base_url: self.gemini.base_url.clone(),
        })
    }
}
