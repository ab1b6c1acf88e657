//! Store configuration loading
//!
//! Loads configuration from `~/.config/folio/store.toml` (or `FOLIO_STORE_CONFIG` env).
//!
//! ```toml
//! data_path = "~/.local/share/folio/store.json"
//! log_filter = "folio_doc_store=debug,info"
//!
//! [[projects]]
//! name = "Folio"
//! desc = "Personal site"
//! link = "https://example.com"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::document::{ProjectRecord, StoreDocument};
use crate::errors::ConfigError;

/// Root configuration for the document store
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Location of the JSON document; relative paths resolve against the CWD
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Replaces the built-in default project list when non-empty
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

fn default_data_path() -> String {
    "data/store.json".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            log_filter: default_log_filter(),
            projects: Vec::new(),
        }
    }
}

impl StoreConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "FOLIO_STORE_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "store.toml";

    /// Load configuration from file
    ///
    /// Resolution order:
    /// 1. `FOLIO_STORE_CONFIG` environment variable
    /// 2. `<config dir>/folio/store.toml`
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::resolve_config_path();

        if !path.exists() {
            tracing::info!(
                path = %path.display(),
                "store config not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let cfg: StoreConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|dir| dir.join("folio").join(Self::DEFAULT_CONFIG_FILENAME))
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.data_path.trim().is_empty() {
            return Err(ConfigError::Invalid("data_path must not be empty".to_string()));
        }

        if self
            .projects
            .iter()
            .any(|p| p.name().is_none_or(|name| name.trim().is_empty()))
        {
            tracing::warn!("configured default project without a name");
        }

        Ok(())
    }

    /// Data path with a leading `~/` expanded
    pub fn resolved_data_path(&self) -> PathBuf {
        let path = &self.data_path;
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }

    /// Canonical defaults: built-in document, with configured projects if any
    pub fn default_document(&self) -> StoreDocument {
        if self.projects.is_empty() {
            StoreDocument::default()
        } else {
            StoreDocument::with_projects(self.projects.clone())
        }
    }
}
