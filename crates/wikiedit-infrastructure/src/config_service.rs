//! Configuration service implementation.
//!
//! Loads [`EditorConfig`] from `~/.config/wikiedit/config.toml` (or an
//! explicit path) and caches it. A missing file yields the defaults.

use crate::paths::WikieditPaths;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};
use wikiedit_core::config::EditorConfig;

/// Environment variable overriding `api.endpoint`.
pub const ENDPOINT_ENV: &str = "WIKIEDIT_API_ENDPOINT";

/// Configuration service that loads and caches the editor configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Loaded lazily on first access.
    config: Arc<RwLock<Option<EditorConfig>>>,
}

impl ConfigService {
    /// Uses the platform config file.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// A file that cannot be read or parsed is logged and replaced by the
    /// defaults.
    pub fn get_config(&self) -> EditorConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            EditorConfig::default()
        });
        let loaded = apply_env_overrides(loaded, |key| std::env::var(key).ok());

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    /// Path of the config file this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(WikieditPaths::config_file()?),
        }
    }

    /// Reads and parses the config file without touching the cache.
    pub fn load(&self) -> Result<EditorConfig> {
        let path = self.config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(EditorConfig::default());
        }
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        EditorConfig::from_toml(&source)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Writes `config` to the config file and refreshes the cache.
    pub fn save(&self, config: &EditorConfig) -> Result<()> {
        let path = self.config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(config.clone());
        Ok(())
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies environment overrides looked up through `lookup`.
pub fn apply_env_overrides(
    mut config: EditorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> EditorConfig {
    if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|e| !e.is_empty()) {
        debug!(%endpoint, "API endpoint overridden from environment");
        config.api.endpoint = endpoint;
    }
    config
}
