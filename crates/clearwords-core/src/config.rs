//! Application configuration management.
//!
//! This module handles loading the runtime configuration: the app origin,
//! an optional cache directory override, and the curriculum file for each
//! language.
//!
//! Configuration is stored at `~/.config/clearwords/config.json`.
//! `CLEARWORDS_ORIGIN` in the environment (or a `.env` file) overrides the
//! origin.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "clearwords";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured origin
pub const ORIGIN_ENV: &str = "CLEARWORDS_ORIGIN";

const DEFAULT_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Curriculum file name under `/data/`
    pub json_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageConfig>,
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_dir: None,
            languages: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(origin) = std::env::var(ORIGIN_ENV) {
            config.origin = origin;
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin).with_context(|| format!("Invalid origin: {}", self.origin))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
