//! Page-side key/value storage.
//!
//! Mirrors the browser's local storage: string keys, string values, one
//! store per origin. Backed by a JSON file when a path is given.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Set to "true" once the user dismissed the install prompt
pub const INSTALL_DISMISSED_KEY: &str = "clearWordsInstallDismissed";

/// Epoch milliseconds of the last install prompt dismissal
pub const INSTALL_PROMPT_TIME_KEY: &str = "clearWordsInstallPromptTime";

/// Latest navigation timing snapshot
pub const PERF_METRICS_KEY: &str = "clearWordsPerfMetrics";

/// Queued analytics events (JSON array)
pub const ANALYTICS_KEY: &str = "clearWordsAnalytics";

#[derive(Debug, Default)]
pub struct LocalStorage {
    path: Option<PathBuf>,
    items: BTreeMap<String, String>,
}

impl LocalStorage {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store, loading existing items if the file exists
    pub fn open(path: PathBuf) -> Result<Self> {
        let items = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read local storage file")?;
            serde_json::from_str(&contents).context("Failed to parse local storage file")?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            items,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(|v| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.items.insert(key.to_string(), value.into());
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.items.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.items)?;
        std::fs::write(path, contents).context("Failed to write local storage file")?;
        Ok(())
    }
}
