//! Named response caches for offline access.
//!
//! This module provides `CacheStorage`, the origin-wide set of named
//! caches, and `Cache`, a handle to one of them. Entries are keyed by
//! request identity (method + URL) and hold the complete captured response.
//!
//! Storage is either purely in memory or backed by a directory, in which
//! case every named cache is persisted as one JSON file and reloaded on
//! the next start.
//!
//! Cache generations are distinguished by a version suffix:
//! - `clearwords-static-v1.0.0`: app shell assets
//! - `clearwords-data-v1.0.0`: curriculum JSON and other data responses
//! - `clearwords-v1.0.0`: legacy umbrella name, kept but never written

pub mod entry;
pub mod error;
pub mod storage;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use storage::{Cache, CacheStorage, CacheSummary};

/// Version suffix shared by every cache generation
pub const CACHE_VERSION: &str = "v1.0.0";

/// Legacy umbrella cache, protected from eviction but never written
pub const CACHE_NAME: &str = "clearwords-v1.0.0";

/// App shell assets (cache-first)
pub const STATIC_CACHE: &str = "clearwords-static-v1.0.0";

/// Data and curriculum responses (network-first)
pub const DATA_CACHE: &str = "clearwords-data-v1.0.0";

/// The cache names that survive an activation sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub static_assets: String,
    pub data: String,
    pub legacy: String,
}

impl CacheNames {
    /// Names for a given version suffix, e.g. `v1.0.0`
    pub fn for_version(version: &str) -> Self {
        Self {
            static_assets: format!("clearwords-static-{}", version),
            data: format!("clearwords-data-{}", version),
            legacy: format!("clearwords-{}", version),
        }
    }

    pub fn is_recognized(&self, name: &str) -> bool {
        name == self.static_assets || name == self.data || name == self.legacy
    }
}

impl Default for CacheNames {
    fn default() -> Self {
        Self::for_version(CACHE_VERSION)
    }
}
