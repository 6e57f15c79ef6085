use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{Request, RequestKey, Response};
use crate::network::Fetcher;

use super::{CacheEntry, CacheError};

/// On-disk layout of one named cache
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedCache {
    name: String,
    created_at: DateTime<Utc>,
    entries: Vec<CacheEntry>,
}

impl NamedCache {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    fn find(&self, key: &RequestKey) -> Option<&CacheEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    /// Insert or overwrite. Overwrites keep the entry's position.
    fn upsert(&mut self, entry: CacheEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

struct StorageState {
    caches: Vec<NamedCache>,
    dir: Option<PathBuf>,
}

impl StorageState {
    fn get(&self, name: &str) -> Option<&NamedCache> {
        self.caches.iter().find(|c| c.name == name)
    }

    /// Write a cache to disk, then make it the current copy. A failed write
    /// leaves the in-memory cache untouched.
    fn commit(&mut self, cache: NamedCache) -> Result<(), CacheError> {
        if let Some(dir) = &self.dir {
            let contents = serde_json::to_string_pretty(&cache)?;
            std::fs::write(cache_path(dir, &cache.name), contents)?;
        }
        match self.caches.iter_mut().find(|c| c.name == cache.name) {
            Some(existing) => *existing = cache,
            None => self.caches.push(cache),
        }
        Ok(())
    }

    /// Copy of a cache to modify before committing it
    fn working_copy(&self, name: &str) -> NamedCache {
        self.get(name).cloned().unwrap_or_else(|| NamedCache::new(name))
    }
}

fn cache_path(dir: &Path, name: &str) -> PathBuf {
    let file: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    dir.join(format!("{}.json", file))
}

/// Entry count and freshness of one named cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSummary {
    pub name: String,
    pub entries: usize,
    pub newest: Option<DateTime<Utc>>,
}

/// The origin's set of named caches.
/// Clone is cheap and every clone sees the same caches.
#[derive(Clone)]
pub struct CacheStorage {
    state: Arc<RwLock<StorageState>>,
}

impl CacheStorage {
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(StorageState {
                caches: Vec::new(),
                dir: None,
            })),
        }
    }

    /// Open a directory-backed storage, loading every cache file found in it.
    /// Unreadable cache files are skipped with a warning.
    pub fn open_dir(dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&dir)?;

        let mut caches = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let loaded = std::fs::read_to_string(&path)
                .map_err(CacheError::from)
                .and_then(|contents| serde_json::from_str::<NamedCache>(&contents).map_err(CacheError::from));
            match loaded {
                Ok(cache) => {
                    debug!(cache = %cache.name, entries = cache.entries.len(), "Loaded cache from disk");
                    caches.push(cache);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable cache file"),
            }
        }
        caches.sort_by_key(|c| c.created_at);

        Ok(Self {
            state: Arc::new(RwLock::new(StorageState {
                caches,
                dir: Some(dir),
            })),
        })
    }

    /// Open a named cache, creating it if needed
    pub async fn open(&self, name: &str) -> Result<Cache, CacheError> {
        let mut state = self.state.write().await;
        if state.get(name).is_none() {
            state.commit(NamedCache::new(name))?;
        }
        Ok(Cache {
            name: name.to_string(),
            storage: self.clone(),
        })
    }

    pub async fn has(&self, name: &str) -> bool {
        self.state.read().await.get(name).is_some()
    }

    /// All cache names in creation order
    pub async fn keys(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .caches
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Delete a named cache. Returns whether it existed.
    pub async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let mut state = self.state.write().await;
        let before = state.caches.len();
        state.caches.retain(|c| c.name != name);
        let existed = state.caches.len() != before;

        if existed {
            if let Some(ref dir) = state.dir {
                let path = cache_path(dir, name);
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }
        Ok(existed)
    }

    /// Look a request up in every cache, oldest cache first
    pub async fn match_any(&self, request: &Request) -> Option<Response> {
        let key = request.key();
        let state = self.state.read().await;
        state
            .caches
            .iter()
            .find_map(|c| c.find(&key))
            .map(|e| e.response.clone())
    }

    pub async fn summary(&self) -> Vec<CacheSummary> {
        self.state
            .read()
            .await
            .caches
            .iter()
            .map(|c| CacheSummary {
                name: c.name.clone(),
                entries: c.entries.len(),
                newest: c.entries.iter().map(|e| e.cached_at).max(),
            })
            .collect()
    }
}

/// Handle to one named cache.
#[derive(Clone)]
pub struct Cache {
    name: String,
    storage: CacheStorage,
}

impl Cache {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn match_request(&self, request: &Request) -> Option<Response> {
        self.match_entry(request).await.map(|e| e.response)
    }

    pub async fn match_entry(&self, request: &Request) -> Option<CacheEntry> {
        let key = request.key();
        let state = self.storage.state.read().await;
        state.get(&self.name).and_then(|c| c.find(&key)).cloned()
    }

    /// Store a response, replacing any entry with the same key
    pub async fn put(&self, request: &Request, response: Response) -> Result<(), CacheError> {
        self.put_all(vec![(request.key(), response)]).await
    }

    /// Store several responses under one write lock and one disk write
    pub async fn put_all(&self, entries: Vec<(RequestKey, Response)>) -> Result<(), CacheError> {
        let mut state = self.storage.state.write().await;
        let mut cache = state.working_copy(&self.name);
        for (key, response) in entries {
            cache.upsert(CacheEntry::new(key, response));
        }
        state.commit(cache)
    }

    pub async fn delete(&self, request: &Request) -> Result<bool, CacheError> {
        let key = request.key();
        let mut state = self.storage.state.write().await;
        let Some(mut cache) = state.get(&self.name).cloned() else {
            return Ok(false);
        };
        let before = cache.entries.len();
        cache.entries.retain(|e| e.key != key);
        if cache.entries.len() == before {
            return Ok(false);
        }
        state.commit(cache)?;
        Ok(true)
    }

    pub async fn keys(&self) -> Vec<RequestKey> {
        let state = self.storage.state.read().await;
        state
            .get(&self.name)
            .map(|c| c.entries.iter().map(|e| e.key.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        let state = self.storage.state.read().await;
        state.get(&self.name).map(|c| c.entries.len()).unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Fetch every request and store all responses, or store nothing.
    ///
    /// Fails on the first request that cannot be fetched or whose status is
    /// not 2xx; in that case no entry is written.
    pub async fn add_all(&self, requests: &[Request], fetcher: &dyn Fetcher) -> Result<(), CacheError> {
        let fetches = requests.iter().map(|request| async move {
            let url = request.url.to_string();
            let response = fetcher
                .fetch(request)
                .await
                .map_err(|source| CacheError::Fetch { url: url.clone(), source })?;
            if !response.is_ok() {
                return Err(CacheError::BadStatus {
                    url,
                    status: response.status,
                });
            }
            Ok((request.key(), response))
        });

        let entries = try_join_all(fetches).await?;
        self.put_all(entries).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::FetchError;
    use async_trait::async_trait;
    use reqwest::Url;

    fn request(path: &str) -> Request {
        Request::resolve(&Url::parse("https://clearwords.app").unwrap(), path).unwrap()
    }

    struct PathFetcher;

    #[async_trait]
    impl Fetcher for PathFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            match request.url.path() {
                "/missing.png" => Ok(Response::new(404, "Not Found", "")),
                "/down" => Err(FetchError::Unreachable("offline".to_string())),
                path => Ok(Response::ok(path.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_open_put_match() {
        let storage = CacheStorage::in_memory();
        let cache = storage.open("a").await.unwrap();
        assert!(storage.has("a").await);

        cache.put(&request("/app.css"), Response::ok("css")).await.unwrap();
        let hit = cache.match_request(&request("/app.css")).await.unwrap();
        assert_eq!(hit.text(), "css");
        assert!(cache.match_request(&request("/app.js")).await.is_none());

        // Overwrite keeps one entry
        cache.put(&request("/app.css"), Response::ok("css2")).await.unwrap();
        assert_eq!(cache.len().await, 1);
        assert_eq!(storage.match_any(&request("/app.css")).await.unwrap().text(), "css2");
    }

    #[tokio::test]
    async fn test_match_any_searches_oldest_cache_first() {
        let storage = CacheStorage::in_memory();
        let first = storage.open("first").await.unwrap();
        let second = storage.open("second").await.unwrap();
        second.put(&request("/"), Response::ok("second")).await.unwrap();
        first.put(&request("/"), Response::ok("first")).await.unwrap();

        assert_eq!(storage.match_any(&request("/")).await.unwrap().text(), "first");
        assert_eq!(storage.keys().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_delete_cache_and_entry() {
        let storage = CacheStorage::in_memory();
        let cache = storage.open("a").await.unwrap();
        cache.put(&request("/x"), Response::ok("x")).await.unwrap();

        assert!(cache.delete(&request("/x")).await.unwrap());
        assert!(!cache.delete(&request("/x")).await.unwrap());

        assert!(storage.delete("a").await.unwrap());
        assert!(!storage.delete("a").await.unwrap());
        assert!(storage.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_all_stores_everything() {
        let storage = CacheStorage::in_memory();
        let cache = storage.open("static").await.unwrap();
        let requests = vec![request("/"), request("/app.js")];

        cache.add_all(&requests, &PathFetcher).await.unwrap();
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.keys().await[1].url, "https://clearwords.app/app.js");
    }

    #[tokio::test]
    async fn test_add_all_is_all_or_nothing() {
        let storage = CacheStorage::in_memory();
        let cache = storage.open("static").await.unwrap();

        let with_404 = vec![request("/"), request("/missing.png"), request("/app.js")];
        let err = cache.add_all(&with_404, &PathFetcher).await.unwrap_err();
        assert!(matches!(err, CacheError::BadStatus { status: 404, .. }));
        assert!(cache.is_empty().await);

        let with_failure = vec![request("/"), request("/down")];
        let err = cache.add_all(&with_failure, &PathFetcher).await.unwrap_err();
        assert!(matches!(err, CacheError::Fetch { .. }));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_disk_write_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("caches");
        let storage = CacheStorage::open_dir(root.clone()).unwrap();
        let cache = storage.open("static").await.unwrap();
        cache.put(&request("/logo.png"), Response::ok("png")).await.unwrap();

        std::fs::remove_dir_all(&root).unwrap();

        let err = cache
            .add_all(&[request("/"), request("/app.js")], &PathFetcher)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
        assert_eq!(cache.len().await, 1);
        assert!(cache.match_request(&request("/app.js")).await.is_none());

        assert!(cache.delete(&request("/logo.png")).await.is_err());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_directory_storage_reloads() {
        let dir = tempfile::tempdir().unwrap();

        {
            let storage = CacheStorage::open_dir(dir.path().to_path_buf()).unwrap();
            let data = storage.open("clearwords-data-v1.0.0").await.unwrap();
            data.put(&request("/data/es.json"), Response::ok(r#"{"lessons":[]}"#))
                .await
                .unwrap();
            storage.open("old-cache").await.unwrap();
            storage.delete("old-cache").await.unwrap();
        }

        let storage = CacheStorage::open_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(storage.keys().await, vec!["clearwords-data-v1.0.0"]);
        let hit = storage.match_any(&request("/data/es.json")).await.unwrap();
        assert_eq!(hit.text(), r#"{"lessons":[]}"#);

        let summary = storage.summary().await;
        assert_eq!(summary[0].entries, 1);
        assert!(summary[0].newest.is_some());
    }

    #[tokio::test]
    async fn test_unreadable_cache_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "not json").unwrap();

        let storage = CacheStorage::open_dir(dir.path().to_path_buf()).unwrap();
        assert!(storage.keys().await.is_empty());
    }
}
