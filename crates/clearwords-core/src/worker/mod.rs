//! The background worker: fetch interception and cache lifecycle.
//!
//! `ServiceWorker` decides, for every intercepted request, whether to serve
//! from a named cache, the network, or a synthesized fallback:
//!
//! - data requests (`/data/` paths and `.json` files) are network-first
//! - everything else is cache-first with a background refresh
//! - non-GET and extension requests pass through untouched
//!
//! It also owns the cache generations (install populates the static cache,
//! activation evicts stale generations) and answers the background sync,
//! push and notification click callbacks.
//!
//! Cache writes and background refreshes are spawned and never awaited by
//! the response path. `wait_until_idle` waits for them to settle.

pub mod events;
pub mod lifecycle;
pub mod policy;
pub mod router;

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::cache::{CacheError, CacheNames, CacheStorage};
use crate::models::{Request, Response};
use crate::network::Fetcher;

pub use events::{ClickAction, Notification, NotificationAction, WindowClient};
pub use lifecycle::ActivationReport;
pub use router::{Route, Rule, RULES};

/// App shell fetched into the static cache on install
pub const STATIC_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/app.css",
    "/app.js",
    "/logo.png",
    "/manifest.json",
    "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&display=swap",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Only an active worker intercepts fetches
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Install failed: {0}")]
    Install(#[source] CacheError),

    #[error("Activation failed: {0}")]
    Activate(#[source] CacheError),

    #[error("Cannot {action} a worker that is {state}")]
    InvalidState {
        action: &'static str,
        state: WorkerState,
    },

    #[error("Invalid manifest entry: {0}")]
    Manifest(String),
}

/// Where an intercepted response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Synthesized offline placeholder
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The worker did not intercept; the caller fetches as usual
    Passthrough,
    Respond {
        response: Response,
        source: ResponseSource,
    },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Respond { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Respond { source, .. } => Some(*source),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub cache_names: CacheNames,
    pub static_assets: Vec<String>,
}

impl WorkerConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_names: CacheNames::default(),
            static_assets: STATIC_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub struct ServiceWorker {
    config: WorkerConfig,
    storage: CacheStorage,
    fetcher: Arc<dyn Fetcher>,
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
    tasks: TaskTracker,
}

impl ServiceWorker {
    /// A freshly registered worker, waiting for install
    pub fn new(config: WorkerConfig, storage: CacheStorage, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            storage,
            fetcher,
            state: WorkerState::Parsed,
            skip_waiting: false,
            clients_claimed: false,
            tasks: TaskTracker::new(),
        }
    }

    /// A worker that was installed and activated in an earlier run and is
    /// being restarted to handle events.
    pub fn restore(config: WorkerConfig, storage: CacheStorage, fetcher: Arc<dyn Fetcher>) -> Self {
        let mut worker = Self::new(config, storage, fetcher);
        worker.state = WorkerState::Activated;
        worker
    }

    /// A worker whose install already completed in an earlier run, waiting
    /// to activate.
    pub fn installed(config: WorkerConfig, storage: CacheStorage, fetcher: Arc<dyn Fetcher>) -> Self {
        let mut worker = Self::new(config, storage, fetcher);
        worker.state = WorkerState::Installed;
        worker
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Whether install asked to replace the previous worker immediately
    pub fn skipped_waiting(&self) -> bool {
        self.skip_waiting
    }

    /// Whether activation took control of already-open pages
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed
    }

    /// Intercept a request.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        if !self.state.can_intercept_fetch() {
            return FetchOutcome::Passthrough;
        }

        let rule = router::matching_rule(&request);
        debug!(url = %request.url, rule = rule.name, "Routing request");

        let (response, source) = match rule.route {
            Route::Passthrough => return FetchOutcome::Passthrough,
            Route::Data => self.network_first(request).await,
            Route::Static => self.cache_first(request).await,
        };
        FetchOutcome::Respond { response, source }
    }

    /// Wait for spawned cache writes and background refreshes to finish
    pub async fn wait_until_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::cache::DATA_CACHE;
    use reqwest::Method;

    #[tokio::test]
    async fn test_new_worker_does_not_intercept() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("/app.css", Response::ok("css"));
        let worker = ServiceWorker::new(WorkerConfig::new(origin()), CacheStorage::in_memory(), fetcher.clone());

        assert_eq!(worker.state(), WorkerState::Parsed);
        assert_eq!(worker.handle_fetch(request("/app.css")).await, FetchOutcome::Passthrough);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_post_passes_through_without_cache_access() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let worker = worker(fetcher.clone());
        let data = worker.storage().open(DATA_CACHE).await.unwrap();
        data.put(&request("/data/es.json"), Response::ok("cached")).await.unwrap();

        let post = Request::new(Method::POST, request("/data/es.json").url);
        assert_eq!(worker.handle_fetch(post).await, FetchOutcome::Passthrough);
        worker.wait_until_idle().await;

        assert!(fetcher.calls().is_empty());
        assert_eq!(data.len().await, 1);
        assert_eq!(worker.storage().keys().await, vec![DATA_CACHE]);
    }
}
