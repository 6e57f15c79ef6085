//! The two caching policies behind `ServiceWorker::handle_fetch`.
//!
//! Data requests are network-first: the freshest server state wins when the
//! network is reachable and a previously seen copy is served when it isn't.
//! Static assets are cache-first: a cached copy is returned immediately and
//! the network is only used to keep the cache warm for the next load.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::cache::CacheStorage;
use crate::models::{Request, Response};
use crate::network::{FetchError, Fetcher};

use super::{ResponseSource, ServiceWorker};

/// Body of the synthesized data-path offline response
pub const OFFLINE_ERROR: &str = "Network error";
pub const OFFLINE_MESSAGE: &str = "You are offline. Please check your connection.";

/// Body of the synthesized static-path 503
pub const OFFLINE_UNAVAILABLE: &str = "Offline - Content not available";

/// JSON placeholder for data requests with no network and no cached copy.
///
/// The status stays 200: callers recognize the fallback by its body shape.
pub fn offline_json() -> Response {
    Response::json(&json!({
        "error": OFFLINE_ERROR,
        "message": OFFLINE_MESSAGE,
    }))
}

/// Plain-text placeholder for HTML navigations when the root document is
/// not cached either
pub fn offline_page() -> Response {
    Response::ok(OFFLINE_MESSAGE)
}

pub fn service_unavailable() -> Response {
    Response::new(503, "Service Unavailable", OFFLINE_UNAVAILABLE)
}

impl ServiceWorker {
    /// Network-first policy for data requests
    pub(crate) async fn network_first(&self, request: Request) -> (Response, ResponseSource) {
        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                self.store_in_background(&self.config.cache_names.data, request, response.clone());
                (response, ResponseSource::Network)
            }
            Err(e) => {
                debug!(url = %FetchError::truncate_url(request.url.as_str()), error = %e, "Data fetch failed, trying cache");
                match self.storage.match_any(&request).await {
                    Some(cached) => (cached, ResponseSource::Cache),
                    None => (offline_json(), ResponseSource::Fallback),
                }
            }
        }
    }

    /// Cache-first policy for static assets
    pub(crate) async fn cache_first(&self, request: Request) -> (Response, ResponseSource) {
        if let Some(cached) = self.storage.match_any(&request).await {
            self.refresh_in_background(request);
            return (cached, ResponseSource::Cache);
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_in_background(
                        &self.config.cache_names.static_assets,
                        request,
                        response.clone(),
                    );
                }
                (response, ResponseSource::Network)
            }
            Err(e) => {
                warn!(url = %FetchError::truncate_url(request.url.as_str()), error = %e, "Fetch failed");
                self.static_fallback(&request).await
            }
        }
    }

    async fn static_fallback(&self, request: &Request) -> (Response, ResponseSource) {
        if request.accepts_html() {
            if let Ok(root) = Request::resolve(&self.config.origin, "/") {
                if let Some(index) = self.storage.match_any(&root).await {
                    return (index, ResponseSource::Cache);
                }
            }
            return (offline_page(), ResponseSource::Fallback);
        }
        (service_unavailable(), ResponseSource::Fallback)
    }

    /// Write a response into a named cache without holding up the caller.
    /// Failures are logged and dropped: the caller already has its response.
    fn store_in_background(&self, cache_name: &str, request: Request, response: Response) {
        let storage = self.storage.clone();
        let cache_name = cache_name.to_string();
        self.tasks.spawn(async move {
            if let Err(e) = store(&storage, &cache_name, &request, response).await {
                warn!(cache = %cache_name, url = %request.url, error = %e, "Failed to cache response");
            }
        });
    }

    /// Re-fetch a cached static asset and overwrite the static cache entry if
    /// the fresh response is cacheable. Errors are swallowed.
    fn refresh_in_background(&self, request: Request) {
        let storage = self.storage.clone();
        let fetcher: Arc<dyn Fetcher> = Arc::clone(&self.fetcher);
        let cache_name = self.config.cache_names.static_assets.clone();
        self.tasks.spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    if let Err(e) = store(&storage, &cache_name, &request, response).await {
                        debug!(url = %request.url, error = %e, "Background refresh could not be stored");
                    }
                }
                Ok(response) => {
                    debug!(url = %request.url, status = response.status, "Background refresh not cacheable");
                }
                Err(e) => {
                    debug!(url = %request.url, error = %e, "Background refresh failed");
                }
            }
        });
    }
}

async fn store(
    storage: &CacheStorage,
    cache_name: &str,
    request: &Request,
    response: Response,
) -> Result<(), crate::cache::CacheError> {
    storage.open(cache_name).await?.put(request, response).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Semaphore;

    use super::*;
    use crate::cache::{DATA_CACHE, STATIC_CACHE};
    use crate::models::ResponseType;
    use crate::worker::testing::*;
    use crate::worker::FetchOutcome;

    fn respond(outcome: FetchOutcome) -> (Response, ResponseSource) {
        match outcome {
            FetchOutcome::Respond { response, source } => (response, source),
            FetchOutcome::Passthrough => panic!("expected the worker to respond"),
        }
    }

    // -------------------------------------------------------------------------
    // Data policy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_data_success_is_returned_and_cached() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let fresh = Response::json(&json!({"lessons": [1, 2]}));
        fetcher.serve("/data/spanish.json", fresh.clone());
        let worker = worker(fetcher);

        let (response, source) = respond(worker.handle_fetch(request("/data/spanish.json")).await);
        assert_eq!(response, fresh);
        assert_eq!(source, ResponseSource::Network);

        worker.wait_until_idle().await;
        let data = worker.storage().open(DATA_CACHE).await.unwrap();
        assert_eq!(data.match_request(&request("/data/spanish.json")).await, Some(fresh));
        assert!(!worker.storage().has(STATIC_CACHE).await);
    }

    #[tokio::test]
    async fn test_data_error_status_is_still_cached() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("/data/missing.json", Response::new(404, "Not Found", ""));
        let worker = worker(fetcher);

        let (response, source) = respond(worker.handle_fetch(request("/data/missing.json")).await);
        assert_eq!(response.status, 404);
        assert_eq!(source, ResponseSource::Network);

        worker.wait_until_idle().await;
        let data = worker.storage().open(DATA_CACHE).await.unwrap();
        assert_eq!(data.len().await, 1);
    }

    #[tokio::test]
    async fn test_data_offline_serves_cached_copy() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("/data/spanish.json", Response::ok("v1"));
        let worker = worker(fetcher.clone());

        worker.handle_fetch(request("/data/spanish.json")).await;
        worker.wait_until_idle().await;

        fetcher.set_offline(true);
        let (response, source) = respond(worker.handle_fetch(request("/data/spanish.json")).await);
        assert_eq!(response.text(), "v1");
        assert_eq!(source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_data_offline_without_cache_synthesizes_json() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_offline(true);
        let worker = worker(fetcher);

        let (response, source) = respond(worker.handle_fetch(request("/data/french.json")).await);
        assert_eq!(source, ResponseSource::Fallback);
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("Content-Type"), Some("application/json"));
        assert_eq!(
            response.text(),
            r#"{"error":"Network error","message":"You are offline. Please check your connection."}"#
        );

        worker.wait_until_idle().await;
        assert!(worker.storage().keys().await.is_empty());
    }

    // -------------------------------------------------------------------------
    // Static policy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_static_miss_fetches_and_caches() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("/app.css", Response::ok("body{}"));
        let worker = worker(fetcher);

        let (response, source) = respond(worker.handle_fetch(request("/app.css")).await);
        assert_eq!(response.text(), "body{}");
        assert_eq!(source, ResponseSource::Network);

        worker.wait_until_idle().await;
        let cache = worker.storage().open(STATIC_CACHE).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_static_uncacheable_responses_are_returned_uncached() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("/gone.png", Response::new(404, "Not Found", ""));
        fetcher.serve(
            "https://fonts.googleapis.com/css2?family=Inter",
            Response::ok("@font-face{}").with_kind(ResponseType::Cors),
        );
        let worker = worker(fetcher);

        let (missing, _) = respond(worker.handle_fetch(request("/gone.png")).await);
        assert_eq!(missing.status, 404);
        let (font, _) = respond(
            worker
                .handle_fetch(request("https://fonts.googleapis.com/css2?family=Inter"))
                .await,
        );
        assert_eq!(font.kind, ResponseType::Cors);

        worker.wait_until_idle().await;
        assert!(worker.storage().keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_static_hit_returns_before_background_fetch_completes() {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Arc::new(ScriptedFetcher::gated(gate.clone()));
        fetcher.serve("/app.js", Response::ok("fresh"));
        let worker = worker(fetcher.clone());

        let cache = worker.storage().open(STATIC_CACHE).await.unwrap();
        cache.put(&request("/app.js"), Response::ok("stale")).await.unwrap();

        // The gate is closed, so any awaited network call would hang the test
        let outcome = tokio::time::timeout(Duration::from_secs(5), worker.handle_fetch(request("/app.js")))
            .await
            .expect("cached response must not wait on the network");
        let (response, source) = respond(outcome);
        assert_eq!(response.text(), "stale");
        assert_eq!(source, ResponseSource::Cache);

        gate.close();
        worker.wait_until_idle().await;
        assert_eq!(fetcher.calls(), vec!["https://clearwords.app/app.js"]);
        assert_eq!(cache.match_request(&request("/app.js")).await.unwrap().text(), "fresh");
    }

    #[tokio::test]
    async fn test_static_background_refresh_ignores_failures() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("/logo.png", Response::new(500, "Internal Server Error", "oops"));
        let worker = worker(fetcher.clone());

        let cache = worker.storage().open(STATIC_CACHE).await.unwrap();
        cache.put(&request("/logo.png"), Response::ok("png")).await.unwrap();
        cache.put(&request("/app.css"), Response::ok("css")).await.unwrap();

        let (logo, _) = respond(worker.handle_fetch(request("/logo.png")).await);
        assert_eq!(logo.text(), "png");

        // Unknown URL: the scripted fetcher rejects
        let (css, _) = respond(worker.handle_fetch(request("/app.css")).await);
        assert_eq!(css.text(), "css");

        worker.wait_until_idle().await;
        assert_eq!(cache.match_request(&request("/logo.png")).await.unwrap().text(), "png");
        assert_eq!(cache.match_request(&request("/app.css")).await.unwrap().text(), "css");
    }

    #[tokio::test]
    async fn test_static_offline_html_serves_cached_root() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_offline(true);
        let worker = worker(fetcher);
        let cache = worker.storage().open(STATIC_CACHE).await.unwrap();
        cache.put(&request("/"), Response::ok("<html>shell</html>")).await.unwrap();

        let navigation = request("/lessons/3").with_header("Accept", "text/html,application/xhtml+xml");
        let (response, source) = respond(worker.handle_fetch(navigation).await);
        assert_eq!(response.text(), "<html>shell</html>");
        assert_eq!(source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_static_offline_html_without_root_is_plain_text() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_offline(true);
        let worker = worker(fetcher);

        let navigation = request("/lessons/3").with_header("Accept", "text/html");
        let (response, source) = respond(worker.handle_fetch(navigation).await);
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), OFFLINE_MESSAGE);
        assert_eq!(source, ResponseSource::Fallback);
    }

    #[tokio::test]
    async fn test_static_offline_asset_is_503() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_offline(true);
        let worker = worker(fetcher);

        let (response, source) = respond(worker.handle_fetch(request("/img/owl.svg")).await);
        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.text(), OFFLINE_UNAVAILABLE);
        assert_eq!(source, ResponseSource::Fallback);
    }
}
