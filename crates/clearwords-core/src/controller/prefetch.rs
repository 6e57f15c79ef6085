//! User-initiated curriculum download into the data cache.

use std::collections::BTreeMap;

use reqwest::Url;
use tracing::{info, warn};

use crate::cache::{CacheNames, CacheStorage};
use crate::config::LanguageConfig;
use crate::models::Request;
use crate::network::Fetcher;

/// Fetch a language's curriculum and store it in the data cache so it is
/// available offline. Returns the cached path, or `None` if nothing was
/// cached. Failures are logged, never returned.
pub async fn cache_curriculum(
    storage: &CacheStorage,
    fetcher: &dyn Fetcher,
    origin: &Url,
    languages: &BTreeMap<String, LanguageConfig>,
    language: &str,
) -> Option<String> {
    let Some(config) = languages.get(language) else {
        warn!(language, "No curriculum configured for language");
        return None;
    };
    let path = format!("/data/{}", config.json_file);

    let request = match Request::resolve(origin, &path) {
        Ok(request) => request,
        Err(e) => {
            warn!(language, error = %e, "Curriculum caching failed");
            return None;
        }
    };

    let response = match fetcher.fetch(&request).await {
        Ok(response) if response.is_ok() => response,
        Ok(response) => {
            warn!(language, status = response.status, "Curriculum not available");
            return None;
        }
        Err(e) => {
            warn!(language, error = %e, "Curriculum caching failed");
            return None;
        }
    };

    let data_cache = CacheNames::default().data;
    let stored = match storage.open(&data_cache).await {
        Ok(cache) => cache.put(&request, response).await,
        Err(e) => Err(e),
    };
    match stored {
        Ok(()) => {
            info!(language, path = %path, "Cached curriculum");
            Some(path)
        }
        Err(e) => {
            warn!(language, error = %e, "Curriculum caching failed");
            None
        }
    }
}
