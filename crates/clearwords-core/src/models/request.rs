use std::fmt;

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use super::Headers;
use crate::network::FetchError;

/// An outgoing request as seen by the worker's fetch interception.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Build a GET request for `target`, resolving relative paths against `origin`.
    /// Absolute URLs (e.g. third-party font stylesheets) are kept as-is.
    pub fn resolve(origin: &Url, target: &str) -> Result<Self, FetchError> {
        let url = origin
            .join(target)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", target, e)))?;
        Ok(Self::get(url))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Whether the `Accept` header asks for an HTML document.
    /// A missing header counts as "not HTML".
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get("accept")
            .map(|accept| accept.contains("text/html"))
            .unwrap_or(false)
    }

    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }

    pub fn key(&self) -> RequestKey {
        RequestKey {
            method: self.method.as_str().to_string(),
            url: self.url.as_str().to_string(),
        }
    }
}

/// Cache identity of a request: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://clearwords.app").unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let local = Request::resolve(&origin(), "/app.css").unwrap();
        assert_eq!(local.url.as_str(), "https://clearwords.app/app.css");
        assert!(local.is_same_origin(&origin()));

        let font = Request::resolve(&origin(), "https://fonts.googleapis.com/css2?family=Inter").unwrap();
        assert_eq!(font.url.host_str(), Some("fonts.googleapis.com"));
        assert!(!font.is_same_origin(&origin()));
    }

    #[test]
    fn test_accepts_html() {
        let plain = Request::resolve(&origin(), "/").unwrap();
        assert!(!plain.accepts_html());

        let html = plain
            .clone()
            .with_header("Accept", "text/html,application/xhtml+xml");
        assert!(html.accepts_html());
    }

    #[test]
    fn test_key_includes_method_and_url() {
        let get = Request::resolve(&origin(), "/data/es.json").unwrap();
        let post = Request::new(Method::POST, get.url.clone());
        assert_ne!(get.key(), post.key());
        assert_eq!(get.key().to_string(), "GET https://clearwords.app/data/es.json");
    }
}
