use thiserror::Error;

/// A fetch that never produced a response. HTTP error statuses are not
/// failures here: a 404 is still a response.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Network unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

/// Maximum length for a URL echoed into log fields
const MAX_LOGGED_URL_LENGTH: usize = 200;

impl FetchError {
    /// Truncate a URL so query-heavy requests don't flood the logs
    pub fn truncate_url(url: &str) -> String {
        if url.len() <= MAX_LOGGED_URL_LENGTH {
            url.to_string()
        } else {
            let cut: String = url.chars().take(MAX_LOGGED_URL_LENGTH).collect();
            format!("{}... ({} total bytes)", cut, url.len())
        }
    }
}
