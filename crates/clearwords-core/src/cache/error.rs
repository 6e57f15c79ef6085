use thiserror::Error;

use crate::network::FetchError;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache file could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Bad response status for {url}: {status}")]
    BadStatus { url: String, status: u16 },
}
