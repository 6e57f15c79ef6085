//! Network access for the worker.
//!
//! The worker never talks to reqwest directly. Every network call goes
//! through the `Fetcher` trait so the caching policies can be driven by
//! the real `HttpFetcher` or by a scripted fetcher in tests.

pub mod error;
pub mod fetcher;

pub use error::FetchError;
pub use fetcher::{Fetcher, HttpFetcher};
