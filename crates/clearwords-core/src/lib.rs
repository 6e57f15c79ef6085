//! ClearWords Core - offline runtime for the ClearWords language app.
//!
//! This crate provides:
//! - Named response caches, in memory or persisted to a directory
//! - The background worker: request routing, caching policies, cache
//!   lifecycle, and sync/push callbacks
//! - The page controller: install prompt, connectivity banners, toasts,
//!   analytics queue and device listeners
//! - Configuration management

pub mod cache;
pub mod config;
pub mod controller;
pub mod models;
pub mod network;
pub mod worker;

pub use cache::{Cache, CacheStorage};
pub use config::Config;
pub use network::{FetchError, Fetcher, HttpFetcher};
pub use worker::{FetchOutcome, ServiceWorker, WorkerConfig};
