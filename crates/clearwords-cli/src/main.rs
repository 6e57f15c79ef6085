//! ClearWords CLI - drive the offline worker from the command line.
//!
//! Runs the worker lifecycle against the configured origin and keeps the
//! named caches in the cache directory, so a later run sees what an earlier
//! one stored.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clearwords_core::cache::entry::age_display;
use clearwords_core::controller::prefetch::cache_curriculum;
use clearwords_core::models::Request;
use clearwords_core::worker::FetchOutcome;
use clearwords_core::{CacheStorage, Config, Fetcher, HttpFetcher, ServiceWorker, WorkerConfig};

// ============================================================================
// Constants
// ============================================================================

/// Log file prefix inside the cache directory
const LOG_FILE: &str = "clearwords.log";

/// Subdirectory holding one JSON file per named cache
const CACHES_DIR: &str = "caches";

const USAGE: &str = "\
Usage: clearwords <command>

Commands:
  install              Precache the app shell and activate the worker
  activate             Delete cache generations the worker doesn't recognize
  fetch <path> [--html]
                       Route a GET request through the worker
  prefetch <language>  Download a language's curriculum for offline use
  caches               List named caches";

/// Initialize the tracing subscriber: stderr plus a daily log file
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load()?;
    let cache_dir = config.cache_dir()?;
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;

    let _guard = init_tracing(&cache_dir);
    info!(command = %command, "ClearWords CLI starting");

    let origin = config.origin_url()?;
    let storage = CacheStorage::open_dir(cache_dir.join(CACHES_DIR))?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(origin.clone())?);
    let worker_config = WorkerConfig::new(origin.clone());

    match command.as_str() {
        "install" => {
            let mut worker = ServiceWorker::new(worker_config, storage, fetcher);
            worker.install().await?;
            eprintln!("✓ Installed {} static assets", worker.config().static_assets.len());
            let report = worker.activate().await?;
            print_activation(&report.deleted, &report.kept);
        }
        "activate" => {
            let mut worker = ServiceWorker::installed(worker_config, storage, fetcher);
            let report = worker.activate().await?;
            print_activation(&report.deleted, &report.kept);
        }
        "fetch" => {
            let Some(path) = args.get(2) else {
                bail!("fetch needs a path\n\n{}", USAGE);
            };
            let html = args.iter().skip(3).any(|a| a == "--html");

            let mut request = Request::resolve(&origin, path)?;
            if html {
                request = request.with_header("Accept", "text/html,application/xhtml+xml");
            }

            let worker = ServiceWorker::restore(worker_config, storage, fetcher.clone());
            match worker.handle_fetch(request.clone()).await {
                FetchOutcome::Passthrough => {
                    let response = fetcher.fetch(&request).await?;
                    println!("{} {} (passthrough, {} bytes)", response.status, response.status_text, response.body.len());
                }
                FetchOutcome::Respond { response, source } => {
                    println!(
                        "{} {} ({:?}, {} bytes)",
                        response.status,
                        response.status_text,
                        source,
                        response.body.len()
                    );
                }
            }
            worker.wait_until_idle().await;
        }
        "prefetch" => {
            let Some(language) = args.get(2) else {
                bail!("prefetch needs a language\n\n{}", USAGE);
            };
            match cache_curriculum(&storage, fetcher.as_ref(), &origin, &config.languages, language).await {
                Some(path) => eprintln!("✓ Cached {}", path),
                None => eprintln!("✗ Could not cache curriculum for {}", language),
            }
        }
        "caches" => {
            let now = Utc::now();
            let summary = storage.summary().await;
            if summary.is_empty() {
                eprintln!("No caches");
            }
            for cache in summary {
                let age = cache
                    .newest
                    .map(|newest| age_display((now - newest).num_minutes()))
                    .unwrap_or_else(|| "empty".to_string());
                println!("{:<32} {:>4} entries  {}", cache.name, cache.entries, age);
            }
        }
        other => {
            bail!("Unknown command: {}\n\n{}", other, USAGE);
        }
    }

    info!("ClearWords CLI done");
    Ok(())
}

fn print_activation(deleted: &[String], kept: &[String]) {
    for name in deleted {
        eprintln!("  deleted {}", name);
    }
    eprintln!("✓ Activated ({} kept, {} deleted)", kept.len(), deleted.len());
}
