//! Navigation timing snapshot kept for debugging.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::storage::{LocalStorage, PERF_METRICS_KEY};

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Navigation timing entry, milliseconds relative to navigation start
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub start_time: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub request_start: f64,
    pub response_end: f64,
    pub dom_content_loaded_event_start: f64,
    pub dom_content_loaded_event_end: f64,
    pub load_event_start: f64,
    pub load_event_end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfMetrics {
    pub load_time: f64,
    pub dns_time: f64,
    pub tcp_time: f64,
    pub request_time: f64,
    pub dom_ready_time: f64,
    pub page_load_time: f64,
}

impl From<&NavigationTiming> for PerfMetrics {
    fn from(t: &NavigationTiming) -> Self {
        Self {
            load_time: t.load_event_end - t.start_time,
            dns_time: t.domain_lookup_end - t.domain_lookup_start,
            tcp_time: t.connect_end - t.connect_start,
            request_time: t.response_end - t.request_start,
            dom_ready_time: t.dom_content_loaded_event_end - t.dom_content_loaded_event_start,
            page_load_time: t.load_event_end - t.load_event_start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryInfo {
    pub used_js_heap_size: u64,
    pub total_js_heap_size: u64,
    pub js_heap_size_limit: u64,
}

#[derive(Serialize)]
struct PerfSnapshot<'a> {
    #[serde(flatten)]
    metrics: &'a PerfMetrics,
    timestamp: String,
}

/// Compute the metrics and store them with a timestamp
pub fn record(storage: &mut LocalStorage, timing: &NavigationTiming, now: DateTime<Utc>) -> Result<PerfMetrics> {
    let metrics = PerfMetrics::from(timing);
    info!(metrics = ?metrics, "Performance metrics");

    let snapshot = PerfSnapshot {
        metrics: &metrics,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    storage.set(PERF_METRICS_KEY, serde_json::to_string(&snapshot)?)?;
    Ok(metrics)
}

pub fn log_memory(memory: &MemoryInfo) {
    let mb = |bytes: u64| (bytes as f64 / BYTES_PER_MB).round() as u64;
    info!(
        used_mb = mb(memory.used_js_heap_size),
        total_mb = mb(memory.total_js_heap_size),
        limit_mb = mb(memory.js_heap_size_limit),
        "Memory usage"
    );
}
