//! Privacy-friendly analytics queue kept in local storage.
//!
//! Events are appended locally and trimmed to the most recent
//! `MAX_QUEUED_EVENTS`. Uploading a batch is left to the host app; the
//! queue only reports when a batch is worth sending.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::storage::{LocalStorage, ANALYTICS_KEY};
use super::PageContext;

/// Oldest events are dropped beyond this
pub const MAX_QUEUED_EVENTS: usize = 100;

/// A batch is ready once the queue holds more than this many events
pub const BATCH_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackResult {
    /// Development host: printed, not stored
    LoggedOnly,
    Queued { len: usize, batch_ready: bool },
}

/// Read the stored queue. A corrupt queue reads as empty.
pub fn load_queue(storage: &LocalStorage) -> Vec<AnalyticsEvent> {
    let Some(raw) = storage.get(ANALYTICS_KEY) else {
        return Vec::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "Discarding unreadable analytics queue");
        Vec::new()
    })
}

pub fn track_event(
    storage: &mut LocalStorage,
    context: &PageContext,
    name: &str,
    extra: Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<TrackResult> {
    if context.is_localhost() {
        let data = Value::Object(extra);
        info!(event = name, data = %data, "Event tracked");
        return Ok(TrackResult::LoggedOnly);
    }

    let mut queue = load_queue(storage);
    queue.push(AnalyticsEvent {
        event: name.to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        language: context.user.language.clone(),
        segment: context.user.segment.clone(),
        extra,
    });
    if queue.len() > MAX_QUEUED_EVENTS {
        queue.drain(..queue.len() - MAX_QUEUED_EVENTS);
    }
    storage.set(ANALYTICS_KEY, serde_json::to_string(&queue)?)?;

    let batch_ready = context.online && queue.len() > BATCH_THRESHOLD;
    if batch_ready {
        debug!(events = queue.len(), "Analytics batch ready");
    }
    Ok(TrackResult::Queued {
        len: queue.len(),
        batch_ready,
    })
}
