//! Background sync, push and notification click callbacks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::ServiceWorker;

/// Background sync tag for queued analytics
pub const SYNC_ANALYTICS_TAG: &str = "sync-analytics";

/// Title of every push notification
pub const NOTIFICATION_TITLE: &str = "ClearWords";

/// Body used when a push arrives without a payload
pub const DEFAULT_PUSH_BODY: &str = "New content available in ClearWords!";

const NOTIFICATION_ICON: &str = "/logo.png";
const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub date_of_arrival: i64,
    pub primary_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification ready to hand to the platform
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// An open window of the app, as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focusable: bool,
}

/// What to do after a notification click. The notification itself is
/// always closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    Ignore,
    Focus(String),
    OpenWindow(String),
}

impl ServiceWorker {
    /// Handle a background sync event. Returns whether the tag was recognized.
    pub async fn on_sync(&self, tag: &str) -> bool {
        if tag != SYNC_ANALYTICS_TAG {
            return false;
        }
        info!(tag, "Background sync for analytics");
        self.sync_analytics().await;
        true
    }

    async fn sync_analytics(&self) {
        // Upload of the queued events happens from the page; the worker only
        // marks the sync point.
        info!("Syncing analytics");
    }

    /// Build the notification for a push message
    pub fn on_push(&self, payload: Option<&[u8]>, now: DateTime<Utc>) -> Notification {
        info!(bytes = payload.map(|p| p.len()).unwrap_or(0), "Push received");

        let body = payload
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_else(|| DEFAULT_PUSH_BODY.to_string());

        Notification {
            title: NOTIFICATION_TITLE.to_string(),
            body,
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_ICON.to_string(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data: NotificationData {
                date_of_arrival: now.timestamp_millis(),
                primary_key: "1".to_string(),
            },
            actions: vec![
                NotificationAction {
                    action: "explore".to_string(),
                    title: "Open App".to_string(),
                },
                NotificationAction {
                    action: "close".to_string(),
                    title: "Close".to_string(),
                },
            ],
        }
    }

    /// Decide how to react to a notification click: focus an open app window
    /// if there is one, otherwise open the root page.
    pub fn on_notification_click(&self, action: Option<&str>, clients: &[WindowClient]) -> ClickAction {
        info!(action = action.unwrap_or(""), "Notification click received");

        if action == Some("close") {
            return ClickAction::Ignore;
        }

        let origin = self.config.origin.origin().ascii_serialization();
        clients
            .iter()
            .find(|client| client.url.contains(&origin) && client.focusable)
            .map(|client| ClickAction::Focus(client.id.clone()))
            .unwrap_or_else(|| ClickAction::OpenWindow("/".to_string()))
    }
}
