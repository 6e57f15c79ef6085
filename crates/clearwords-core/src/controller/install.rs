//! The deferred install prompt.
//!
//! ```text
//! NoPromptCaptured -> PromptCaptured -> Accepted | Declined | Dismissed
//! ```
//!
//! The platform handle is single use: it is dropped once the user answers
//! the platform prompt or dismisses ours. A dismissal suppresses the prompt
//! for one week.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{debug, info, warn};

use super::storage::{LocalStorage, INSTALL_DISMISSED_KEY, INSTALL_PROMPT_TIME_KEY};

/// Delay between install eligibility and the automatic prompt
pub const AUTO_PROMPT_DELAY_SECS: i64 = 30;

/// The prompt hides itself after this long
pub const PROMPT_VISIBLE_SECS: i64 = 30;

/// Suppression window after a dismissal
pub const DISMISS_SUPPRESSION_DAYS: i64 = 7;

/// Answer reported by the platform prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// Platform-provided install offer, captured ahead of showing any UI.
#[async_trait]
pub trait DeferredPrompt: Send {
    /// Show the platform prompt and wait for the user's choice
    async fn prompt(&mut self) -> InstallOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NoPromptCaptured,
    PromptCaptured,
    Accepted,
    Declined,
    Dismissed,
}

pub struct InstallFlow {
    state: InstallState,
    handle: Option<Box<dyn DeferredPrompt>>,
    auto_prompt_at: Option<DateTime<Utc>>,
    visible_until: Option<DateTime<Utc>>,
}

impl Default for InstallFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallFlow {
    pub fn new() -> Self {
        Self {
            state: InstallState::NoPromptCaptured,
            handle: None,
            auto_prompt_at: None,
            visible_until: None,
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible_until.is_some()
    }

    /// Retain the platform handle and schedule the automatic prompt
    pub fn capture(&mut self, handle: Box<dyn DeferredPrompt>, now: DateTime<Utc>) {
        info!("Install prompt available");
        self.handle = Some(handle);
        self.state = InstallState::PromptCaptured;
        self.auto_prompt_at = Some(now + Duration::seconds(AUTO_PROMPT_DELAY_SECS));
    }

    /// Whether a dismissal within the last week suppresses the prompt.
    ///
    /// The timestamp decides. A dismissal flag without a timestamp (written
    /// by older builds) suppresses indefinitely.
    pub fn is_suppressed(storage: &LocalStorage, now: DateTime<Utc>) -> bool {
        match storage.get(INSTALL_PROMPT_TIME_KEY) {
            Some(raw) => match raw.parse::<i64>().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
                Some(dismissed_at) => now - dismissed_at < Duration::days(DISMISS_SUPPRESSION_DAYS),
                None => {
                    warn!(value = raw, "Unparseable install dismissal time");
                    false
                }
            },
            None => storage.get(INSTALL_DISMISSED_KEY).is_some(),
        }
    }

    /// Try to show the prompt. Returns whether it is now visible.
    pub fn show(&mut self, storage: &LocalStorage, standalone: bool, now: DateTime<Utc>) -> bool {
        if standalone {
            debug!("App is already installed");
            return false;
        }
        if Self::is_suppressed(storage, now) {
            debug!("Install prompt was recently dismissed");
            return false;
        }
        if self.handle.is_none() {
            return false;
        }
        self.visible_until = Some(now + Duration::seconds(PROMPT_VISIBLE_SECS));
        true
    }

    /// Run the platform prompt. Returns `None` when no handle is held.
    pub async fn accept(&mut self) -> Option<InstallOutcome> {
        self.visible_until = None;
        let mut handle = self.handle.take()?;
        let outcome = handle.prompt().await;
        info!(outcome = ?outcome, "User answered the install prompt");
        self.state = match outcome {
            InstallOutcome::Accepted => InstallState::Accepted,
            InstallOutcome::Dismissed => InstallState::Declined,
        };
        Some(outcome)
    }

    /// Dismiss our prompt without asking the platform, and remember when
    pub fn dismiss(&mut self, storage: &mut LocalStorage, now: DateTime<Utc>) -> anyhow::Result<()> {
        self.visible_until = None;
        self.handle = None;
        self.auto_prompt_at = None;
        self.state = InstallState::Dismissed;
        storage.set(INSTALL_DISMISSED_KEY, "true")?;
        storage.set(INSTALL_PROMPT_TIME_KEY, now.timestamp_millis().to_string())?;
        Ok(())
    }

    /// Returns true once when the automatic prompt is due
    pub fn auto_prompt_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.auto_prompt_at {
            Some(at) if now >= at => {
                self.auto_prompt_at = None;
                true
            }
            _ => false,
        }
    }

    /// Returns true once when a visible prompt has timed out
    pub fn prompt_expired(&mut self, now: DateTime<Utc>) -> bool {
        match self.visible_until {
            Some(until) if now >= until => {
                self.visible_until = None;
                true
            }
            _ => false,
        }
    }
}
