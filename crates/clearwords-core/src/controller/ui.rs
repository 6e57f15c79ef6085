//! Commands the page controller sends to whatever renders the page.

use chrono::{DateTime, Duration, Utc};

/// Default time a toast stays on screen
pub const TOAST_DURATION_MS: i64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Offline,
    Online,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    ShowBanner(BannerKind),
    HideBanner(BannerKind),
    ShowToast { message: String },
    HideToast,
    ShowUpdatePrompt,
    HideUpdatePrompt,
    Reload,
    ShowInstallPrompt,
    HideInstallPrompt,
    /// Settings entry: an "installed" badge or an install button
    ShowInstallEntry { installed: bool },
    ShowErrorOverlay { message: String },
    HideErrorOverlay,
    NavigateHome,
    ExitApp,
    SaveState,
}

/// The rendering side of the page.
pub trait UiSurface {
    fn apply(&mut self, command: UiCommand);
}

/// Records commands in order; used by headless runs and tests.
impl UiSurface for Vec<UiCommand> {
    fn apply(&mut self, command: UiCommand) {
        self.push(command);
    }
}

/// The single global toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

impl Toast {
    pub fn new(message: impl Into<String>, duration: Duration, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            expires_at: now + duration,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
