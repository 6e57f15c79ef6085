//! Platform detection and the device listeners: battery, orientation,
//! network quality and the back button.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

const MOBILE_MARKERS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

const IOS_MARKERS: &[&str] = &["iPad", "iPhone", "iPod"];

/// Battery level below which power saving kicks in
pub const LOW_BATTERY_LEVEL: f64 = 0.2;

/// Second back press must land within this window to exit
pub const BACK_EXIT_WINDOW_MS: i64 = 2000;

pub const EXIT_HINT: &str = "Press back again to exit";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Platform {
    pub is_mobile: bool,
    pub is_ios: bool,
    pub is_android: bool,
    pub is_desktop: bool,
    /// Running as an installed, standalone app
    pub is_pwa: bool,
}

impl Platform {
    pub fn detect(user_agent: &str, standalone: bool) -> Self {
        let lower = user_agent.to_lowercase();
        let is_mobile = MOBILE_MARKERS.iter().any(|m| lower.contains(m));
        let platform = Self {
            is_mobile,
            is_ios: IOS_MARKERS.iter().any(|m| user_agent.contains(m)),
            is_android: user_agent.contains("Android"),
            is_desktop: !is_mobile,
            is_pwa: standalone,
        };
        info!(platform = ?platform, "Platform detected");
        platform
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryStatus {
    pub level: f64,
    pub charging: bool,
}

impl BatteryStatus {
    pub fn is_low(&self) -> bool {
        self.level < LOW_BATTERY_LEVEL && !self.charging
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    pub effective_type: String,
    pub downlink_mbps: f64,
    pub rtt_ms: u32,
    pub save_data: bool,
}

impl ConnectionInfo {
    pub fn is_slow(&self) -> bool {
        matches!(self.effective_type.as_str(), "slow-2g" | "2g")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    NavigateHome,
    ShowExitHint,
    Exit,
}

/// Double-press-to-exit handling for the standalone app
#[derive(Debug, Default)]
pub struct BackButton {
    presses: u32,
    reset_at: Option<DateTime<Utc>>,
}

impl BackButton {
    pub fn press(&mut self, on_home: bool, now: DateTime<Utc>) -> BackAction {
        if !on_home {
            return BackAction::NavigateHome;
        }
        if self.reset_at.is_some_and(|at| now >= at) {
            self.presses = 0;
            self.reset_at = None;
        }
        self.presses += 1;
        if self.presses == 1 {
            self.reset_at = Some(now + Duration::milliseconds(BACK_EXIT_WINDOW_MS));
            BackAction::ShowExitHint
        } else {
            self.presses = 0;
            self.reset_at = None;
            BackAction::Exit
        }
    }
}
