//! Offline and "Back Online" banners.
//!
//! The banners reflect the platform's connectivity signal verbatim: no
//! retries, no probing.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::ui::{BannerKind, UiCommand, UiSurface};

/// How long the "Back Online" banner stays up
pub const ONLINE_BANNER_MS: i64 = 2000;

#[derive(Debug, Default)]
pub struct Connectivity {
    offline_banner: bool,
    online_banner_until: Option<DateTime<Utc>>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline_banner_visible(&self) -> bool {
        self.offline_banner
    }

    pub fn online_banner_visible(&self) -> bool {
        self.online_banner_until.is_some()
    }

    pub fn went_offline(&mut self, ui: &mut dyn UiSurface) {
        info!(status = "offline", "Network status changed");
        if self.offline_banner {
            return;
        }
        self.offline_banner = true;
        ui.apply(UiCommand::ShowBanner(BannerKind::Offline));
    }

    pub fn went_online(&mut self, now: DateTime<Utc>, ui: &mut dyn UiSurface) {
        info!(status = "online", "Network status changed");
        if self.offline_banner {
            self.offline_banner = false;
            ui.apply(UiCommand::HideBanner(BannerKind::Offline));
        }
        if self.online_banner_until.is_none() {
            ui.apply(UiCommand::ShowBanner(BannerKind::Online));
        }
        self.online_banner_until = Some(now + Duration::milliseconds(ONLINE_BANNER_MS));
    }

    /// Dismiss the online banner once its time is up
    pub fn tick(&mut self, now: DateTime<Utc>, ui: &mut dyn UiSurface) {
        if let Some(until) = self.online_banner_until {
            if now >= until {
                self.online_banner_until = None;
                ui.apply(UiCommand::HideBanner(BannerKind::Online));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_banner_is_idempotent() {
        let mut connectivity = Connectivity::new();
        let mut ui: Vec<UiCommand> = Vec::new();

        connectivity.went_offline(&mut ui);
        connectivity.went_offline(&mut ui);
        assert_eq!(ui, vec![UiCommand::ShowBanner(BannerKind::Offline)]);
        assert!(connectivity.offline_banner_visible());
    }

    #[test]
    fn test_online_hides_offline_and_self_dismisses() {
        let mut connectivity = Connectivity::new();
        let mut ui: Vec<UiCommand> = Vec::new();
        let now = Utc::now();

        connectivity.went_offline(&mut ui);
        connectivity.went_online(now, &mut ui);
        assert!(!connectivity.offline_banner_visible());
        assert!(connectivity.online_banner_visible());

        connectivity.tick(now + Duration::milliseconds(1999), &mut ui);
        assert!(connectivity.online_banner_visible());

        connectivity.tick(now + Duration::milliseconds(2000), &mut ui);
        assert!(!connectivity.online_banner_visible());
        assert_eq!(
            ui,
            vec![
                UiCommand::ShowBanner(BannerKind::Offline),
                UiCommand::HideBanner(BannerKind::Offline),
                UiCommand::ShowBanner(BannerKind::Online),
                UiCommand::HideBanner(BannerKind::Online),
            ]
        );
    }

    #[test]
    fn test_repeated_online_extends_single_banner() {
        let mut connectivity = Connectivity::new();
        let mut ui: Vec<UiCommand> = Vec::new();
        let now = Utc::now();

        connectivity.went_online(now, &mut ui);
        connectivity.went_online(now + Duration::milliseconds(1500), &mut ui);
        connectivity.tick(now + Duration::milliseconds(2500), &mut ui);

        assert!(connectivity.online_banner_visible());
        assert_eq!(ui, vec![UiCommand::ShowBanner(BannerKind::Online)]);
    }
}
