//! The page controller: per-page state and the glue around it.
//!
//! `PageController` owns everything a page keeps between events: the
//! deferred install handle, the online flag, the visible banners, the
//! current toast. Platform events are fed in as `PageEvent`s together with
//! the current time; effects come out as `UiCommand`s on the `UiSurface`
//! and as writes to `LocalStorage`.
//!
//! Timed behavior (banner and toast dismissal, the delayed install prompt,
//! auto-save) advances on `PageEvent::Tick`.

pub mod analytics;
pub mod connectivity;
pub mod install;
pub mod metrics;
pub mod platform;
pub mod prefetch;
pub mod storage;
pub mod ui;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

pub use analytics::{AnalyticsEvent, TrackResult};
pub use connectivity::Connectivity;
pub use install::{DeferredPrompt, InstallFlow, InstallOutcome, InstallState};
pub use metrics::{MemoryInfo, NavigationTiming, PerfMetrics};
pub use platform::{BackAction, BackButton, BatteryStatus, ConnectionInfo, Orientation, Platform};
pub use storage::LocalStorage;
pub use ui::{BannerKind, Toast, UiCommand, UiSurface, TOAST_DURATION_MS};

/// Interval between automatic state saves
pub const AUTO_SAVE_INTERVAL_SECS: i64 = 30;

const HOME_PAGE: &str = "home";
const LOCALHOST: &str = "localhost";

pub const INSTALL_SUCCESS_TOAST: &str = "App installed successfully! 🎉";
pub const INSTALL_LATER_TOAST: &str = "Installation available on next visit. Please refresh the page.";

/// Who is using the app, attached to analytics events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub language: Option<String>,
    pub segment: Option<String>,
}

/// Page-scoped facts handed to anything that needs them
#[derive(Debug, Clone)]
pub struct PageContext {
    pub hostname: String,
    pub platform: Platform,
    pub user: UserContext,
    pub current_page: String,
    pub online: bool,
}

impl PageContext {
    pub fn is_localhost(&self) -> bool {
        self.hostname == LOCALHOST
    }

    pub fn on_home(&self) -> bool {
        self.current_page == HOME_PAGE
    }
}

/// Browser events the controller reacts to
pub enum PageEvent {
    Load {
        timing: Option<NavigationTiming>,
        memory: Option<MemoryInfo>,
    },
    InstallEligible(Box<dyn DeferredPrompt>),
    InstallEntryClicked,
    InstallAccepted,
    InstallDismissed,
    Online,
    Offline,
    /// A new worker finished installing
    WorkerInstalled { has_controller: bool },
    UpdateLater,
    UpdateNow,
    ToastClicked,
    Error { message: String },
    ErrorOverlayClosed,
    UnhandledRejection { reason: String },
    BatteryChanged(BatteryStatus),
    OrientationChanged(Orientation),
    ConnectionChanged(ConnectionInfo),
    BackPressed,
    Navigated { page: String },
    Tick,
}

pub struct PageController<U: UiSurface> {
    ui: U,
    storage: LocalStorage,
    context: PageContext,
    install: InstallFlow,
    connectivity: Connectivity,
    toast: Option<Toast>,
    update_prompt: bool,
    error_overlay: bool,
    back_button: BackButton,
    battery_saver: bool,
    low_bandwidth: bool,
    orientation: Option<Orientation>,
    next_auto_save: Option<DateTime<Utc>>,
}

impl<U: UiSurface> PageController<U> {
    pub fn new(ui: U, storage: LocalStorage, context: PageContext) -> Self {
        Self {
            ui,
            storage,
            context,
            install: InstallFlow::new(),
            connectivity: Connectivity::new(),
            toast: None,
            update_prompt: false,
            error_overlay: false,
            back_button: BackButton::default(),
            battery_saver: false,
            low_bandwidth: false,
            orientation: None,
            next_auto_save: None,
        }
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn context(&self) -> &PageContext {
        &self.context
    }

    pub fn install_state(&self) -> InstallState {
        self.install.state()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn battery_saver(&self) -> bool {
        self.battery_saver
    }

    pub fn low_bandwidth(&self) -> bool {
        self.low_bandwidth
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }

    /// Start periodic state saves, first one after the interval
    pub fn enable_auto_save(&mut self, now: DateTime<Utc>) {
        self.next_auto_save = Some(now + Duration::seconds(AUTO_SAVE_INTERVAL_SECS));
    }

    pub async fn handle(&mut self, event: PageEvent, now: DateTime<Utc>) {
        match event {
            PageEvent::Load { timing, memory } => self.on_load(timing, memory, now),
            PageEvent::InstallEligible(handle) => self.on_install_eligible(handle, now),
            PageEvent::InstallEntryClicked => {
                if self.install.has_handle() {
                    self.show_install_prompt(now);
                } else {
                    self.show_toast(INSTALL_LATER_TOAST, Duration::milliseconds(TOAST_DURATION_MS), now);
                }
            }
            PageEvent::InstallAccepted => self.on_install_accepted(now).await,
            PageEvent::InstallDismissed => {
                self.ui.apply(UiCommand::HideInstallPrompt);
                if let Err(e) = self.install.dismiss(&mut self.storage, now) {
                    warn!(error = %e, "Failed to record install dismissal");
                }
            }
            PageEvent::Online => {
                self.context.online = true;
                self.connectivity.went_online(now, &mut self.ui);
            }
            PageEvent::Offline => {
                self.context.online = false;
                self.connectivity.went_offline(&mut self.ui);
            }
            PageEvent::WorkerInstalled { has_controller } => {
                // First install has no controller: nothing to update
                if has_controller && !self.update_prompt {
                    info!("Worker update found");
                    self.update_prompt = true;
                    self.ui.apply(UiCommand::ShowUpdatePrompt);
                }
            }
            PageEvent::UpdateLater => {
                if self.update_prompt {
                    self.update_prompt = false;
                    self.ui.apply(UiCommand::HideUpdatePrompt);
                }
            }
            PageEvent::UpdateNow => self.ui.apply(UiCommand::Reload),
            PageEvent::ToastClicked => self.hide_toast(),
            PageEvent::Error { message } => self.on_error(message),
            PageEvent::ErrorOverlayClosed => {
                if self.error_overlay {
                    self.error_overlay = false;
                    self.ui.apply(UiCommand::HideErrorOverlay);
                }
            }
            PageEvent::UnhandledRejection { reason } => {
                error!(reason = %reason, "Unhandled promise rejection");
                if !self.context.is_localhost() {
                    let mut extra = Map::new();
                    extra.insert("reason".to_string(), Value::String(reason));
                    self.track_event("unhandled_rejection", extra, now);
                }
            }
            PageEvent::BatteryChanged(status) => {
                self.battery_saver = status.is_low();
                if self.battery_saver {
                    info!(level = status.level, "Low battery detected, optimizing for battery saving");
                }
            }
            PageEvent::OrientationChanged(orientation) => {
                info!(orientation = ?orientation, "Orientation changed");
                self.orientation = Some(orientation);
            }
            PageEvent::ConnectionChanged(connection) => {
                info!(
                    effective_type = %connection.effective_type,
                    downlink_mbps = connection.downlink_mbps,
                    rtt_ms = connection.rtt_ms,
                    save_data = connection.save_data,
                    "Network quality"
                );
                self.low_bandwidth = connection.is_slow();
                if self.low_bandwidth {
                    info!("Slow network detected, optimizing for low bandwidth");
                }
            }
            PageEvent::BackPressed => self.on_back_pressed(now),
            PageEvent::Navigated { page } => self.context.current_page = page,
            PageEvent::Tick => self.tick(now),
        }
    }

    /// Queue an analytics event. Storage failures are logged and dropped.
    pub fn track_event(&mut self, name: &str, extra: Map<String, Value>, now: DateTime<Utc>) -> Option<TrackResult> {
        match analytics::track_event(&mut self.storage, &self.context, name, extra, now) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(event = name, error = %e, "Failed to queue analytics event");
                None
            }
        }
    }

    /// Show the global toast, replacing any toast already on screen
    pub fn show_toast(&mut self, message: &str, duration: Duration, now: DateTime<Utc>) {
        if self.toast.take().is_some() {
            self.ui.apply(UiCommand::HideToast);
        }
        self.toast = Some(Toast::new(message, duration, now));
        self.ui.apply(UiCommand::ShowToast {
            message: message.to_string(),
        });
    }

    fn hide_toast(&mut self) {
        if self.toast.take().is_some() {
            self.ui.apply(UiCommand::HideToast);
        }
    }

    fn on_load(&mut self, timing: Option<NavigationTiming>, memory: Option<MemoryInfo>, now: DateTime<Utc>) {
        if let Some(timing) = timing {
            if let Err(e) = metrics::record(&mut self.storage, &timing, now) {
                warn!(error = %e, "Performance monitoring failed");
            }
        }
        if let Some(memory) = memory {
            metrics::log_memory(&memory);
        }
    }

    fn on_install_eligible(&mut self, handle: Box<dyn DeferredPrompt>, now: DateTime<Utc>) {
        self.install.capture(handle, now);
        self.ui.apply(UiCommand::ShowInstallEntry {
            installed: self.context.platform.is_pwa,
        });
        self.track_event("pwa_install_prompt_available", Map::new(), now);
    }

    fn show_install_prompt(&mut self, now: DateTime<Utc>) {
        if self.install.is_visible() {
            return;
        }
        if self.install.show(&self.storage, self.context.platform.is_pwa, now) {
            self.ui.apply(UiCommand::ShowInstallPrompt);
        }
    }

    async fn on_install_accepted(&mut self, now: DateTime<Utc>) {
        if self.install.is_visible() {
            self.ui.apply(UiCommand::HideInstallPrompt);
        }
        match self.install.accept().await {
            Some(InstallOutcome::Accepted) => {
                self.show_toast(INSTALL_SUCCESS_TOAST, Duration::milliseconds(TOAST_DURATION_MS), now);
                self.track_event("pwa_install_accepted", Map::new(), now);
            }
            Some(InstallOutcome::Dismissed) => {
                self.track_event("pwa_install_declined", Map::new(), now);
            }
            None => {}
        }
    }

    fn on_error(&mut self, message: String) {
        error!(message = %message, "Global error");
        if !self.context.is_localhost() && !message.contains("critical") {
            return;
        }
        if !self.error_overlay {
            self.error_overlay = true;
            self.ui.apply(UiCommand::ShowErrorOverlay { message });
        }
    }

    fn on_back_pressed(&mut self, now: DateTime<Utc>) {
        if !self.context.platform.is_pwa {
            return;
        }
        match self.back_button.press(self.context.on_home(), now) {
            BackAction::NavigateHome => {
                self.context.current_page = HOME_PAGE.to_string();
                self.ui.apply(UiCommand::NavigateHome);
            }
            BackAction::ShowExitHint => {
                self.show_toast(platform::EXIT_HINT, Duration::milliseconds(TOAST_DURATION_MS), now);
            }
            BackAction::Exit => self.ui.apply(UiCommand::ExitApp),
        }
    }

    fn tick(&mut self, now: DateTime<Utc>) {
        self.connectivity.tick(now, &mut self.ui);

        if self.toast.as_ref().is_some_and(|t| t.is_expired(now)) {
            self.hide_toast();
        }

        if self.install.prompt_expired(now) {
            self.ui.apply(UiCommand::HideInstallPrompt);
        }
        if self.install.auto_prompt_due(now) && !InstallFlow::is_suppressed(&self.storage, now) {
            self.show_install_prompt(now);
        }

        if let Some(due) = self.next_auto_save {
            if now >= due {
                self.next_auto_save = Some(now + Duration::seconds(AUTO_SAVE_INTERVAL_SECS));
                self.ui.apply(UiCommand::SaveState);
                info!("Auto-saved state");
                self.track_event("auto_save", Map::new(), now);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
