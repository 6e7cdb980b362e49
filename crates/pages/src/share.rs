//! Share page: share-link QR code, device roster and notifications.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use peershare_api::{ApiError, DeviceApi};
use peershare_identity::DeviceIdentity;
use peershare_platform::{Clipboard, CopyMethod, Navigator, PlatformError, copy_text};
use peershare_protocol::{Device, NotifyRequest, ShareConfig};
use peershare_scanner::{QrStyle, render_svg};

use crate::ScanLauncher;
use crate::receive::navigate_on_scan;

pub const SEND_LABEL: &str = "Send";
pub const SENDING_LABEL: &str = "Sending...";
pub const SENT_LABEL: &str = "Sent!";
pub const RETRY_LABEL: &str = "Try again";
pub const COPY_LABEL: &str = "Copy link";
pub const COPIED_LABEL: &str = "Copied!";
pub const EMPTY_ROSTER_MESSAGE: &str =
    "No devices registered yet. Open the device listener to register.";
pub const SHARE_SCAN_MESSAGE: &str = "Scan a QR code to open its link instantly.";

/// Label and enabled state of a device's send button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub label: String,
    pub enabled: bool,
}

impl ButtonState {
    pub fn ready(label: &str) -> Self {
        Self {
            label: label.to_string(),
            enabled: true,
        }
    }

    pub fn busy(label: &str) -> Self {
        Self {
            label: label.to_string(),
            enabled: false,
        }
    }
}

/// What the roster area shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceRoster {
    /// Placeholder text instead of a list.
    Empty { message: String },
    /// Other devices, in server order, each with a "Send" button.
    Devices(Vec<Device>),
}

/// What the share page renders.
pub trait ShareView: Send + Sync {
    fn render_qr(&self, svg: &str);

    /// Replaces the roster contents.
    fn render_roster(&self, roster: &DeviceRoster);

    fn set_copy_label(&self, label: &str);

    fn set_notify_button(&self, device_id: &str, button: &ButtonState);
}

/// Timing and styling for the share page.
#[derive(Debug, Clone)]
pub struct SharePageConfig {
    pub refresh_interval: Duration,
    /// How long "Sent!" / "Try again" stay before the button resets.
    pub notify_reset: Duration,
    /// How long "Copied!" stays before the copy label resets.
    pub copied_reset: Duration,
    pub qr: QrStyle,
}

impl Default for SharePageConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(15),
            notify_reset: Duration::from_millis(1800),
            copied_reset: Duration::from_millis(1600),
            qr: QrStyle::default(),
        }
    }
}

struct Inner {
    share: ShareConfig,
    api: Arc<dyn DeviceApi>,
    view: Arc<dyn ShareView>,
    clipboard: Arc<dyn Clipboard>,
    navigator: Arc<dyn Navigator>,
    scanner: Arc<dyn ScanLauncher>,
    config: SharePageConfig,
    current_device: Mutex<Option<String>>,
    /// Cancels the refresh loop and pending label resets.
    cancel: CancellationToken,
}

/// Presents a share link and lets the sender notify other devices.
pub struct SharePage {
    inner: Arc<Inner>,
    started: AtomicBool,
}

impl SharePage {
    pub fn new(
        share: ShareConfig,
        api: Arc<dyn DeviceApi>,
        view: Arc<dyn ShareView>,
        clipboard: Arc<dyn Clipboard>,
        navigator: Arc<dyn Navigator>,
        scanner: Arc<dyn ScanLauncher>,
        config: SharePageConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                share,
                api,
                view,
                clipboard,
                navigator,
                scanner,
                config,
                current_device: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
            started: AtomicBool::new(false),
        }
    }

    /// Renders the QR code, fetches the roster, and keeps it fresh.
    ///
    /// The roster is fetched once right away and again when `identity`
    /// resolves, so the current device drops out of the list.
    pub fn init(&self, identity: &DeviceIdentity) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("share page already initialised");
            return;
        }

        self.render_qr();
        self.spawn_refresh();

        let weak = Arc::downgrade(&self.inner);
        identity.on_ready(move |id| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Ok(mut current) = inner.current_device.lock() {
                *current = id;
            }
            tokio::spawn(async move { inner.refresh_devices().await });
        });

        tokio::spawn(refresh_loop(
            Arc::downgrade(&self.inner),
            self.inner.config.refresh_interval,
            self.inner.cancel.clone(),
        ));
    }

    pub fn render_qr(&self) {
        match render_svg(&self.inner.share.share_link, &self.inner.config.qr) {
            Ok(svg) => self.inner.view.render_qr(&svg),
            Err(e) => warn!(error = %e, "unable to render share QR code"),
        }
    }

    /// Fetches the device list and renders it. A failed fetch renders as
    /// an empty roster.
    pub async fn refresh_devices(&self) -> DeviceRoster {
        self.inner.refresh_devices().await
    }

    /// Renders `devices` minus the current device.
    pub fn render_devices(&self, devices: Vec<Device>) -> DeviceRoster {
        self.inner.render_devices(devices)
    }

    pub fn current_device_id(&self) -> Option<String> {
        self.inner.current_device.lock().ok()?.clone()
    }

    /// Offers this page's transfer to `device_id`.
    ///
    /// The device's button shows progress and the outcome, then resets
    /// after the notify reset delay.
    pub async fn notify_device(&self, device_id: &str) -> Result<(), ApiError> {
        let view = &self.inner.view;
        view.set_notify_button(device_id, &ButtonState::busy(SENDING_LABEL));

        let req = NotifyRequest {
            device_id: device_id.to_string(),
            transfer_id: self.inner.share.transfer_id.clone(),
            token: self.inner.share.token.clone(),
        };
        let result = self.inner.api.notify(&req).await;
        match &result {
            Ok(()) => {
                info!(device = %device_id, transfer = %req.transfer_id, "device notified");
                view.set_notify_button(device_id, &ButtonState::busy(SENT_LABEL));
            }
            Err(e) => {
                warn!(error = %e, device = %device_id, "notify failed");
                view.set_notify_button(device_id, &ButtonState::busy(RETRY_LABEL));
            }
        }

        let view = view.clone();
        let device_id = device_id.to_string();
        self.inner.after(self.inner.config.notify_reset, move || {
            view.set_notify_button(&device_id, &ButtonState::ready(SEND_LABEL));
        });
        result
    }

    /// Copies the share link and flashes "Copied!" on the copy button.
    pub async fn copy_link(&self) -> Result<CopyMethod, PlatformError> {
        let method = copy_text(self.inner.clipboard.as_ref(), &self.inner.share.share_link)
            .await
            .inspect_err(|e| warn!(error = %e, "unable to copy share link"))?;

        self.inner.view.set_copy_label(COPIED_LABEL);
        let view = self.inner.view.clone();
        self.inner.after(self.inner.config.copied_reset, move || {
            view.set_copy_label(COPY_LABEL);
        });
        Ok(method)
    }

    /// Scans a QR code and navigates to its link.
    pub fn open_scanner(&self) {
        self.inner.scanner.open(navigate_on_scan(
            SHARE_SCAN_MESSAGE,
            self.inner.navigator.clone(),
        ));
    }

    fn spawn_refresh(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.refresh_devices().await });
    }
}

impl Drop for SharePage {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl Inner {
    async fn refresh_devices(&self) -> DeviceRoster {
        let devices = self.api.list_devices().await.unwrap_or_else(|e| {
            debug!(error = %e, "device list fetch failed");
            Vec::new()
        });
        self.render_devices(devices)
    }

    fn render_devices(&self, devices: Vec<Device>) -> DeviceRoster {
        let current = self.current_device.lock().ok().and_then(|c| c.clone());
        let others: Vec<Device> = devices
            .into_iter()
            .filter(|d| current.as_deref() != Some(d.id.as_str()))
            .collect();

        let roster = if others.is_empty() {
            DeviceRoster::Empty {
                message: EMPTY_ROSTER_MESSAGE.to_string(),
            }
        } else {
            DeviceRoster::Devices(others)
        };
        self.view.render_roster(&roster);
        roster
    }

    /// Runs `f` after `delay` unless the page is dropped first.
    fn after(&self, delay: Duration, f: impl FnOnce() + Send + 'static) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => f(),
            }
        });
    }
}

/// Refreshes the roster every `period`, starting one period from now.
async fn refresh_loop(inner: Weak<Inner>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.refresh_devices().await;
            }
        }
    }
}
