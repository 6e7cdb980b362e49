//! Device listener page: name registration and incoming-transfer polling.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use peershare_api::{ApiError, DeviceApi};
use peershare_identity::DeviceIdentity;
use peershare_platform::{Clipboard, CopyMethod, Dialogs, Navigator, copy_text};
use peershare_protocol::{
    ClearRequest, Device, PendingTransfer, RegisterRequest, TransferSummary, normalize_device_name,
    transfer_url,
};

/// Alert shown when a manual registration is rejected.
pub const REGISTER_FAILED_ALERT: &str = "Unable to register device. Please try another name.";

/// What the device page renders.
pub trait DeviceView: Send + Sync {
    /// Hides the registration form and shows the listener with `device_id`.
    fn show_listener(&self, device_id: &str);

    fn clear_name_input(&self);

    /// Shows the incoming-transfer popup.
    fn show_incoming(&self, summary: &TransferSummary);

    fn hide_incoming(&self);
}

/// Timing for the device page.
#[derive(Debug, Clone)]
pub struct DevicePageConfig {
    pub poll_interval: Duration,
}

impl Default for DevicePageConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3500),
        }
    }
}

#[derive(Default)]
struct State {
    device_id: Option<String>,
    /// The transfer currently shown in the popup.
    pending: Option<PendingTransfer>,
    poll: Option<CancellationToken>,
}

struct Inner {
    api: Arc<dyn DeviceApi>,
    view: Arc<dyn DeviceView>,
    clipboard: Arc<dyn Clipboard>,
    navigator: Arc<dyn Navigator>,
    dialogs: Arc<dyn Dialogs>,
    config: DevicePageConfig,
    state: Mutex<State>,
}

/// Registers this device under a chosen name and waits for transfers.
///
/// Polling runs on a Tokio task and stops when the page is dropped.
pub struct DevicePage {
    inner: Arc<Inner>,
}

impl DevicePage {
    pub fn new(
        api: Arc<dyn DeviceApi>,
        view: Arc<dyn DeviceView>,
        clipboard: Arc<dyn Clipboard>,
        navigator: Arc<dyn Navigator>,
        dialogs: Arc<dyn Dialogs>,
        config: DevicePageConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                view,
                clipboard,
                navigator,
                dialogs,
                config,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Waits for `identity` and, when it yields an id, shows the listener
    /// and starts polling. Without an id the page stays on the form.
    pub fn attach(&self, identity: &DeviceIdentity) {
        let weak = Arc::downgrade(&self.inner);
        identity.on_ready(move |id| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match id {
                Some(id) => {
                    inner.set_device_id(&id);
                    inner.view.show_listener(&id);
                    inner.start_polling();
                }
                None => debug!("no device id available, staying on registration form"),
            }
        });
    }

    pub fn device_id(&self) -> Option<String> {
        self.inner.device_id()
    }

    /// The transfer shown in the popup, if any.
    pub fn pending(&self) -> Option<PendingTransfer> {
        self.inner.state.lock().ok()?.pending.clone()
    }

    /// Registers the current device under `name`.
    ///
    /// Returns `Ok(None)` without calling the server when the name is blank
    /// or no id is known yet. A rejected registration raises an alert.
    pub async fn submit_name(&self, name: &str) -> Result<Option<Device>, ApiError> {
        let Ok(name) = normalize_device_name(name) else {
            return Ok(None);
        };
        let Some(id) = self.inner.device_id() else {
            debug!("name submitted before the device id was known");
            return Ok(None);
        };

        let req = RegisterRequest { id: Some(id), name };
        match self.inner.api.register(&req).await {
            Ok(device) => {
                info!(device = %device.id, name = %device.name, "device registered");
                self.inner.set_device_id(&device.id);
                self.inner.view.clear_name_input();
                self.inner.view.show_listener(&device.id);
                Ok(Some(device))
            }
            Err(e) => {
                warn!(error = %e, "device registration failed");
                self.inner.dialogs.alert(REGISTER_FAILED_ALERT);
                Err(e)
            }
        }
    }

    /// Polls immediately and then every poll interval. Restarts an
    /// already running poll.
    pub fn start_polling(&self) {
        self.inner.start_polling();
    }

    pub fn stop_polling(&self) {
        self.inner.stop_polling();
    }

    pub fn is_polling(&self) -> bool {
        self.inner
            .state
            .lock()
            .map(|s| s.poll.is_some())
            .unwrap_or(false)
    }

    /// Runs one poll. Returns `true` when a new transfer was shown.
    pub async fn poll_once(&self) -> bool {
        self.inner.poll_once().await
    }

    /// Opens the shown transfer's download page.
    ///
    /// The server-side clear runs in the background and never delays the
    /// navigation. Returns the URL navigated to, or `None` when nothing is
    /// pending.
    pub fn open_transfer(&self) -> Option<String> {
        let (device_id, pending) = {
            let state = self.inner.state.lock().ok()?;
            (state.device_id.clone(), state.pending.clone()?)
        };
        let url = transfer_url(
            &self.inner.api.origin(),
            &pending.transfer_id,
            &pending.token,
        );
        self.inner.clear_in_background(device_id, pending.transfer_id);
        self.inner.hide_popup();
        if let Err(e) = self.inner.navigator.navigate(&url) {
            warn!(error = %e, url = %url, "unable to open transfer");
        }
        Some(url)
    }

    /// Hides the popup, clearing the shown transfer in the background.
    pub fn dismiss_transfer(&self) {
        let (device_id, pending) = match self.inner.state.lock() {
            Ok(state) => (state.device_id.clone(), state.pending.clone()),
            Err(_) => return,
        };
        if let Some(pending) = pending {
            self.inner.clear_in_background(device_id, pending.transfer_id);
        }
        self.inner.hide_popup();
    }

    /// Copies the device id. `None` when there is no id or copying failed.
    pub async fn copy_device_id(&self) -> Option<CopyMethod> {
        let id = self.inner.device_id()?;
        match copy_text(self.inner.clipboard.as_ref(), &id).await {
            Ok(method) => Some(method),
            Err(e) => {
                warn!(error = %e, "unable to copy device id");
                None
            }
        }
    }
}

impl Drop for DevicePage {
    fn drop(&mut self) {
        self.inner.stop_polling();
    }
}

impl Inner {
    fn device_id(&self) -> Option<String> {
        self.state.lock().ok()?.device_id.clone()
    }

    fn set_device_id(&self, id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.device_id = Some(id.to_string());
        }
    }

    fn start_polling(self: &Arc<Self>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.device_id.is_none() {
            return;
        }
        if let Some(previous) = state.poll.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        state.poll = Some(cancel.clone());
        drop(state);

        debug!(every = ?self.config.poll_interval, "starting transfer polling");
        tokio::spawn(poll_loop(
            Arc::downgrade(self),
            self.config.poll_interval,
            cancel,
        ));
    }

    fn stop_polling(&self) {
        if let Ok(mut state) = self.state.lock()
            && let Some(token) = state.poll.take()
        {
            token.cancel();
            debug!("transfer polling stopped");
        }
    }

    async fn poll_once(&self) -> bool {
        let Some(id) = self.device_id() else {
            return false;
        };
        let transfer = match self.api.pending(&id).await {
            Ok(Some(transfer)) => transfer,
            Ok(None) => return false,
            Err(e) => {
                debug!(error = %e, "pending transfer poll failed");
                return false;
            }
        };

        let is_new = match self.state.lock() {
            Ok(mut state) => {
                let seen = state
                    .pending
                    .as_ref()
                    .is_some_and(|p| p.transfer_id == transfer.transfer_id);
                if !seen {
                    state.pending = Some(transfer.clone());
                }
                !seen
            }
            Err(_) => false,
        };
        if is_new {
            info!(transfer = %transfer.transfer_id, "incoming transfer");
            self.view.show_incoming(&transfer.summary());
        }
        is_new
    }

    fn clear_in_background(self: &Arc<Self>, device_id: Option<String>, transfer_id: String) {
        let inner = self.clone();
        tokio::spawn(async move {
            let req = ClearRequest {
                device_id: device_id.unwrap_or_default(),
                transfer_id,
            };
            if let Err(e) = inner.api.clear(&req).await {
                debug!(error = %e, transfer = %req.transfer_id, "clearing pending transfer failed");
            }
        });
    }

    fn hide_popup(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.pending = None;
        }
        self.view.hide_incoming();
    }
}

/// Fires one poll per tick, each on its own task so a slow request never
/// delays the next tick.
async fn poll_loop(inner: Weak<Inner>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    inner.poll_once().await;
                });
            }
        }
    }
}
