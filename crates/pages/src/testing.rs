//! Mock collaborators shared by the page tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use peershare_api::{ApiError, ApiFuture, DeviceApi};
use peershare_identity::{ClientInfo, DeviceIdentity, MemoryIdStore};
use peershare_platform::{
    Clipboard, Dialogs, Navigator, NoDocumentRoot, PlatformError, PlatformFuture,
};
use peershare_protocol::{
    ClearRequest, Device, NotifyRequest, PendingTransfer, RegisterRequest, TransferSummary,
};
use peershare_scanner::ScanOptions;

use crate::ScanLauncher;
use crate::share::{ButtonState, DeviceRoster, ShareView};

pub(crate) fn failure() -> ApiError {
    ApiError::Status {
        status: 500,
        message: "mock failure".into(),
    }
}

/// Device API mock with scripted responses and recorded calls.
#[derive(Default)]
pub(crate) struct MockApi {
    pub register_results: Mutex<VecDeque<Result<Device, ApiError>>>,
    pub pending_results: Mutex<VecDeque<Result<Option<PendingTransfer>, ApiError>>>,
    /// `None` makes `list_devices` fail.
    pub devices: Mutex<Option<Vec<Device>>>,
    pub notify_fails: AtomicBool,
    pub register_calls: Mutex<Vec<RegisterRequest>>,
    pub pending_calls: Mutex<Vec<String>>,
    pub clear_calls: Mutex<Vec<ClearRequest>>,
    pub notify_calls: Mutex<Vec<NotifyRequest>>,
    pub list_calls: Mutex<usize>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_register(&self, result: Result<Device, ApiError>) {
        self.register_results.lock().unwrap().push_back(result);
    }

    pub fn push_pending(&self, result: Result<Option<PendingTransfer>, ApiError>) {
        self.pending_results.lock().unwrap().push_back(result);
    }

    pub fn set_devices(&self, devices: Option<Vec<Device>>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn list_count(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

impl DeviceApi for MockApi {
    fn register(&self, req: &RegisterRequest) -> ApiFuture<'_, Device> {
        self.register_calls.lock().unwrap().push(req.clone());
        let result = self
            .register_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(failure()));
        Box::pin(async move { result })
    }

    fn pending(&self, device_id: &str) -> ApiFuture<'_, Option<PendingTransfer>> {
        self.pending_calls.lock().unwrap().push(device_id.to_string());
        let result = self
            .pending_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None));
        Box::pin(async move { result })
    }

    fn clear(&self, req: &ClearRequest) -> ApiFuture<'_, ()> {
        self.clear_calls.lock().unwrap().push(req.clone());
        Box::pin(async { Ok(()) })
    }

    fn list_devices(&self) -> ApiFuture<'_, Vec<Device>> {
        *self.list_calls.lock().unwrap() += 1;
        let devices = self.devices.lock().unwrap().clone();
        Box::pin(async move { devices.ok_or_else(failure) })
    }

    fn notify(&self, req: &NotifyRequest) -> ApiFuture<'_, ()> {
        self.notify_calls.lock().unwrap().push(req.clone());
        let fails = self.notify_fails.load(Ordering::SeqCst);
        Box::pin(async move { if fails { Err(failure()) } else { Ok(()) } })
    }

    fn origin(&self) -> String {
        "http://share.local:8080".into()
    }
}

/// Identity backed by `api`, with an optional stored id.
pub(crate) fn identity(api: Arc<MockApi>, stored: Option<&str>) -> DeviceIdentity {
    let store = match stored {
        Some(id) => MemoryIdStore::with_id(id),
        None => MemoryIdStore::new(),
    };
    DeviceIdentity::new(
        api,
        Arc::new(store),
        Arc::new(NoDocumentRoot),
        ClientInfo {
            platform: "Linux".into(),
            user_agent: "peershare/test".into(),
        },
    )
}

pub(crate) fn pending(transfer_id: &str) -> PendingTransfer {
    PendingTransfer {
        transfer_id: transfer_id.into(),
        token: format!("tok-{transfer_id}"),
        file_name: "report.pdf".into(),
        file_size: 1572864,
        mime: "application/pdf".into(),
        files: Vec::new(),
        sent_at: None,
    }
}

#[derive(Default)]
pub(crate) struct MockClipboard {
    pub available: bool,
    pub written: Mutex<Vec<String>>,
    pub selected: Mutex<Vec<String>>,
}

impl Clipboard for MockClipboard {
    fn is_available(&self) -> bool {
        self.available
    }

    fn write_text(&self, text: &str) -> PlatformFuture<'_, ()> {
        self.written.lock().unwrap().push(text.to_string());
        Box::pin(async { Ok(()) })
    }

    fn copy_via_selection(&self, text: &str) -> Result<(), PlatformError> {
        self.selected.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockNavigator {
    pub visited: Mutex<Vec<String>>,
}

impl Navigator for MockNavigator {
    fn navigate(&self, url: &str) -> Result<(), PlatformError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockDialogs {
    pub alerts: Mutex<Vec<String>>,
}

impl Dialogs for MockDialogs {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

/// Captures scan requests so tests can deliver results by hand.
#[derive(Default)]
pub(crate) struct MockLauncher {
    pub opened: Mutex<Vec<ScanOptions>>,
}

impl MockLauncher {
    pub fn last_message(&self) -> Option<String> {
        self.opened.lock().unwrap().last()?.message.clone()
    }

    /// Feeds `data` to the most recent scan's callback.
    pub fn deliver(&self, data: &str) {
        let callback = self
            .opened
            .lock()
            .unwrap()
            .last_mut()
            .and_then(|o| o.on_result.take());
        if let Some(callback) = callback {
            callback(data.to_string());
        }
    }
}

impl ScanLauncher for MockLauncher {
    fn open(&self, options: ScanOptions) {
        self.opened.lock().unwrap().push(options);
    }
}

/// What a device view was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeviceEvent {
    Listener(String),
    ClearInput,
    Incoming(TransferSummary),
    HideIncoming,
}

#[derive(Default)]
pub(crate) struct RecordingDeviceView {
    pub events: Mutex<Vec<DeviceEvent>>,
}

impl RecordingDeviceView {
    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn incoming_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Incoming(_)))
            .count()
    }
}

impl crate::device::DeviceView for RecordingDeviceView {
    fn show_listener(&self, device_id: &str) {
        self.events
            .lock()
            .unwrap()
            .push(DeviceEvent::Listener(device_id.to_string()));
    }

    fn clear_name_input(&self) {
        self.events.lock().unwrap().push(DeviceEvent::ClearInput);
    }

    fn show_incoming(&self, summary: &TransferSummary) {
        self.events
            .lock()
            .unwrap()
            .push(DeviceEvent::Incoming(summary.clone()));
    }

    fn hide_incoming(&self) {
        self.events.lock().unwrap().push(DeviceEvent::HideIncoming);
    }
}

#[derive(Default)]
pub(crate) struct RecordingShareView {
    pub qr: Mutex<Vec<String>>,
    pub rosters: Mutex<Vec<DeviceRoster>>,
    pub copy_labels: Mutex<Vec<String>>,
    pub buttons: Mutex<Vec<(String, ButtonState)>>,
}

impl RecordingShareView {
    pub fn last_roster(&self) -> Option<DeviceRoster> {
        self.rosters.lock().unwrap().last().cloned()
    }

    pub fn button_history(&self, device_id: &str) -> Vec<(String, bool)> {
        self.buttons
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == device_id)
            .map(|(_, b)| (b.label.clone(), b.enabled))
            .collect()
    }
}

impl ShareView for RecordingShareView {
    fn render_qr(&self, svg: &str) {
        self.qr.lock().unwrap().push(svg.to_string());
    }

    fn render_roster(&self, roster: &DeviceRoster) {
        self.rosters.lock().unwrap().push(roster.clone());
    }

    fn set_copy_label(&self, label: &str) {
        self.copy_labels.lock().unwrap().push(label.to_string());
    }

    fn set_notify_button(&self, device_id: &str, button: &ButtonState) {
        self.buttons
            .lock()
            .unwrap()
            .push((device_id.to_string(), button.clone()));
    }
}

/// Lets spawned tasks run to their next await point.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
