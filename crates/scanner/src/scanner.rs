//! Reusable QR scanning modal.
//!
//! One scan session at a time: a new `open` takes over whatever session is
//! running (the newest result callback wins). `close` is the only way to
//! cancel, and it always leaves the camera stopped and no frame pending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use peershare_platform::Dialogs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::camera::{Camera, CameraError, FacingMode, FrameClock, ReadyState, VideoStream};
use crate::decode::QrDecoder;

/// Receives the decoded payload of a successful scan.
pub type ResultCallback = Box<dyn FnOnce(String) + Send>;

/// Shown when no message is supplied.
pub const DEFAULT_MESSAGE: &str = "Point your camera at the QR code.";

/// Alert shown when the host has no camera API.
pub const CAMERA_UNSUPPORTED_ALERT: &str = "Camera access is not supported in this browser.";

/// Alert shown when the user refuses camera access.
pub const CAMERA_DENIED_ALERT: &str = "Camera access was denied.";

/// The modal's visible surface.
pub trait ScannerView: Send + Sync {
    /// Builds the overlay. Called once per scanner, before the first `show`.
    fn build(&self);

    fn show(&self, message: &str);

    fn hide(&self);
}

/// Arguments for [`QrScanner::open`].
#[derive(Default)]
pub struct ScanOptions {
    pub message: Option<String>,
    pub on_result: Option<ResultCallback>,
}

impl ScanOptions {
    pub fn new(message: impl Into<String>, on_result: impl FnOnce(String) + Send + 'static) -> Self {
        Self {
            message: Some(message.into()),
            on_result: Some(Box::new(on_result)),
        }
    }
}

#[derive(Default)]
struct Session {
    /// Bumped on every `open`; stale camera grants and scan loops compare against it.
    generation: u64,
    open: bool,
    stream: Option<Box<dyn VideoStream>>,
    on_result: Option<ResultCallback>,
    scan: Option<CancellationToken>,
}

struct Inner {
    camera: Arc<dyn Camera>,
    view: Arc<dyn ScannerView>,
    dialogs: Arc<dyn Dialogs>,
    decoder: Arc<dyn QrDecoder>,
    clock: Arc<dyn FrameClock>,
    built: AtomicBool,
    session: Mutex<Session>,
}

/// Camera QR scanner. Cheap to clone; clones share one modal.
#[derive(Clone)]
pub struct QrScanner {
    inner: Arc<Inner>,
}

impl QrScanner {
    pub fn new(
        camera: Arc<dyn Camera>,
        view: Arc<dyn ScannerView>,
        dialogs: Arc<dyn Dialogs>,
        decoder: Arc<dyn QrDecoder>,
        clock: Arc<dyn FrameClock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                camera,
                view,
                dialogs,
                decoder,
                clock,
                built: AtomicBool::new(false),
                session: Mutex::new(Session::default()),
            }),
        }
    }

    /// Shows the modal and starts scanning once the camera is granted.
    ///
    /// Must be called inside a Tokio runtime: camera acquisition and the
    /// scan loop run on a spawned task.
    pub fn open(&self, options: ScanOptions) {
        let inner = &self.inner;
        if !inner.built.swap(true, Ordering::SeqCst) {
            inner.view.build();
        }
        if !inner.camera.is_supported() {
            inner.dialogs.alert(CAMERA_UNSUPPORTED_ALERT);
            return;
        }

        let generation = {
            let Ok(mut session) = inner.session.lock() else {
                return;
            };
            stop_session(&mut session);
            session.generation += 1;
            session.open = true;
            session.on_result = options.on_result;
            session.generation
        };

        let message = options.message.as_deref().unwrap_or(DEFAULT_MESSAGE);
        inner.view.show(message);
        debug!(generation, "scanner opened");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let stream = match inner.camera.open(FacingMode::Environment).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!(error = %e, "camera error");
                    if inner.is_current(generation) {
                        if matches!(e, CameraError::Denied) {
                            inner.dialogs.alert(CAMERA_DENIED_ALERT);
                        }
                        inner.close();
                    }
                    return;
                }
            };
            let Some(token) = inner.attach_stream(generation, stream) else {
                return;
            };
            inner.scan_loop(generation, token).await;
        });
    }

    /// Hides the modal, cancels the scan loop and stops the camera.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .session
            .lock()
            .map(|s| s.open)
            .unwrap_or(false)
    }

    /// Whether a scan loop is scheduled.
    pub fn is_scanning(&self) -> bool {
        self.inner
            .session
            .lock()
            .map(|s| s.scan.as_ref().is_some_and(|t| !t.is_cancelled()))
            .unwrap_or(false)
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.session
            .lock()
            .map(|s| s.open && s.generation == generation)
            .unwrap_or(false)
    }

    /// Installs a freshly granted stream, or stops it if the session it
    /// was requested for is gone.
    fn attach_stream(
        &self,
        generation: u64,
        mut stream: Box<dyn VideoStream>,
    ) -> Option<CancellationToken> {
        let Ok(mut session) = self.session.lock() else {
            stream.stop();
            return None;
        };
        if !session.open || session.generation != generation {
            debug!(generation, "camera granted after close, stopping it");
            stream.stop();
            return None;
        }
        stream.play();
        session.stream = Some(stream);
        let token = CancellationToken::new();
        session.scan = Some(token.clone());
        Some(token)
    }

    async fn scan_loop(&self, generation: u64, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                return;
            }
            if let Some(payload) = self.scan_frame(generation) {
                let callback = match self.session.lock() {
                    Ok(mut s) if s.generation == generation && s.open => {
                        let callback = s.on_result.take();
                        stop_session(&mut s);
                        callback
                    }
                    _ => {
                        debug!(generation, "decoded a frame for a replaced session, discarding");
                        return;
                    }
                };
                self.view.hide();
                info!("QR code scanned");
                if let Some(callback) = callback {
                    callback(payload);
                }
                return;
            }
            tokio::select! {
                _ = token.cancelled() => return,
                _ = self.clock.next_frame() => {}
            }
        }
    }

    /// Grabs and decodes one frame. `None` on a miss or while the video
    /// is still buffering.
    fn scan_frame(&self, generation: u64) -> Option<String> {
        let frame = {
            let mut session = self.session.lock().ok()?;
            if session.generation != generation {
                return None;
            }
            let stream = session.stream.as_mut()?;
            if stream.ready_state() != ReadyState::HaveEnoughData {
                return None;
            }
            stream.capture()?
        };
        self.decoder.decode(&frame)
    }

    fn close(&self) {
        self.view.hide();
        match self.session.lock() {
            Ok(mut session) => stop_session(&mut session),
            Err(_) => warn!("scanner session lock poisoned"),
        }
    }
}

fn stop_session(session: &mut Session) {
    session.open = false;
    if let Some(token) = session.scan.take() {
        token.cancel();
    }
    if let Some(mut stream) = session.stream.take() {
        stream.stop();
    }
    session.on_result = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use crate::camera::{CameraFuture, IntervalClock, LumaFrame};

    #[derive(Default)]
    struct StreamLog {
        played: bool,
        stopped: bool,
        captures: usize,
    }

    /// Stream that never gets past metadata while `buffering`.
    struct MockStream {
        log: Arc<Mutex<StreamLog>>,
        buffering: bool,
    }

    impl VideoStream for MockStream {
        fn play(&mut self) {
            self.log.lock().unwrap().played = true;
        }

        fn ready_state(&self) -> ReadyState {
            if self.buffering {
                ReadyState::HaveMetadata
            } else {
                ReadyState::HaveEnoughData
            }
        }

        fn capture(&mut self) -> Option<LumaFrame> {
            self.log.lock().unwrap().captures += 1;
            LumaFrame::new(1, 1, vec![0])
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().stopped = true;
        }
    }

    enum Grant {
        Stream { buffering: bool },
        Deny,
        Fail,
        /// Resolves only after the given delay.
        Slow(Duration),
    }

    struct MockCamera {
        supported: bool,
        grant: Grant,
        log: Arc<Mutex<StreamLog>>,
        opened: Mutex<Vec<FacingMode>>,
    }

    impl MockCamera {
        fn new(grant: Grant) -> Arc<Self> {
            Arc::new(Self {
                supported: true,
                grant,
                log: Arc::new(Mutex::new(StreamLog::default())),
                opened: Mutex::new(Vec::new()),
            })
        }
    }

    impl Camera for MockCamera {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn open(&self, facing: FacingMode) -> CameraFuture<'_, Box<dyn VideoStream>> {
            self.opened.lock().unwrap().push(facing);
            let log = self.log.clone();
            Box::pin(async move {
                let buffering = match self.grant {
                    Grant::Stream { buffering } => buffering,
                    Grant::Deny => return Err(CameraError::Denied),
                    Grant::Fail => return Err(CameraError::Acquisition("busy".into())),
                    Grant::Slow(delay) => {
                        tokio::time::sleep(delay).await;
                        false
                    }
                };
                Ok(Box::new(MockStream { log, buffering }) as Box<dyn VideoStream>)
            })
        }
    }

    type DecodeHook = Box<dyn FnOnce() + Send>;

    /// Yields scripted results frame by frame, then misses forever.
    struct ScriptedDecoder {
        results: Mutex<VecDeque<Option<String>>>,
        calls: Mutex<usize>,
        /// Runs inside the first decode, before its result is returned.
        on_first_decode: Mutex<Option<DecodeHook>>,
    }

    impl ScriptedDecoder {
        fn new(results: Vec<Option<&str>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into_iter().map(|r| r.map(String::from)).collect()),
                calls: Mutex::new(0),
                on_first_decode: Mutex::new(None),
            })
        }
    }

    impl QrDecoder for ScriptedDecoder {
        fn decode(&self, _frame: &LumaFrame) -> Option<String> {
            *self.calls.lock().unwrap() += 1;
            let hook = self.on_first_decode.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
            self.results.lock().unwrap().pop_front().flatten()
        }
    }

    #[derive(Default)]
    struct MockView {
        builds: Mutex<usize>,
        shown: Mutex<Vec<String>>,
        hides: Mutex<usize>,
    }

    impl ScannerView for MockView {
        fn build(&self) {
            *self.builds.lock().unwrap() += 1;
        }

        fn show(&self, message: &str) {
            self.shown.lock().unwrap().push(message.to_string());
        }

        fn hide(&self) {
            *self.hides.lock().unwrap() += 1;
        }
    }

    #[derive(Default)]
    struct MockDialogs {
        alerts: Mutex<Vec<String>>,
    }

    impl Dialogs for MockDialogs {
        fn alert(&self, message: &str) {
            self.alerts.lock().unwrap().push(message.to_string());
        }
    }

    struct Harness {
        scanner: QrScanner,
        camera: Arc<MockCamera>,
        view: Arc<MockView>,
        dialogs: Arc<MockDialogs>,
        decoder: Arc<ScriptedDecoder>,
    }

    fn harness(camera: Arc<MockCamera>, decoder: Arc<ScriptedDecoder>) -> Harness {
        let view = Arc::new(MockView::default());
        let dialogs = Arc::new(MockDialogs::default());
        let scanner = QrScanner::new(
            camera.clone(),
            view.clone(),
            dialogs.clone(),
            decoder.clone(),
            Arc::new(IntervalClock::default()),
        );
        Harness {
            scanner,
            camera,
            view,
            dialogs,
            decoder,
        }
    }

    fn recording_options(message: &str) -> (ScanOptions, Arc<Mutex<Vec<String>>>) {
        let results = Arc::new(Mutex::new(Vec::new()));
        let r = results.clone();
        let options = ScanOptions::new(message, move |data| r.lock().unwrap().push(data));
        (options, results)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn decode_success_delivers_once_and_releases_camera() {
        let h = harness(
            MockCamera::new(Grant::Stream { buffering: false }),
            ScriptedDecoder::new(vec![None, None, Some("http://host/incoming?id=1")]),
        );
        let (options, results) = recording_options("Scan it");

        h.scanner.open(options);
        assert!(h.scanner.is_open());
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(*results.lock().unwrap(), vec!["http://host/incoming?id=1"]);
        assert!(!h.scanner.is_open());
        assert!(!h.scanner.is_scanning());
        let log = h.camera.log.lock().unwrap();
        assert!(log.played);
        assert!(log.stopped);
        assert_eq!(*h.decoder.calls.lock().unwrap(), 3);
        assert_eq!(*h.camera.opened.lock().unwrap(), vec![FacingMode::Environment]);
        assert_eq!(*h.view.shown.lock().unwrap(), vec!["Scan it"]);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_enough_data_before_decoding() {
        let h = harness(
            MockCamera::new(Grant::Stream { buffering: true }),
            ScriptedDecoder::new(vec![Some("never")]),
        );
        let (options, results) = recording_options("Scan");
        h.scanner.open(options);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(results.lock().unwrap().is_empty());
        assert_eq!(*h.decoder.calls.lock().unwrap(), 0);
        assert_eq!(h.camera.log.lock().unwrap().captures, 0);
        assert!(h.scanner.is_scanning());

        h.scanner.close();
        assert!(!h.scanner.is_scanning());
        assert!(h.camera.log.lock().unwrap().stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_loop_and_drops_callback() {
        let h = harness(
            MockCamera::new(Grant::Stream { buffering: false }),
            ScriptedDecoder::new(vec![None]),
        );
        let (options, results) = recording_options("Scan");
        h.scanner.open(options);
        settle().await;
        assert!(h.scanner.is_scanning());

        h.scanner.close();
        h.scanner.close();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(results.lock().unwrap().is_empty());
        assert!(!h.scanner.is_open());
        assert!(!h.scanner.is_scanning());
        assert!(h.camera.log.lock().unwrap().stopped);
        assert!(*h.view.hides.lock().unwrap() >= 2);
        let calls = *h.decoder.calls.lock().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*h.decoder.calls.lock().unwrap(), calls);
    }

    #[tokio::test]
    async fn unsupported_camera_alerts_without_opening() {
        let camera = Arc::new(MockCamera {
            supported: false,
            grant: Grant::Stream { buffering: false },
            log: Arc::new(Mutex::new(StreamLog::default())),
            opened: Mutex::new(Vec::new()),
        });
        let h = harness(camera, ScriptedDecoder::new(vec![]));
        let (options, _results) = recording_options("Scan");
        h.scanner.open(options);

        assert!(!h.scanner.is_open());
        assert!(h.view.shown.lock().unwrap().is_empty());
        assert_eq!(*h.dialogs.alerts.lock().unwrap(), vec![CAMERA_UNSUPPORTED_ALERT]);
        assert!(h.camera.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn denied_camera_alerts_and_closes() {
        let h = harness(MockCamera::new(Grant::Deny), ScriptedDecoder::new(vec![]));
        let (options, _results) = recording_options("Scan");
        h.scanner.open(options);
        settle().await;

        assert!(!h.scanner.is_open());
        assert_eq!(*h.dialogs.alerts.lock().unwrap(), vec![CAMERA_DENIED_ALERT]);
        assert_eq!(*h.view.hides.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn acquisition_error_closes_silently() {
        let h = harness(MockCamera::new(Grant::Fail), ScriptedDecoder::new(vec![]));
        let (options, _results) = recording_options("Scan");
        h.scanner.open(options);
        settle().await;

        assert!(!h.scanner.is_open());
        assert!(h.dialogs.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn late_grant_after_close_is_stopped() {
        let h = harness(
            MockCamera::new(Grant::Slow(Duration::from_secs(1))),
            ScriptedDecoder::new(vec![Some("late")]),
        );
        let (options, results) = recording_options("Scan");
        h.scanner.open(options);
        settle().await;
        h.scanner.close();

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(results.lock().unwrap().is_empty());
        assert!(!h.scanner.is_scanning());
        let log = h.camera.log.lock().unwrap();
        assert!(!log.played);
        assert!(log.stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_built_once_across_opens() {
        let h = harness(
            MockCamera::new(Grant::Stream { buffering: false }),
            ScriptedDecoder::new(vec![Some("a"), Some("b")]),
        );
        let (first, first_results) = recording_options("First");
        h.scanner.open(first);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let (second, second_results) = recording_options("Second");
        h.scanner.open(second);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*h.view.builds.lock().unwrap(), 1);
        assert_eq!(*first_results.lock().unwrap(), vec!["a"]);
        assert_eq!(*second_results.lock().unwrap(), vec!["b"]);
        assert_eq!(*h.view.shown.lock().unwrap(), vec!["First", "Second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reopen_during_decode_keeps_newer_session() {
        let h = harness(
            MockCamera::new(Grant::Stream { buffering: false }),
            ScriptedDecoder::new(vec![Some("first"), Some("second-payload")]),
        );
        let (first, first_results) = recording_options("First");
        let (second, second_results) = recording_options("Second");

        let scanner = h.scanner.clone();
        *h.decoder.on_first_decode.lock().unwrap() = Some(Box::new(move || scanner.open(second)));

        h.scanner.open(first);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(first_results.lock().unwrap().is_empty());
        assert_eq!(*second_results.lock().unwrap(), vec!["second-payload"]);
        assert_eq!(*h.decoder.calls.lock().unwrap(), 2);
        assert_eq!(*h.view.shown.lock().unwrap(), vec!["First", "Second"]);
        assert!(!h.scanner.is_open());
        assert!(!h.scanner.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn denial_for_replaced_session_is_silent() {
        let h = harness(
            MockCamera::new(Grant::Deny),
            ScriptedDecoder::new(vec![]),
        );
        let (first, _first_results) = recording_options("First");
        h.scanner.open(first);
        h.scanner.close();
        settle().await;

        assert!(h.dialogs.alerts.lock().unwrap().is_empty());
        assert!(!h.scanner.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn default_message_when_none_given() {
        let h = harness(
            MockCamera::new(Grant::Stream { buffering: false }),
            ScriptedDecoder::new(vec![]),
        );
        h.scanner.open(ScanOptions::default());
        assert_eq!(*h.view.shown.lock().unwrap(), vec![DEFAULT_MESSAGE]);
        h.scanner.close();
    }
}
