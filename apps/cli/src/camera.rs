//! A camera that "films" a still image, for scanning QR codes from files.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use peershare_scanner::{
    Camera, CameraError, CameraFuture, FacingMode, LumaFrame, ReadyState, VideoStream,
};

/// Serves frames from an image file chosen before each scan.
#[derive(Default)]
pub struct ImageCamera {
    source: Mutex<Option<PathBuf>>,
}

impl ImageCamera {
    pub fn new(source: Option<PathBuf>) -> Self {
        Self {
            source: Mutex::new(source),
        }
    }

    pub fn set_source(&self, path: impl Into<PathBuf>) {
        if let Ok(mut source) = self.source.lock() {
            *source = Some(path.into());
        }
    }
}

impl Camera for ImageCamera {
    fn is_supported(&self) -> bool {
        self.source.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    fn open(&self, facing: FacingMode) -> CameraFuture<'_, Box<dyn VideoStream>> {
        let source = self.source.lock().ok().and_then(|s| s.clone());
        Box::pin(async move {
            let path = source.ok_or(CameraError::Unsupported)?;
            debug!(path = %path.display(), ?facing, "opening image camera");
            let frame = tokio::task::spawn_blocking(move || load_frame(&path))
                .await
                .map_err(|e| CameraError::Acquisition(e.to_string()))??;
            Ok(Box::new(StillStream {
                frame: Some(frame),
                playing: false,
            }) as Box<dyn VideoStream>)
        })
    }
}

/// Decodes an image file into a grayscale frame.
pub fn load_frame(path: &Path) -> Result<LumaFrame, CameraError> {
    let image = image::open(path)
        .map_err(|e| CameraError::Acquisition(format!("{}: {e}", path.display())))?
        .into_luma8();
    let (width, height) = image.dimensions();
    LumaFrame::new(width, height, image.into_raw())
        .ok_or_else(|| CameraError::Acquisition("unexpected image buffer size".into()))
}

struct StillStream {
    frame: Option<LumaFrame>,
    playing: bool,
}

impl VideoStream for StillStream {
    fn play(&mut self) {
        self.playing = true;
    }

    fn ready_state(&self) -> ReadyState {
        match (&self.frame, self.playing) {
            (Some(_), true) => ReadyState::HaveEnoughData,
            (Some(_), false) => ReadyState::HaveMetadata,
            (None, _) => ReadyState::HaveNothing,
        }
    }

    fn capture(&mut self) -> Option<LumaFrame> {
        self.frame.clone()
    }

    fn stop(&mut self) {
        self.frame = None;
        self.playing = false;
    }
}
