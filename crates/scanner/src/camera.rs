//! Camera, video stream and frame clock abstractions.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by [`Camera::open`].
pub type CameraFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CameraError>> + Send + 'a>>;

/// Errors from camera acquisition.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera not supported")]
    Unsupported,

    #[error("camera access denied")]
    Denied,

    #[error("camera error: {0}")]
    Acquisition(String),
}

/// Which camera to request. The scanner always asks for the rear one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    Environment,
}

/// How much video data is buffered, mirroring media element ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// One grayscale video frame, row-major, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl LumaFrame {
    /// Wraps raw luma bytes; `None` when the length doesn't match.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn luma(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width as usize + x]
    }
}

/// A live camera stream attached to the scanner's video element.
pub trait VideoStream: Send {
    /// Starts playback once metadata is available.
    fn play(&mut self);

    fn ready_state(&self) -> ReadyState;

    /// Draws the current frame off-screen and returns its pixels.
    fn capture(&mut self) -> Option<LumaFrame>;

    /// Stops every track of the stream.
    fn stop(&mut self);
}

/// Host camera access.
pub trait Camera: Send + Sync {
    /// Whether the host exposes a camera API at all.
    fn is_supported(&self) -> bool;

    fn open(&self, facing: FacingMode) -> CameraFuture<'_, Box<dyn VideoStream>>;
}

/// Paces the scan loop, one tick per rendered frame.
pub trait FrameClock: Send + Sync {
    fn next_frame(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// [`FrameClock`] ticking at a fixed period.
#[derive(Debug, Clone, Copy)]
pub struct IntervalClock {
    period: Duration,
}

impl IntervalClock {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl Default for IntervalClock {
    /// Roughly one display refresh at 60 Hz.
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

impl FrameClock for IntervalClock {
    fn next_frame(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(self.period))
    }
}
