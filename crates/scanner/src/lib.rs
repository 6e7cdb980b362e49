//! QR scanning and rendering.
//!
//! [`QrScanner`] is a reusable modal: it opens the environment-facing
//! camera, pulls one frame per tick of its [`FrameClock`], and hands each
//! frame to a [`QrDecoder`] until a payload is found. The first payload
//! closes the modal and is delivered to the caller's callback.

pub mod camera;
pub mod decode;
pub mod encode;
pub mod scanner;

pub use camera::{
    Camera, CameraError, CameraFuture, FacingMode, FrameClock, IntervalClock, LumaFrame,
    ReadyState, VideoStream,
};
pub use decode::{QrDecoder, RqrrDecoder};
pub use encode::{QrError, QrStyle, render_svg, render_text};
pub use scanner::{QrScanner, ResultCallback, ScanOptions, ScannerView};
