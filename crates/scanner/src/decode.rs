//! QR payload extraction from grayscale frames.

use tracing::trace;

use crate::camera::LumaFrame;

/// Finds a QR payload in a frame.
pub trait QrDecoder: Send + Sync {
    /// `None` when no readable code is in view. A miss is not an error.
    fn decode(&self, frame: &LumaFrame) -> Option<String>;
}

/// [`QrDecoder`] backed by `rqrr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, frame: &LumaFrame) -> Option<String> {
        if frame.width == 0 || frame.height == 0 {
            return None;
        }
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width as usize,
            frame.height as usize,
            |x, y| frame.luma(x, y),
        );
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_, content)) if !content.is_empty() => return Some(content),
                Ok(_) => {}
                Err(e) => trace!(error = ?e, "QR grid found but not decodable"),
            }
        }
        None
    }
}
