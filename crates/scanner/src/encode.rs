//! QR code rendering for share links.

use qrcode::QrCode;
use qrcode::render::svg;

/// Errors from QR rendering.
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("QR encode error: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// Size and colours of a rendered code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrStyle {
    pub size: u32,
    pub dark: String,
    pub light: String,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            size: 220,
            dark: "#38bdf8".into(),
            light: "#0f172a".into(),
        }
    }
}

/// Renders `text` as an SVG document at least `style.size` pixels square.
pub fn render_svg(text: &str, style: &QrStyle) -> Result<String, QrError> {
    let code = QrCode::new(text.as_bytes())?;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(style.size, style.size)
        .dark_color(svg::Color(&style.dark))
        .light_color(svg::Color(&style.light))
        .build())
}

/// Renders `text` with block characters for terminals.
pub fn render_text(text: &str) -> Result<String, QrError> {
    let code = QrCode::new(text.as_bytes())?;
    Ok(code
        .render::<char>()
        .module_dimensions(2, 1)
        .dark_color('█')
        .light_color(' ')
        .build())
}
