/// Errors from host platform calls.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("clipboard write failed: {0}")]
    Clipboard(String),

    #[error("navigation failed: {0}")]
    Navigation(String),
}
