//! Clipboard access with a selection-based fallback.

use tracing::debug;

use crate::PlatformFuture;
use crate::error::PlatformError;

/// Host clipboard.
///
/// `write_text` is the asynchronous platform API and may be missing
/// (`is_available() == false`) or refuse the write. `copy_via_selection`
/// is the synchronous fallback that selects the text in a hidden element
/// and issues a copy command.
pub trait Clipboard: Send + Sync {
    fn is_available(&self) -> bool;

    fn write_text(&self, text: &str) -> PlatformFuture<'_, ()>;

    fn copy_via_selection(&self, text: &str) -> Result<(), PlatformError>;
}

/// Which mechanism ended up copying the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Clipboard,
    Selection,
}

/// Copies `text`, preferring the clipboard API and falling back to the
/// selection trick when the API is missing or rejects the write.
pub async fn copy_text(clipboard: &dyn Clipboard, text: &str) -> Result<CopyMethod, PlatformError> {
    if clipboard.is_available() {
        match clipboard.write_text(text).await {
            Ok(()) => return Ok(CopyMethod::Clipboard),
            Err(e) => debug!(error = %e, "clipboard write rejected, using selection fallback"),
        }
    }
    clipboard.copy_via_selection(text)?;
    Ok(CopyMethod::Selection)
}
