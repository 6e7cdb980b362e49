//! Host platform collaborators.
//!
//! Everything a page needs from its host that is not the device API:
//! clipboard access, navigation, blocking alerts, and the document root
//! used for debugging hooks. Front-ends implement these traits; the page
//! crates only see the traits.

pub mod clipboard;
pub mod error;

use std::future::Future;
use std::pin::Pin;

pub use clipboard::{Clipboard, CopyMethod, copy_text};
pub use error::PlatformError;

/// Boxed future returned by async platform calls.
pub type PlatformFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, PlatformError>> + Send + 'a>>;

/// Moves the host to another location.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str) -> Result<(), PlatformError>;
}

/// Blocking user-facing messages.
pub trait Dialogs: Send + Sync {
    fn alert(&self, message: &str);
}

/// Root element annotations, e.g. `data-device-id`.
pub trait DocumentRoot: Send + Sync {
    fn set_data(&self, key: &str, value: &str);
}

/// A [`DocumentRoot`] that discards annotations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDocumentRoot;

impl DocumentRoot for NoDocumentRoot {
    fn set_data(&self, _key: &str, _value: &str) {}
}
