//! Page logic for PeerShare front-ends.
//!
//! Each page is a plain struct over injected collaborators: the device API,
//! the host platform, and a view trait the front-end renders. The pages own
//! their timers (Tokio tasks) and cancel them when dropped.
//!
//! - [`DevicePage`] registers a display name and surfaces incoming transfers.
//! - [`SharePage`] shows the share QR code and notifies other devices.
//! - [`ReceivePage`] opens a scanned transfer link.

pub mod device;
pub mod receive;
pub mod share;

#[cfg(test)]
pub(crate) mod testing;

use peershare_scanner::{QrScanner, ScanOptions};

pub use device::{DevicePage, DevicePageConfig, DeviceView};
pub use receive::ReceivePage;
pub use share::{ButtonState, DeviceRoster, SharePage, SharePageConfig, ShareView};

/// Something that can run a QR scan and report its payload.
pub trait ScanLauncher: Send + Sync {
    fn open(&self, options: ScanOptions);
}

impl ScanLauncher for QrScanner {
    fn open(&self, options: ScanOptions) {
        QrScanner::open(self, options);
    }
}
