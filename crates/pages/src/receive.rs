//! Receive page: scan a sender's QR code and open the transfer.

use std::sync::Arc;

use tracing::{debug, warn};

use peershare_platform::Navigator;
use peershare_scanner::ScanOptions;

use crate::ScanLauncher;

pub const RECEIVE_SCAN_MESSAGE: &str = "Scan the sender's QR code to open the transfer.";

/// Scan options that navigate to whatever non-empty payload is read.
pub(crate) fn navigate_on_scan(message: &str, navigator: Arc<dyn Navigator>) -> ScanOptions {
    ScanOptions::new(message, move |data| {
        if data.is_empty() {
            debug!("scanned an empty payload");
            return;
        }
        if let Err(e) = navigator.navigate(&data) {
            warn!(error = %e, "unable to open scanned link");
        }
    })
}

pub struct ReceivePage {
    scanner: Arc<dyn ScanLauncher>,
    navigator: Arc<dyn Navigator>,
}

impl ReceivePage {
    pub fn new(scanner: Arc<dyn ScanLauncher>, navigator: Arc<dyn Navigator>) -> Self {
        Self { scanner, navigator }
    }

    /// Opens the scanner; a successful scan navigates to the payload.
    pub fn scan(&self) {
        self.scanner.open(navigate_on_scan(
            RECEIVE_SCAN_MESSAGE,
            self.navigator.clone(),
        ));
    }
}
