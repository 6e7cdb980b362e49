//! Terminal implementations of the page views and platform traits.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use peershare_pages::share::COPY_LABEL;
use peershare_pages::{ButtonState, DeviceRoster, DeviceView, ShareView};
use peershare_platform::{Clipboard, Dialogs, DocumentRoot, Navigator, PlatformError, PlatformFuture};
use peershare_protocol::{Device, TransferSummary};
use peershare_scanner::{ScannerView, render_text};

pub struct TerminalDeviceView;

impl DeviceView for TerminalDeviceView {
    fn show_listener(&self, device_id: &str) {
        println!("Listening for transfers as device {device_id}");
        println!("Commands: [o]pen, [d]ismiss, [c]opy id, [n]ame <name>, [q]uit");
    }

    fn clear_name_input(&self) {}

    fn show_incoming(&self, summary: &TransferSummary) {
        println!();
        println!("Incoming transfer: {}", summary.name);
        println!("  {}", summary.detail_line());
        println!("  [o]pen or [d]ismiss");
    }

    fn hide_incoming(&self) {
        debug!("incoming transfer popup closed");
    }
}

/// Prints the share QR code and roster. Remembers the last roster so
/// devices can be picked by number.
pub struct TerminalShareView {
    link: String,
    svg_out: Option<PathBuf>,
    roster: Mutex<Vec<Device>>,
}

impl TerminalShareView {
    pub fn new(link: impl Into<String>, svg_out: Option<PathBuf>) -> Self {
        Self {
            link: link.into(),
            svg_out,
            roster: Mutex::new(Vec::new()),
        }
    }

    /// Resolves a 1-based roster number, or passes an id through.
    pub fn resolve(&self, selector: &str) -> Option<String> {
        let roster = self.roster.lock().ok()?;
        match selector.parse::<usize>() {
            Ok(n) if n >= 1 => roster.get(n - 1).map(|d| d.id.clone()),
            _ => roster.iter().find(|d| d.id == selector).map(|d| d.id.clone()),
        }
    }
}

impl ShareView for TerminalShareView {
    fn render_qr(&self, svg: &str) {
        if let Some(path) = &self.svg_out {
            match std::fs::write(path, svg) {
                Ok(()) => println!("QR code written to {}", path.display()),
                Err(e) => warn!(error = %e, path = %path.display(), "unable to write QR code"),
            }
        }
        match render_text(&self.link) {
            Ok(text) => println!("{text}"),
            Err(e) => warn!(error = %e, "unable to render QR code for terminal"),
        }
        println!("Share link: {}", self.link);
    }

    fn render_roster(&self, roster: &DeviceRoster) {
        let devices = match roster {
            DeviceRoster::Empty { message } => {
                println!("{message}");
                Vec::new()
            }
            DeviceRoster::Devices(devices) => {
                println!("Devices:");
                for (i, device) in devices.iter().enumerate() {
                    println!("  {}. {} ({})", i + 1, device.name, device.id);
                }
                devices.clone()
            }
        };
        if let Ok(mut current) = self.roster.lock() {
            *current = devices;
        }
    }

    fn set_copy_label(&self, label: &str) {
        if label != COPY_LABEL {
            println!("{label}");
        }
    }

    fn set_notify_button(&self, device_id: &str, button: &ButtonState) {
        if button.enabled {
            debug!(device = %device_id, label = %button.label, "send button ready");
        } else {
            println!("{device_id}: {}", button.label);
        }
    }
}

/// Copies through the terminal (OSC 52) when attached to one, falling back
/// to printing the text.
pub struct TerminalClipboard;

impl Clipboard for TerminalClipboard {
    fn is_available(&self) -> bool {
        std::io::stdout().is_terminal()
    }

    fn write_text(&self, text: &str) -> PlatformFuture<'_, ()> {
        let sequence = format!("\x1b]52;c;{}\x07", STANDARD.encode(text));
        Box::pin(async move {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(sequence.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| PlatformError::Clipboard(e.to_string()))
        })
    }

    fn copy_via_selection(&self, text: &str) -> Result<(), PlatformError> {
        println!("{text}");
        Ok(())
    }
}

/// Opens URLs in the default browser.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &str) -> Result<(), PlatformError> {
        println!("Opening {url}");
        open::that(url).map_err(|e| PlatformError::Navigation(e.to_string()))
    }
}

pub struct TerminalDialogs;

impl Dialogs for TerminalDialogs {
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Logs root annotations at debug level.
pub struct LogRoot;

impl DocumentRoot for LogRoot {
    fn set_data(&self, key: &str, value: &str) {
        debug!(key, value, "root annotation");
    }
}

pub struct TerminalScannerView;

impl ScannerView for TerminalScannerView {
    fn build(&self) {}

    fn show(&self, message: &str) {
        println!("{message}");
    }

    fn hide(&self) {
        debug!("scanner closed");
    }
}
