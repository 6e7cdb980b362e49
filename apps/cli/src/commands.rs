//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use peershare_api::{DeviceApi, HttpDeviceApi};
use peershare_identity::{ClientInfo, DeviceIdentity, FileIdStore, IdStore, UnsupportedIdStore};
use peershare_pages::{DevicePage, ReceivePage, SharePage};
use peershare_platform::{Navigator, PlatformError};
use peershare_protocol::ShareConfig;
use peershare_scanner::{IntervalClock, QrScanner, RqrrDecoder};

use crate::camera::{ImageCamera, load_frame};
use crate::config::ClientConfig;
use crate::terminal::{
    BrowserNavigator, LogRoot, TerminalClipboard, TerminalDeviceView, TerminalDialogs,
    TerminalScannerView, TerminalShareView,
};

const USER_AGENT: &str = concat!("peershare-cli/", env!("CARGO_PKG_VERSION"));

/// Still images don't change, so there is no point decoding at frame rate.
const STILL_SCAN_PERIOD: Duration = Duration::from_millis(200);

fn build_api(config: &ClientConfig) -> Result<Arc<HttpDeviceApi>> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(10))
        .build()?;
    let api = HttpDeviceApi::new(client, &config.server_url)
        .with_context(|| format!("invalid server URL {}", config.server_url))?;
    Ok(Arc::new(api))
}

fn build_identity(config: &ClientConfig, api: Arc<dyn DeviceApi>) -> DeviceIdentity {
    let store: Arc<dyn IdStore> = match FileIdStore::open(config.id_store.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, path = %config.id_store.display(), "device id will not be persisted");
            Arc::new(UnsupportedIdStore)
        }
    };
    DeviceIdentity::new(api, store, Arc::new(LogRoot), ClientInfo::native(USER_AGENT))
}

fn build_scanner(camera: Arc<ImageCamera>) -> QrScanner {
    QrScanner::new(
        camera,
        Arc::new(TerminalScannerView),
        Arc::new(TerminalDialogs),
        Arc::new(RqrrDecoder),
        Arc::new(IntervalClock::new(STILL_SCAN_PERIOD)),
    )
}

/// `(command, argument)` from an input line.
fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    }
}

/// Feeds stdin lines to `handle` until it returns `false`, stdin closes,
/// or Ctrl-C.
async fn read_commands<F, Fut>(mut handle: F) -> Result<()>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !handle(line).await {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Registers this device and waits for incoming transfers.
pub async fn listen(config: &ClientConfig, name: Option<String>) -> Result<()> {
    let api = build_api(config)?;
    let identity = build_identity(config, api.clone());
    let page = DevicePage::new(
        api,
        Arc::new(TerminalDeviceView),
        Arc::new(TerminalClipboard),
        Arc::new(BrowserNavigator),
        Arc::new(TerminalDialogs),
        config.device_page(),
    );

    page.attach(&identity);
    identity.init().await;
    if page.device_id().is_none() {
        bail!("unable to obtain a device id from {}", config.server_url);
    }

    if let Some(name) = name.or_else(|| config.device_name.clone())
        && let Err(e) = page.submit_name(&name).await
    {
        debug!(error = %e, "keeping the automatic device name");
    }

    let page = &page;
    read_commands(|line| async move {
        match split_command(&line) {
            ("", _) => {}
            ("o" | "open", _) => {
                if page.open_transfer().is_none() {
                    println!("No pending transfer");
                }
            }
            ("d" | "dismiss", _) => page.dismiss_transfer(),
            ("c" | "copy", _) => {
                if page.copy_device_id().await.is_some() {
                    println!("Device id copied");
                }
            }
            ("n" | "name", name) => {
                let _ = page.submit_name(name).await;
            }
            ("q" | "quit", _) => return false,
            (other, _) => println!("Unknown command: {other}"),
        }
        true
    })
    .await?;

    page.stop_polling();
    info!("listener stopped");
    Ok(())
}

/// Shows a share link and notifies other devices on request.
pub async fn share(config: &ClientConfig, share: ShareConfig, svg: Option<PathBuf>) -> Result<()> {
    let api = build_api(config)?;
    let identity = build_identity(config, api.clone());
    let view = Arc::new(TerminalShareView::new(share.share_link.clone(), svg));
    let camera = Arc::new(ImageCamera::default());
    let scanner = build_scanner(camera.clone());
    let page = SharePage::new(
        share,
        api,
        view.clone(),
        Arc::new(TerminalClipboard),
        Arc::new(BrowserNavigator),
        Arc::new(scanner.clone()),
        config.share_page(),
    );

    page.init(&identity);
    identity.init().await;
    println!("Commands: [s]end <number|id>, [c]opy link, [r]efresh, scan <image>, [q]uit");

    let (page, view, camera, scanner) = (&page, &view, &camera, &scanner);
    read_commands(|line| async move {
        match split_command(&line) {
            ("", _) => {}
            ("s" | "send", selector) => match view.resolve(selector) {
                Some(id) => {
                    let _ = page.notify_device(&id).await;
                }
                None => println!("No such device: {selector}"),
            },
            ("c" | "copy", _) => {
                let _ = page.copy_link().await;
            }
            ("r" | "refresh", _) => {
                page.refresh_devices().await;
            }
            ("scan", path) if !path.is_empty() => {
                camera.set_source(path);
                page.open_scanner();
                close_after(scanner.clone(), Duration::from_secs(5));
            }
            ("q" | "quit", _) => return false,
            (other, _) => println!("Unknown command: {other}"),
        }
        true
    })
    .await
}

/// Closes `scanner` if it is still open after `timeout`.
fn close_after(scanner: QrScanner, timeout: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if scanner.is_open() {
            println!("No QR code found");
            scanner.close();
        }
    });
}

/// Reads a transfer QR code from `image` and opens it.
pub async fn receive(image: &Path, timeout: Duration) -> Result<()> {
    let url = scan_link(image, timeout).await?;
    BrowserNavigator.navigate(&url)?;
    Ok(())
}

/// Forwards navigations to a channel instead of a browser.
struct ChannelNavigator(mpsc::UnboundedSender<String>);

impl Navigator for ChannelNavigator {
    fn navigate(&self, url: &str) -> Result<(), PlatformError> {
        self.0
            .send(url.to_string())
            .map_err(|e| PlatformError::Navigation(e.to_string()))
    }
}

/// Runs the receive page against a still image and returns the link it
/// would open.
pub async fn scan_link(image: &Path, timeout: Duration) -> Result<String> {
    load_frame(image)?;

    let scanner = build_scanner(Arc::new(ImageCamera::new(Some(image.to_path_buf()))));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let page = ReceivePage::new(Arc::new(scanner.clone()), Arc::new(ChannelNavigator(tx)));
    page.scan();

    match tokio::time::timeout(timeout, rx.recv()).await {
        Ok(Some(url)) => Ok(url),
        _ => {
            scanner.close();
            bail!("no QR code found in {}", image.display())
        }
    }
}

/// Prints every registered device.
pub async fn devices(config: &ClientConfig) -> Result<()> {
    let api = build_api(config)?;
    let devices = api.list_devices().await?;
    if devices.is_empty() {
        println!("No devices registered");
        return Ok(());
    }
    for device in devices {
        let seen = device
            .last_seen
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        println!("{:<24} {:<32} {}", device.id, device.name, seen);
    }
    Ok(())
}
