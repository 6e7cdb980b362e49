//! Wire types and helpers for the PeerShare device API.
//!
//! Mirrors the JSON the server exchanges on `/api/devices/*` and the
//! small pieces of presentation logic shared by every front-end
//! (transfer links, size labels, device-name rules).

pub mod constants;
pub mod format;
pub mod messages;
pub mod types;

pub use format::{NameError, format_megabytes, normalize_device_name, transfer_url};
pub use messages::{ClearRequest, NotifyRequest, RegisterRequest};
pub use types::{Device, PendingFile, PendingTransfer, ShareConfig, TransferSummary};
