use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::format_megabytes;

/// A registered receiving device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            registered_at: None,
            last_seen: None,
        }
    }
}

/// A single file inside a pending transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingFile {
    pub name: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub size: u64,
}

/// A transfer offer waiting for the receiving device.
///
/// Older servers send the flat `fileName`/`fileSize`/`mime` triple, newer
/// ones send a `files` list. Both shapes deserialize into this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransfer {
    pub transfer_id: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PendingFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

/// What the incoming-transfer popup shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub name: String,
    pub size_bytes: u64,
    pub mime: String,
}

impl TransferSummary {
    /// `"<size> MB · <mime>"`, the popup's second line.
    pub fn detail_line(&self) -> String {
        format!("{} · {}", format_megabytes(self.size_bytes), self.mime)
    }
}

impl PendingTransfer {
    /// Collapses either payload shape into one popup summary.
    pub fn summary(&self) -> TransferSummary {
        if !self.file_name.is_empty() || self.files.is_empty() {
            return TransferSummary {
                name: self.file_name.clone(),
                size_bytes: self.file_size,
                mime: self.mime.clone(),
            };
        }

        let first = &self.files[0];
        let name = match self.files.len() {
            1 => first.name.clone(),
            n => format!("{} (+{} more)", first.name, n - 1),
        };
        let size_bytes = self.files.iter().map(|f| f.size).sum();
        let mime = if self.files.iter().all(|f| f.mime == first.mime) {
            first.mime.clone()
        } else {
            "multiple types".to_string()
        };

        TransferSummary {
            name,
            size_bytes,
            mime,
        }
    }
}

/// Share parameters handed to the share page by its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareConfig {
    pub share_link: String,
    pub transfer_id: String,
    pub token: String,
}
