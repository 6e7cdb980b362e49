//! Client configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `$XDG_CONFIG_HOME/peershare/client.toml` (`~/.config` by default)
//! - Windows: `%APPDATA%/peershare/client.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use peershare_pages::{DevicePageConfig, SharePageConfig};

/// Terminal client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the PeerShare server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Name the listener registers under (hostname by default).
    #[serde(default = "default_device_name", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    /// Where the device id is persisted.
    #[serde(default = "default_id_store")]
    pub id_store: PathBuf,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_roster_refresh_ms")]
    pub roster_refresh_ms: u64,
}

fn default_server_url() -> String {
    "http://localhost:8080".into()
}

fn default_device_name() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

fn default_id_store() -> PathBuf {
    config_dir().join("device.json")
}

fn default_poll_interval_ms() -> u64 {
    3500
}

fn default_roster_refresh_ms() -> u64 {
    15_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            device_name: default_device_name(),
            id_store: default_id_store(),
            poll_interval_ms: default_poll_interval_ms(),
            roster_refresh_ms: default_roster_refresh_ms(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `path`, or writes and returns the defaults
    /// when the file does not exist yet.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: ClientConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = ClientConfig::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn device_page(&self) -> DevicePageConfig {
        DevicePageConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }

    pub fn share_page(&self) -> SharePageConfig {
        SharePageConfig {
            refresh_interval: Duration::from_millis(self.roster_refresh_ms.max(1)),
            ..SharePageConfig::default()
        }
    }
}

/// Platform-specific configuration directory for PeerShare.
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("peershare")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
                PathBuf::from(home).join(".config")
            });
        base.join("peershare")
    }
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("client.toml")
}
