//! Durable storage for the device id.
//!
//! Storage is best-effort: a store that cannot be opened is replaced by
//! [`UnsupportedIdStore`] and the client simply starts without a stored id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::debug;

/// Key under which the device id is stored.
pub const DEVICE_ID_KEY: &str = "fs_device_id";

/// Errors from id storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage unsupported")]
    Unsupported,

    #[error("id store lock poisoned")]
    Poisoned,
}

/// Persists one string: the device id.
pub trait IdStore: Send + Sync {
    /// Returns the stored id, `None` if absent or unreadable.
    fn load(&self) -> Option<String>;

    fn save(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryIdStore {
    id: Mutex<Option<String>>,
}

impl MemoryIdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Mutex::new(Some(id.into())),
        }
    }
}

impl IdStore for MemoryIdStore {
    fn load(&self) -> Option<String> {
        self.id.lock().ok().and_then(|g| g.clone())
    }

    fn save(&self, id: &str) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.id.lock() {
            *guard = Some(id.to_string());
        }
        Ok(())
    }
}

/// Store for hosts without durable storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedIdStore;

impl IdStore for UnsupportedIdStore {
    fn load(&self) -> Option<String> {
        None
    }

    fn save(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }
}

/// JSON-file store. Values are cached in memory and written through.
pub struct FileIdStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileIdStore {
    /// Opens the store, loading any existing file.
    ///
    /// Fails when the file is unreadable or its directory cannot be
    /// created, which callers treat as "storage unsupported".
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let values = load_values(&path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let map = self.values.read().map_err(|_| StoreError::Poisoned)?;
        let json = serde_json::to_string_pretty(&*map)?;
        std::fs::write(&self.path, json)?;
        debug!(path = ?self.path, "persisted device id");
        Ok(())
    }
}

impl IdStore for FileIdStore {
    fn load(&self) -> Option<String> {
        self.values
            .read()
            .ok()?
            .get(DEVICE_ID_KEY)
            .filter(|id| !id.is_empty())
            .cloned()
    }

    fn save(&self, id: &str) -> Result<(), StoreError> {
        if id.is_empty() {
            return Ok(());
        }
        {
            let mut map = self.values.write().map_err(|_| StoreError::Poisoned)?;
            map.insert(DEVICE_ID_KEY.to_string(), id.to_string());
        }
        self.persist()
    }
}

fn load_values(path: &Path) -> Result<HashMap<String, String>, StoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let data = std::fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(HashMap::new());
    }
    let values: HashMap<String, String> = serde_json::from_str(&data)?;
    debug!(path = ?path, "loaded id store");
    Ok(values)
}
