//! services/api/src/adapters/store.rs
//!
//! Key-value storage adapters implementing the `KeyValueStore` port.
//! `FileStore` keeps every entry in one JSON document on disk; `MemoryStore` is the
//! volatile variant used when no data directory is wanted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use study_aid_core::ports::{KeyValueStore, PortError, PortResult};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The file name of the store inside the data directory.
pub const STORE_FILE_NAME: &str = "storage.json";

//=========================================================================================
// File-backed Store
//=========================================================================================

/// A durable store that rewrites its JSON file on every change.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens (or creates) the store inside `data_dir`.
    ///
    /// A missing or unreadable file starts an empty store rather than failing startup.
    pub async fn open(data_dir: &Path) -> PortResult<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to create data dir: {}", e)))?;
        let path = data_dir.join(STORE_FILE_NAME);

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Store file {} is malformed, starting empty: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Failed to read store file {}, starting empty: {}", path.display(), e);
                HashMap::new()
            }
        };
        info!("Opened store at {} with {} entries", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Writes the full map to a temporary file and renames it over the store.
    async fn flush(&self, entries: &HashMap<String, String>) -> PortResult<()> {
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write store: {}", e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to replace store: {}", e)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }
}

//=========================================================================================
// In-memory Store
//=========================================================================================

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> PortResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
