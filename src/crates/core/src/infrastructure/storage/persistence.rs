//! JSON-file-backed key-value store
//!
//! The whole map lives in memory and is rewritten on every change. Writes go
//! to a sibling temp file which is then renamed over the target, so a crash
//! never leaves a half-written file behind.

use super::store::{ChangeNotifier, KeyValueStore, StorageChange};
use crate::util::errors::{MentoraError, MentoraResult};
use async_trait::async_trait;
use log::{debug, error, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{broadcast, Mutex};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
    notifier: ChangeNotifier,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries. A missing file is
    /// an empty store; an unreadable or corrupt one is an error.
    pub async fn open(path: impl Into<PathBuf>) -> MentoraResult<Self> {
        let path = path.into();
        let entries = match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, Value>>(&bytes).map_err(|e| {
                MentoraError::Storage(format!("Corrupt store file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                error!("Failed to read store file: path={}, error={}", path.display(), e);
                return Err(e.into());
            }
        };

        info!(
            "Opened JSON store: path={}, entries={}",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            notifier: ChangeNotifier::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_atomic(&self, entries: &BTreeMap<String, Value>) -> MentoraResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(entries)?;
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await.map_err(|e| {
            MentoraError::Storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            MentoraError::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(
            "Persisted JSON store: path={}, entries={}, bytes={}",
            self.path.display(),
            entries.len(),
            data.len()
        );
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> MentoraResult<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> MentoraResult<()> {
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.to_string(), value.clone());
        if let Err(e) = self.write_atomic(&entries).await {
            // Keep memory in step with disk
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        drop(entries);

        self.notifier.publish(key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> MentoraResult<()> {
        let mut entries = self.entries.lock().await;
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.write_atomic(&entries).await {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        drop(entries);

        self.notifier.publish(key, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.notifier.subscribe()
    }
}
