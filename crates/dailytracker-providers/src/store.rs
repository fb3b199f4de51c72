//! Durable key/value stores with per-key expiry.
//!
//! [`FileStore`] keeps entries in a small JSON file with restrictive
//! permissions and is what the CLI uses to carry a session across runs.
//! [`MemoryStore`] keeps them in memory only.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::DurableStore;

/// A stored value and its optional expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn new(value: &str, ttl: Option<Duration>) -> ProviderResult<Self> {
        let expires_at = match ttl {
            Some(ttl) => {
                let at = chrono::Duration::from_std(ttl)
                    .ok()
                    .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                    .ok_or_else(|| {
                        ProviderError::storage(format!("ttl out of range: {:?}", ttl))
                    })?;
                Some(at)
            }
            None => None,
        };
        Ok(Self {
            value: value.to_string(),
            expires_at,
        })
    }

    /// Returns true if the entry has an expiry that is not in the future.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

type Entries = BTreeMap<String, StoredEntry>;

/// File-backed durable store.
///
/// The file is re-read on every operation so that a sign-out in one process
/// is seen by the next `get` in another. Writes go to a temp file that is then
/// renamed over the original.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> ProviderResult<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::storage(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                // A corrupt store is treated like an empty one; the next write replaces it.
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session store");
                Ok(Entries::new())
            }
        }
    }

    fn write_entries(&self, entries: &Entries) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create store directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| ProviderError::storage(format!("failed to serialize store: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::storage(format!("failed to write {}: {}", temp_path.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::storage(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), entries = entries.len(), "saved store");
        Ok(())
    }

    fn guard(&self) -> ProviderResult<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| ProviderError::storage("store lock poisoned"))
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        let _guard = self.guard()?;
        let entries = self.read_entries()?;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> ProviderResult<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        entries.retain(|_, entry| !entry.is_expired());
        entries.insert(key.to_string(), StoredEntry::new(value, ttl)?);
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> ProviderResult<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// In-memory durable store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn insert_with_expiry(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> ProviderResult<()> {
        self.lock()?.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    /// Returns the number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> ProviderResult<std::sync::MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| ProviderError::storage("store lock poisoned"))
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self
            .lock()?
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> ProviderResult<()> {
        let entry = StoredEntry::new(value, ttl)?;
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> ProviderResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
