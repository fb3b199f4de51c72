//! Persistence of the standing Google grant.
//!
//! The grant is the refresh token obtained at consent time. It plays the role
//! of the provider-level session: while it exists, access tokens can be
//! requested without showing the consent screen.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

/// A persisted refresh grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Scopes covered by the grant.
    pub scopes: Vec<String>,
    /// When consent was given.
    pub granted_at: DateTime<Utc>,
}

impl Grant {
    /// Creates a grant issued now.
    pub fn new(refresh_token: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            scopes,
            granted_at: Utc::now(),
        }
    }

    /// Returns true if the grant covers every required scope.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }
}

/// File-backed grant storage with an in-memory copy.
#[derive(Debug)]
pub struct GrantStorage {
    path: PathBuf,
    grant: RwLock<Option<Grant>>,
}

impl GrantStorage {
    /// Creates storage at `path` and loads any existing grant.
    ///
    /// An unreadable grant file is logged and treated as no grant.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let storage = Self {
            path: path.into(),
            grant: RwLock::new(None),
        };
        if let Err(e) = storage.load() {
            warn!(path = %storage.path.display(), error = %e, "ignoring unreadable grant file");
        }
        storage
    }

    fn load(&self) -> ProviderResult<()> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no grant file");
            return Ok(());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| ProviderError::storage(format!("failed to read grant file: {}", e)))?;
        let grant: Grant = serde_json::from_str(&content)
            .map_err(|e| ProviderError::storage(format!("failed to parse grant file: {}", e)))?;

        debug!(path = %self.path.display(), "loaded grant");
        *self.write_lock()? = Some(grant);
        Ok(())
    }

    /// Returns a copy of the current grant.
    pub fn get(&self) -> Option<Grant> {
        self.grant.read().ok().and_then(|g| g.clone())
    }

    /// Replaces the grant and writes it to disk.
    pub fn set(&self, grant: Grant) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create grant directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&grant)
            .map_err(|e| ProviderError::storage(format!("failed to serialize grant: {}", e)))?;
        fs::write(&temp_path, content)
            .map_err(|e| ProviderError::storage(format!("failed to write grant file: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| ProviderError::storage(format!("failed to rename grant file: {}", e)))?;

        *self.write_lock()? = Some(grant);
        info!(path = %self.path.display(), "saved grant");
        Ok(())
    }

    /// Forgets the grant, in memory and on disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.write_lock()? = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::storage(format!("failed to remove grant file: {}", e))
            })?;
            info!(path = %self.path.display(), "cleared grant");
        }
        Ok(())
    }

    /// Returns true if a grant covering `required` is held.
    pub fn covers(&self, required: &[String]) -> bool {
        self.get().is_some_and(|g| g.has_scopes(required))
    }

    /// Returns the grant file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_lock(&self) -> ProviderResult<std::sync::RwLockWriteGuard<'_, Option<Grant>>> {
        self.grant
            .write()
            .map_err(|_| ProviderError::storage("grant lock poisoned"))
    }
}
