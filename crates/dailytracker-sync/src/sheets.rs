//! Spreadsheet resolution and record submission.

use std::collections::HashMap;
use std::sync::Arc;

use dailytracker_core::{SymptomRecord, header_row};
use dailytracker_providers::{AppendRequest, AppendSummary, SpreadsheetStore};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{RemoteOperation, SyncError, SyncResult};
use crate::session::SessionManager;

/// Where records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetConfig {
    /// Spreadsheet name, matched exactly.
    pub name: String,
    /// Anchor range for appends.
    pub range: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            range: Self::DEFAULT_RANGE.to_string(),
        }
    }
}

impl SheetConfig {
    pub const DEFAULT_NAME: &'static str = "Daily Event Tracker";
    pub const DEFAULT_RANGE: &'static str = "Sheet1!A1";

    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
        }
    }
}

/// A resolved spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetHandle {
    pub id: String,
    pub name: String,
}

/// Writes symptom records to the configured spreadsheet.
///
/// Handles are resolved on first use and cached for the lifetime of the
/// service. Resolution holds the cache lock across find and create, so one
/// service creates a given spreadsheet at most once.
pub struct SheetSyncService {
    session: Arc<SessionManager>,
    store: Arc<dyn SpreadsheetStore>,
    config: SheetConfig,
    handles: Mutex<HashMap<String, SpreadsheetHandle>>,
}

impl SheetSyncService {
    pub fn new(
        session: Arc<SessionManager>,
        store: Arc<dyn SpreadsheetStore>,
        config: SheetConfig,
    ) -> Self {
        Self {
            session,
            store,
            config,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Finds the spreadsheet called `name`, creating it with a header row if
    /// none exists.
    pub async fn resolve_spreadsheet(&self, name: &str) -> SyncResult<SpreadsheetHandle> {
        let token = self.require_token()?;
        self.resolve_with(&token, name).await
    }

    /// Appends one record row to `handle`.
    pub async fn append_record(
        &self,
        handle: &SpreadsheetHandle,
        record: &SymptomRecord,
    ) -> SyncResult<AppendSummary> {
        let token = self.require_token()?;
        self.append_with(&token, handle, record).await
    }

    /// Resolves the configured spreadsheet and appends `record` to it.
    ///
    /// Fails with [`SyncError::Unauthenticated`] before any remote call when
    /// there is no valid token.
    pub async fn submit(&self, record: &SymptomRecord) -> SyncResult<AppendSummary> {
        let token = self.require_token()?;
        let handle = self.resolve_with(&token, &self.config.name).await?;
        let summary = self.append_with(&token, &handle, record).await?;
        info!(
            date = %record.date,
            spreadsheet = %handle.name,
            updated_range = ?summary.updated_range,
            "record submitted"
        );
        Ok(summary)
    }

    fn require_token(&self) -> SyncResult<String> {
        self.session.access_token().ok_or_else(|| {
            warn!("submission attempted while signed out");
            SyncError::Unauthenticated
        })
    }

    async fn resolve_with(&self, token: &str, name: &str) -> SyncResult<SpreadsheetHandle> {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(name) {
            return Ok(handle.clone());
        }

        let found = self
            .store
            .find_by_name(token, name)
            .await
            .map_err(|e| SyncError::remote(RemoteOperation::FindSpreadsheet, e))?;

        let handle = match found.into_iter().next() {
            Some(file) => {
                debug!(name, id = %file.id, "found spreadsheet");
                SpreadsheetHandle {
                    id: file.id,
                    name: name.to_string(),
                }
            }
            None => self.create_with_header(token, name).await?,
        };

        handles.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    async fn create_with_header(&self, token: &str, name: &str) -> SyncResult<SpreadsheetHandle> {
        let id = self
            .store
            .create(token, name)
            .await
            .map_err(|e| SyncError::remote(RemoteOperation::CreateSpreadsheet, e))?;
        info!(name, %id, "created spreadsheet");

        // A failure here leaves a spreadsheet without a header; the next
        // resolve finds it and uses it as is.
        let request = AppendRequest::new(id.as_str(), self.config.range.as_str(), vec![header_row()]);
        self.store
            .append(token, request)
            .await
            .map_err(|e| SyncError::remote(RemoteOperation::AppendHeader, e))?;

        Ok(SpreadsheetHandle {
            id,
            name: name.to_string(),
        })
    }

    async fn append_with(
        &self,
        token: &str,
        handle: &SpreadsheetHandle,
        record: &SymptomRecord,
    ) -> SyncResult<AppendSummary> {
        let request = AppendRequest::new(
            handle.id.as_str(),
            self.config.range.as_str(),
            vec![record.to_row()],
        );
        self.store
            .append(token, request)
            .await
            .map_err(|e| SyncError::remote(RemoteOperation::AppendRecord, e))
    }
}
