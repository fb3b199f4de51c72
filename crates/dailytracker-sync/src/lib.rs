//! Session management and Google Sheet sync for the daily tracker.
//!
//! - [`SessionManager`] - acquires, persists, refreshes and revokes the
//!   access token
//! - [`SheetSyncService`] - find-or-create of the tracker spreadsheet and
//!   one row append per submission
//! - [`Refresher`] - background task that keeps the token fresh
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dailytracker_sync::{SessionManager, SheetConfig, SheetSyncService};
//!
//! let session = Arc::new(SessionManager::new(identity, store));
//! session.restore_or_authenticate().await;
//!
//! let sync = SheetSyncService::new(session.clone(), sheets, SheetConfig::default());
//! sync.submit(&record).await?;
//! ```

pub mod error;
pub mod refresher;
pub mod session;
pub mod sheets;

#[cfg(test)]
mod testing;

pub use error::{RemoteOperation, SyncError, SyncResult};
pub use refresher::{Refresher, RefresherCommand, RefresherConfig, RefresherHandle, RefresherState};
pub use session::{
    ACCESS_TOKEN_KEY, RefreshOutcome, Session, SessionManager, SessionState, TOKEN_EXPIRY_KEY,
};
pub use sheets::{SheetConfig, SheetSyncService, SpreadsheetHandle};
