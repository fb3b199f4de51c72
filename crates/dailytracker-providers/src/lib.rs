//! Provider seams for the daily tracker.
//!
//! The sync layer talks to three outside systems, each behind a trait:
//!
//! - [`IdentityProvider`] - hands out short-lived access tokens
//! - [`SpreadsheetStore`] - finds, creates and appends to spreadsheets
//! - [`DurableStore`] - a small key/value store with per-entry expiry
//!
//! With the `google` feature (on by default) the [`google`] module provides
//! implementations backed by Google OAuth, Drive and Sheets. [`store`]
//! provides a file-backed and an in-memory [`DurableStore`].
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  GoogleIdentity  │   │GoogleSheetsClient│   │  FileStore   │
//! └────────┬─────────┘   └────────┬─────────┘   └──────┬───────┘
//!          │ IdentityProvider     │ SpreadsheetStore   │ DurableStore
//!          └──────────────────────┼────────────────────┘
//!                                 ▼
//!                       ┌──────────────────┐
//!                       │ dailytracker-sync│
//!                       └──────────────────┘
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod provider;
pub mod store;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{
    AppendRequest, AppendSummary, BoxFuture, DurableStore, IdentityProvider, Prompt,
    SpreadsheetFile, SpreadsheetStore, TokenGrant,
};
pub use store::{FileStore, MemoryStore, StoredEntry};
