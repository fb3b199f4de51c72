//! Google implementations of the identity and spreadsheet seams.
//!
//! - [`GoogleIdentity`] runs the OAuth 2.0 PKCE consent flow over a loopback
//!   redirect and keeps the refresh token as the standing grant.
//! - [`GoogleSheetsClient`] finds spreadsheets through Drive v3 and creates
//!   and appends to them through Sheets v4.
//!
//! # Example
//!
//! ```ignore
//! use dailytracker_providers::google::{GoogleConfig, GoogleIdentity, GoogleSheetsClient, OAuthCredentials};
//!
//! let config = GoogleConfig::new(OAuthCredentials::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-client-secret",
//! ));
//!
//! let identity = GoogleIdentity::new(&config)?;
//! let sheets = GoogleSheetsClient::new(&config)?;
//! ```

mod client;
mod config;
mod grant;
mod identity;
mod oauth;

pub use client::GoogleSheetsClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use grant::{Grant, GrantStorage};
pub use identity::GoogleIdentity;
pub use oauth::{ConsentTokens, OAuthClient, PkceFlow, RefreshedToken};
