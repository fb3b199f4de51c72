//! Provider traits for the three external collaborators.
//!
//! - [`IdentityProvider`]: issues, refreshes and revokes OAuth access tokens
//! - [`SpreadsheetStore`]: finds, creates and appends to spreadsheets
//! - [`DurableStore`]: small key/value store with per-key expiry
//!
//! The session and sync services only ever see these traits, so tests can
//! substitute in-memory fakes and the Google implementations stay behind the
//! `google` feature.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe so services can hold
/// `Arc<dyn Trait>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a token request may interact with the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prompt {
    /// Show the provider's account chooser and consent screen.
    Consent,
    /// Obtain a token from the standing grant without any user interaction.
    None,
}

impl Prompt {
    /// Returns the value of the OAuth `prompt` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consent => "consent",
            Self::None => "",
        }
    }
}

/// A successful token grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Opaque bearer token for API calls.
    pub access_token: String,
    /// Lifetime of the token in seconds, as reported by the provider.
    pub expires_in_secs: i64,
    /// Scopes actually granted.
    pub scopes: Vec<String>,
}

impl TokenGrant {
    /// Creates a new grant.
    pub fn new(access_token: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in_secs,
            scopes: Vec::new(),
        }
    }

    /// Builder method to record the granted scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Token lifetime as a `Duration`, clamped at zero.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in_secs.max(0) as u64)
    }
}

/// The OAuth identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Returns a short name used in logs and errors.
    fn name(&self) -> &str;

    /// Requests an access token.
    ///
    /// With [`Prompt::Consent`] the provider may run an interactive flow;
    /// with [`Prompt::None`] it must not involve the user and fails if no
    /// standing grant exists.
    fn request_access_token(&self, prompt: Prompt) -> BoxFuture<'_, ProviderResult<TokenGrant>>;

    /// Revokes a token with the provider.
    fn revoke(&self, access_token: &str) -> BoxFuture<'_, ProviderResult<()>>;

    /// Returns true if a provider-level grant exists, so a token can be
    /// obtained without prompting.
    fn has_grant(&self) -> bool;
}

/// A spreadsheet found by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetFile {
    /// Provider identifier of the spreadsheet.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl SpreadsheetFile {
    /// Creates a new file entry.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A request to append rows to a spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendRequest {
    /// Target spreadsheet.
    pub spreadsheet_id: String,
    /// Anchor range; the store picks the actual insertion row.
    pub range: String,
    /// Rows of cell values.
    pub rows: Vec<Vec<Value>>,
}

impl AppendRequest {
    /// Creates an append request. Values are interpreted as if typed by a user.
    pub fn new(
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
            rows,
        }
    }
}

/// What the store reported after an append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendSummary {
    /// The range actually written, e.g. `Sheet1!A5:K5`.
    pub updated_range: Option<String>,
    /// Number of rows written.
    pub updated_rows: u32,
}

/// Remote spreadsheet storage.
///
/// Every call carries the bearer token to use, so a token refreshed between
/// two calls is picked up by the next one.
pub trait SpreadsheetStore: Send + Sync {
    /// Returns a short name used in logs and errors.
    fn name(&self) -> &str;

    /// Lists spreadsheets whose name matches `name` exactly.
    ///
    /// The order of the result is the provider's and is not specified.
    fn find_by_name<'a>(
        &'a self,
        access_token: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<SpreadsheetFile>>>;

    /// Creates a spreadsheet and returns its identifier.
    fn create<'a>(
        &'a self,
        access_token: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, ProviderResult<String>>;

    /// Appends rows at the request's anchor range.
    fn append<'a>(
        &'a self,
        access_token: &'a str,
        request: AppendRequest,
    ) -> BoxFuture<'a, ProviderResult<AppendSummary>>;
}

/// Durable client-side key/value store with optional per-key expiry.
///
/// Entries whose expiry has passed behave as if absent.
pub trait DurableStore: Send + Sync {
    /// Returns the value for `key` if present and not expired.
    fn get(&self, key: &str) -> ProviderResult<Option<String>>;

    /// Stores `value` under `key`, expiring after `ttl` if given.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> ProviderResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> ProviderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wire_values() {
        assert_eq!(Prompt::Consent.as_str(), "consent");
        assert_eq!(Prompt::None.as_str(), "");
    }

    #[test]
    fn grant_lifetime_is_clamped() {
        assert_eq!(TokenGrant::new("t", 3599).lifetime(), Duration::from_secs(3599));
        assert_eq!(TokenGrant::new("t", -5).lifetime(), Duration::ZERO);
    }

    #[test]
    fn append_request_carries_rows() {
        let request = AppendRequest::new("sheet-1", "Sheet1!A1", vec![vec![Value::from("x")]]);
        assert_eq!(request.spreadsheet_id, "sheet-1");
        assert_eq!(request.range, "Sheet1!A1");
        assert_eq!(request.rows.len(), 1);
    }
}
