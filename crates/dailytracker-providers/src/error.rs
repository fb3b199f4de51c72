//! Error types for provider operations.
//!
//! Every call into an external collaborator (identity provider, spreadsheet
//! store, durable store) reports failures as a [`ProviderError`]. Nothing in
//! this workspace retries on its own, so the code only tells callers which
//! part of the exchange went wrong.

use std::fmt;
use thiserror::Error;

/// What went wrong while talking to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The credentials were refused: consent denied, grant revoked, token expired.
    AuthenticationFailed,
    /// The token is accepted but may not touch the resource.
    AuthorizationFailed,
    /// The remote could not be reached.
    NetworkError,
    /// Request rate or daily quota exhausted.
    RateLimited,
    /// The remote failed on its side (5xx).
    ServerError,
    /// The remote refused the request itself (400, 404 and other 4xx).
    Rejected,
    /// A response arrived but could not be understood.
    InvalidResponse,
    /// Local settings are missing or unusable.
    ConfigurationError,
    /// The durable store or grant file could not be read or written.
    StorageError,
}

impl ProviderErrorCode {
    /// Classifies a non-success HTTP status from a Google API.
    ///
    /// A 403 is a quota failure when `detail` says so; Drive and Sheets
    /// report exhausted quotas that way rather than with a 429.
    pub fn from_http_status(status: u16, detail: &str) -> Self {
        match status {
            401 => Self::AuthenticationFailed,
            403 if detail.to_ascii_lowercase().contains("quota") => Self::RateLimited,
            403 => Self::AuthorizationFailed,
            429 => Self::RateLimited,
            400..=499 => Self::Rejected,
            500..=599 => Self::ServerError,
            _ => Self::InvalidResponse,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::Rejected => "rejected",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::StorageError => "storage_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call into an identity provider, spreadsheet store or durable store.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<&'static str>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Builds the error for a non-success Google API response.
    pub fn from_http_status(status: u16, detail: &str, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::from_http_status(status, detail), message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::StorageError, message)
    }

    /// Tags the error with the collaborator that produced it.
    pub fn with_provider(mut self, provider: &'static str) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&'static str> {
        self.provider
    }

    /// Returns true if the remote refused the credentials rather than the request.
    pub fn is_auth(&self) -> bool {
        matches!(
            self.code,
            ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::AuthorizationFailed
        )
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider {
            Some(provider) => write!(f, "[{}] {}: {}", provider, self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
