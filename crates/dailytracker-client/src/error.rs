//! Client error types.

use std::fmt;

use dailytracker_core::RecordError;
use dailytracker_providers::ProviderError;
use dailytracker_sync::SyncError;

/// Tells the user how to get a session back.
pub(crate) const LOGIN_HINT: &str = "run `dailytracker auth login`";

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Provider error.
    Provider(ProviderError),
    /// Session or sheet sync error.
    Sync(SyncError),
    /// IO error.
    Io(std::io::Error),
    /// Authentication required.
    AuthRequired(String),
    /// Bad command-line or form input.
    InvalidInput(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(err) => write!(f, "provider error: {}", err),
            Self::Sync(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<SyncError> for ClientError {
    fn from(err: SyncError) -> Self {
        if err.is_auth() {
            Self::AuthRequired(format!("{}, {}", err, LOGIN_HINT))
        } else {
            Self::Sync(err)
        }
    }
}

impl From<RecordError> for ClientError {
    fn from(err: RecordError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dailytracker_sync::RemoteOperation;

    #[test]
    fn signed_out_submission_asks_for_login() {
        let err = ClientError::from(SyncError::Unauthenticated);
        assert!(matches!(err, ClientError::AuthRequired(_)));
        assert!(err.to_string().contains("dailytracker auth login"));
    }

    #[test]
    fn rejected_token_asks_for_login() {
        let err = ClientError::from(SyncError::remote(
            RemoteOperation::AppendRecord,
            ProviderError::authentication("Request had invalid authentication credentials."),
        ));
        assert!(matches!(err, ClientError::AuthRequired(_)));
    }

    #[test]
    fn remote_failure_stays_a_sync_error() {
        let err = ClientError::from(SyncError::remote(
            RemoteOperation::FindSpreadsheet,
            ProviderError::server("backend error"),
        ));
        assert!(matches!(err, ClientError::Sync(_)));
        assert!(!err.to_string().contains("auth login"));
    }
}
