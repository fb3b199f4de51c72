//! Sync error types.

use std::fmt;

use dailytracker_providers::ProviderError;
use thiserror::Error;

/// Result type for session and sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// The remote call that failed during a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    /// Searching for the spreadsheet by name.
    FindSpreadsheet,
    /// Creating the spreadsheet.
    CreateSpreadsheet,
    /// Writing the header row into a new spreadsheet.
    AppendHeader,
    /// Appending a record row.
    AppendRecord,
}

impl RemoteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FindSpreadsheet => "find spreadsheet",
            Self::CreateSpreadsheet => "create spreadsheet",
            Self::AppendHeader => "append header",
            Self::AppendRecord => "append record",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the session manager and the sheet sync service.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Neither silent restore nor a grant request produced a token.
    #[error("authorization failed: {0}")]
    AuthGrantFailed(#[source] ProviderError),

    /// The token expired and a silent refresh was refused.
    #[error("session expired and could not be refreshed: {0}")]
    AuthExpiredNoRefresh(#[source] ProviderError),

    /// An operation needing a token was attempted while signed out.
    #[error("not signed in")]
    Unauthenticated,

    /// A spreadsheet call failed.
    #[error("{operation} failed: {source}")]
    RemoteOperationFailed {
        operation: RemoteOperation,
        #[source]
        source: ProviderError,
    },
}

impl SyncError {
    /// Creates a remote operation error.
    pub fn remote(operation: RemoteOperation, source: ProviderError) -> Self {
        Self::RemoteOperationFailed { operation, source }
    }

    /// Returns true if signing in again may fix the error.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::AuthGrantFailed(_) | Self::AuthExpiredNoRefresh(_) | Self::Unauthenticated => {
                true
            }
            Self::RemoteOperationFailed { source, .. } => source.is_auth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_operation() {
        let err = SyncError::remote(
            RemoteOperation::CreateSpreadsheet,
            ProviderError::server("backend error"),
        );
        let message = err.to_string();
        assert!(message.starts_with("create spreadsheet failed"));
        assert!(message.contains("backend error"));
        assert!(!err.is_auth());
    }

    #[test]
    fn auth_classification() {
        assert!(SyncError::Unauthenticated.is_auth());
        assert!(SyncError::AuthGrantFailed(ProviderError::authentication("denied")).is_auth());
        assert!(
            SyncError::remote(
                RemoteOperation::AppendRecord,
                ProviderError::authentication("token expired"),
            )
            .is_auth()
        );
    }
}
