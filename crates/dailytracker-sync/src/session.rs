//! OAuth session management.
//!
//! The [`SessionManager`] owns the single access token of the process. It
//! restores a token persisted by an earlier run when one is still valid,
//! otherwise asks the [`IdentityProvider`] for a new one, and keeps the
//! durable store in step with what it holds in memory.
//!
//! Persisted keys:
//!
//! | key | value |
//! |---|---|
//! | `accessToken` | the bearer token |
//! | `tokenExpiry` | absolute expiry, epoch milliseconds |
//!
//! Both are written with a TTL equal to the token lifetime.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use dailytracker_providers::{
    DurableStore, IdentityProvider, Prompt, ProviderError, ProviderResult, TokenGrant,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::SyncError;

/// Durable store key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Durable store key for the token expiry in epoch milliseconds.
pub const TOKEN_EXPIRY_KEY: &str = "tokenExpiry";

/// An access token and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Builds a session from a fresh grant.
    ///
    /// Fails when the reported lifetime does not fit a timestamp.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> ProviderResult<Self> {
        let expires_at = TimeDelta::try_seconds(grant.expires_in_secs.max(0))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ProviderError::invalid_response(format!(
                    "token lifetime out of range: {}s",
                    grant.expires_in_secs
                ))
            })?;
        Ok(Self {
            access_token: grant.access_token,
            expires_at,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Utc::now())
    }
}

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SignedIn { expires_at: DateTime<Utc> },
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }
}

/// Result of [`SessionManager::refresh_if_expired`].
#[derive(Debug)]
pub enum RefreshOutcome {
    /// There was no session to refresh.
    NoSession,
    /// The token has not expired yet.
    NotNeeded,
    /// A new token was obtained silently.
    Refreshed { expires_at: DateTime<Utc> },
    /// The silent request was refused; the session has been dropped.
    Failed(SyncError),
}

/// Owns the access token for the process.
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DurableStore>,
    session: RwLock<Option<Session>>,
    // Serializes token requests so concurrent triggers share one outcome.
    in_flight: Mutex<()>,
}

impl SessionManager {
    /// Creates a signed-out manager.
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DurableStore>) -> Self {
        Self {
            identity,
            store,
            session: RwLock::new(None),
            in_flight: Mutex::new(()),
        }
    }

    /// Adopts a persisted session if one is still valid, without contacting
    /// the provider.
    pub fn restore(&self) -> SessionState {
        if self.active().is_none()
            && let Some(session) = self.load_persisted()
        {
            info!(expires_at = %session.expires_at, "restored persisted session");
            self.replace(Some(session));
        }
        self.state()
    }

    /// Restores a persisted session, or requests a new token.
    ///
    /// Consent is requested only when the provider holds no standing grant.
    /// Failures are logged and leave the manager signed out.
    pub async fn restore_or_authenticate(&self) -> SessionState {
        let _guard = self.in_flight.lock().await;

        if self.restore().is_signed_in() {
            return self.state();
        }

        let prompt = if self.identity.has_grant() {
            Prompt::None
        } else {
            Prompt::Consent
        };
        debug!(provider = self.identity.name(), ?prompt, "requesting access token");

        let granted = self.identity.request_access_token(prompt).await;
        match granted.and_then(|grant| self.adopt(grant)) {
            Ok(session) => {
                info!(expires_at = %session.expires_at, "signed in");
            }
            Err(e) => {
                let err = SyncError::AuthGrantFailed(e);
                warn!(error = %err, "sign-in failed");
            }
        }
        self.state()
    }

    /// Silently replaces the token once it has expired.
    ///
    /// Issues at most one request per expiry, however many callers race.
    pub async fn refresh_if_expired(&self) -> RefreshOutcome {
        match self.current() {
            None => return RefreshOutcome::NoSession,
            Some(session) if !session.is_expired() => return RefreshOutcome::NotNeeded,
            Some(_) => {}
        }

        let _guard = self.in_flight.lock().await;

        // Another caller may have finished while we waited.
        match self.current() {
            None => return RefreshOutcome::NoSession,
            Some(session) if !session.is_expired() => return RefreshOutcome::NotNeeded,
            Some(_) => {}
        }

        debug!("access token expired, refreshing");
        let granted = self.identity.request_access_token(Prompt::None).await;
        match granted.and_then(|grant| self.adopt(grant)) {
            Ok(session) => {
                info!(expires_at = %session.expires_at, "refreshed access token");
                RefreshOutcome::Refreshed {
                    expires_at: session.expires_at,
                }
            }
            Err(e) => {
                let err = SyncError::AuthExpiredNoRefresh(e);
                warn!(error = %err, "token refresh failed, signing out");
                self.clear();
                RefreshOutcome::Failed(err)
            }
        }
    }

    /// Revokes the current token and forgets the session.
    ///
    /// A failed revoke is logged; local state is cleared regardless.
    pub async fn sign_out(&self) {
        let _guard = self.in_flight.lock().await;

        let token = self
            .current()
            .map(|s| s.access_token)
            .or_else(|| self.read_key(ACCESS_TOKEN_KEY));

        match token {
            Some(token) => {
                if let Err(e) = self.identity.revoke(&token).await {
                    warn!(error = %e, "failed to revoke token");
                }
            }
            None => debug!("no token to revoke"),
        }

        self.clear();
        info!("signed out");
    }

    /// Returns the access token while it is valid.
    pub fn access_token(&self) -> Option<String> {
        self.active().map(|s| s.access_token)
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        match self.active() {
            Some(session) => SessionState::SignedIn {
                expires_at: session.expires_at,
            },
            None => SessionState::SignedOut,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.state().is_signed_in()
    }

    /// The in-memory session, expired or not.
    fn current(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The in-memory session if it has not expired.
    fn active(&self) -> Option<Session> {
        self.current().filter(|s| !s.is_expired())
    }

    fn replace(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn adopt(&self, grant: TokenGrant) -> ProviderResult<Session> {
        let ttl = grant.lifetime();
        let session = Session::from_grant(grant, Utc::now())?;

        let expiry = session.expires_at.timestamp_millis().to_string();
        let persisted = self
            .store
            .set(ACCESS_TOKEN_KEY, &session.access_token, Some(ttl))
            .and_then(|()| self.store.set(TOKEN_EXPIRY_KEY, &expiry, Some(ttl)));
        if let Err(e) = persisted {
            warn!(error = %e, "failed to persist session, it will not survive a restart");
        }

        self.replace(Some(session.clone()));
        Ok(session)
    }

    fn clear(&self) {
        self.replace(None);
        for key in [ACCESS_TOKEN_KEY, TOKEN_EXPIRY_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to remove persisted session key");
            }
        }
    }

    fn load_persisted(&self) -> Option<Session> {
        let access_token = self.read_key(ACCESS_TOKEN_KEY)?;
        let raw_expiry = self.read_key(TOKEN_EXPIRY_KEY)?;

        let Some(expires_at) = raw_expiry
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
        else {
            debug!(value = %raw_expiry, "ignoring malformed persisted token expiry");
            return None;
        };

        let session = Session {
            access_token,
            expires_at,
        };
        if session.is_expired() {
            debug!(expires_at = %session.expires_at, "persisted session has expired");
            return None;
        }
        Some(session)
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted session key");
                None
            }
        }
    }
}
