//! [`IdentityProvider`] backed by Google OAuth.

use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::{BoxFuture, IdentityProvider, Prompt, TokenGrant};

use super::config::GoogleConfig;
use super::grant::{Grant, GrantStorage};
use super::oauth::OAuthClient;

const PROVIDER_NAME: &str = "google-oauth";

/// Google identity provider.
///
/// [`Prompt::Consent`] runs the browser consent flow and keeps the returned
/// refresh token as the standing grant. [`Prompt::None`] trades that grant
/// for a new access token without any UI.
pub struct GoogleIdentity {
    scopes: Vec<String>,
    loopback_port_range: (u16, u16),
    oauth: OAuthClient,
    grants: GrantStorage,
}

impl GoogleIdentity {
    /// Creates the provider and loads any stored grant.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        Ok(Self {
            scopes: config.scopes.clone(),
            loopback_port_range: config.loopback_port_range,
            oauth: OAuthClient::new(config.credentials.clone(), config.timeout)?,
            grants: GrantStorage::open(&config.grant_path),
        })
    }

    /// Returns the grant storage.
    pub fn grants(&self) -> &GrantStorage {
        &self.grants
    }

    async fn consent(&self) -> ProviderResult<TokenGrant> {
        let tokens = self
            .oauth
            .authorize(&self.scopes, self.loopback_port_range)
            .await?;

        match tokens.refresh_token {
            Some(refresh_token) => self
                .grants
                .set(Grant::new(refresh_token, tokens.scopes.clone()))?,
            None => warn!("consent returned no refresh token; silent refresh will not work"),
        }

        Ok(TokenGrant::new(tokens.access_token, tokens.expires_in).with_scopes(tokens.scopes))
    }

    async fn silent(&self) -> ProviderResult<TokenGrant> {
        let grant = self.grants.get().ok_or_else(|| {
            ProviderError::authentication("no standing grant, consent is required")
        })?;

        match self.oauth.refresh(&grant.refresh_token).await {
            Ok(token) => {
                let scopes = token.scopes.unwrap_or(grant.scopes);
                Ok(TokenGrant::new(token.access_token, token.expires_in).with_scopes(scopes))
            }
            Err(e) if e.code() == ProviderErrorCode::AuthenticationFailed => {
                // The grant was revoked or expired server-side; stop offering it.
                info!("standing grant rejected, forgetting it");
                if let Err(clear_err) = self.grants.clear() {
                    warn!(error = %clear_err, "failed to clear rejected grant");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

impl IdentityProvider for GoogleIdentity {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn request_access_token(&self, prompt: Prompt) -> BoxFuture<'_, ProviderResult<TokenGrant>> {
        Box::pin(async move {
            debug!(prompt = prompt.as_str(), "requesting access token");
            let result = match prompt {
                Prompt::Consent => self.consent().await,
                Prompt::None => self.silent().await,
            };
            result.map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn revoke(&self, access_token: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let access_token = access_token.to_string();
        Box::pin(async move {
            let revoked = self.oauth.revoke(&access_token).await;
            // Revoking an access token ends the whole grant on Google's side.
            settle_revoke(revoked, self.grants.clear())
        })
    }

    fn has_grant(&self) -> bool {
        self.grants.covers(&self.scopes)
    }
}

/// The revoke outcome is what callers see; a grant file that will not go away
/// is only logged.
fn settle_revoke(revoked: ProviderResult<()>, cleared: ProviderResult<()>) -> ProviderResult<()> {
    if let Err(e) = cleared {
        warn!(error = %e, "failed to clear grant after revoke");
    }
    revoked.map_err(|e| e.with_provider(PROVIDER_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::config::OAuthCredentials;

    fn config(dir: &std::path::Path) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_grant_path(dir.join("grant.json"))
    }

    #[test]
    fn rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let bad = config(dir.path()).with_scopes(vec![]);
        let err = GoogleIdentity::new(&bad).err().unwrap();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn no_grant_initially() {
        let dir = tempfile::tempdir().unwrap();
        let identity = GoogleIdentity::new(&config(dir.path())).unwrap();
        assert!(!identity.has_grant());
        assert_eq!(identity.name(), "google-oauth");
    }

    #[test]
    fn stored_grant_with_all_scopes_counts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        GrantStorage::open(&cfg.grant_path)
            .set(Grant::new("1//refresh", cfg.scopes.clone()))
            .unwrap();

        let identity = GoogleIdentity::new(&cfg).unwrap();
        assert!(identity.has_grant());
    }

    #[test]
    fn grant_missing_a_scope_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        GrantStorage::open(&cfg.grant_path)
            .set(Grant::new(
                "1//refresh",
                vec![GoogleConfig::SPREADSHEETS_SCOPE.to_string()],
            ))
            .unwrap();

        let identity = GoogleIdentity::new(&cfg).unwrap();
        assert!(!identity.has_grant());
    }

    #[test]
    fn revoke_outcome_survives_grant_clear_failure() {
        fn clear_failed() -> ProviderResult<()> {
            Err(ProviderError::storage("failed to remove grant file"))
        }

        assert!(settle_revoke(Ok(()), clear_failed()).is_ok());

        let revoked = Err(ProviderError::network("revoke request failed"));
        let err = settle_revoke(revoked, clear_failed()).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        assert_eq!(err.provider(), Some("google-oauth"));
    }

    #[test]
    fn unremovable_grant_file_does_not_fail_revoke() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the grant file should be cannot be removed as a file.
        let path = dir.path().join("grant.json");
        std::fs::create_dir(&path).unwrap();
        let grants = GrantStorage::open(&path);

        assert!(grants.clear().is_err());
        assert!(settle_revoke(Ok(()), grants.clear()).is_ok());
    }

    #[tokio::test]
    async fn silent_request_without_grant_fails_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let identity = GoogleIdentity::new(&config(dir.path())).unwrap();

        let err = identity.request_access_token(Prompt::None).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.provider(), Some("google-oauth"));
    }
}
