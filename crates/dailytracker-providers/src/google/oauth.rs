//! OAuth 2.0 flows against Google's endpoints.
//!
//! Interactive consent uses the authorization-code flow with PKCE and a
//! loopback redirect. Silent token requests use the refresh token kept from
//! an earlier consent.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// PKCE verifier length in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the browser to hit the loopback redirect.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Tokens returned by a completed consent flow.
#[derive(Debug, Clone)]
pub struct ConsentTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub scopes: Vec<String>,
}

/// Tokens returned by a refresh.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: i64,
    /// Granted scopes, when Google reports them.
    pub scopes: Option<Vec<String>>,
}

/// HTTP client for Google's OAuth endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the interactive consent flow and exchanges the code for tokens.
    ///
    /// Opens the user's browser on Google's consent page and waits for the
    /// loopback redirect.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<ConsentTokens> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("requesting consent, opening browser");
        debug!(url = %auth_url, "authorization URL");

        if let Err(e) = open::that(auth_url.as_str()) {
            warn!(error = %e, "failed to open browser");
            eprintln!("\nOpen this URL in your browser to continue:\n\n{}\n", auth_url);
        }

        let (code, received_state) = tokio::task::spawn_blocking(move || {
            Self::wait_for_callback(listener)
        })
        .await
        .map_err(|e| ProviderError::authentication(format!("consent callback task failed: {}", e)))??;

        if received_state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, refusing authorization code",
            ));
        }

        debug!("received authorization code, exchanging for tokens");
        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Obtains a fresh access token from a refresh token without user
    /// interaction.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token = self.post_token(&params, "token refresh").await?;
        debug!(expires_in = token.expires_in, "refreshed access token");
        Ok(RefreshedToken {
            access_token: token.access_token,
            expires_in: token.expires_in,
            scopes: token.scope.map(split_scopes),
        })
    }

    /// Revokes a token. Revoking an access token also revokes its grant.
    pub async fn revoke(&self, token: &str) -> ProviderResult<()> {
        let response = self
            .http_client
            .post(GOOGLE_REVOKE_URL)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("revoke request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!("token revoked");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // 400 invalid_token means it is already dead, which is what we wanted.
        if status == reqwest::StatusCode::BAD_REQUEST && body.contains("invalid_token") {
            debug!("token was already invalid");
            return Ok(());
        }

        Err(ProviderError::server(format!(
            "revoke failed ({}): {}",
            status, body
        )))
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<ConsentTokens> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let token = self.post_token(&params, "token exchange").await?;
        info!("consent granted");
        Ok(ConsentTokens {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            scopes: token
                .scope
                .map(split_scopes)
                .unwrap_or_else(|| scopes.to_vec()),
        })
    }

    async fn post_token(&self, params: &[(&str, &str)], what: &str) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if status.is_server_error() {
            return Err(ProviderError::server(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }

    fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                debug!(port, "bound loopback server");
                return Ok((listener, port));
            }
        }
        Err(ProviderError::configuration(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    fn wait_for_callback(listener: TcpListener) -> ProviderResult<(String, String)> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(result) = handle_callback(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) => error!(error = %e, "failed to accept connection"),
                }
            }
        });

        match rx.recv_timeout(CALLBACK_TIMEOUT) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(ProviderError::authentication("timed out waiting for consent"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ProviderError::authentication("consent callback channel disconnected"))
            }
        }
    }
}

/// Parses one request on the loopback server.
///
/// Returns `None` for requests that are not the OAuth redirect (favicon
/// fetches and the like).
fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<(String, String)>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let result = parse_callback_request(&request_line)?;

    let response = match result {
        Ok(_) => {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Signed in</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        }
        Err(_) => {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Sign-in failed</h1>\
            <p>You can close this window.</p></body></html>"
        }
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Extracts `(code, state)` from a request line such as
/// `GET /callback?code=...&state=... HTTP/1.1`.
fn parse_callback_request(request_line: &str) -> Option<ProviderResult<(String, String)>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    if !target.starts_with("/callback") {
        return None;
    }

    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    let mut code = None;
    let mut state = None;
    let mut denied = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => denied = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(reason) = denied {
        return Some(Err(ProviderError::authentication(format!(
            "consent denied: {}",
            reason
        ))));
    }

    Some(match code {
        Some(code) => Ok((code, state.unwrap_or_default())),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

fn split_scopes(scope: String) -> Vec<String> {
    scope.split_whitespace().map(str::to_string).collect()
}

/// PKCE (RFC 7636) verifier, challenge and CSRF state.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    /// Creates a flow with a random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent URL. `access_type=offline` asks for a refresh
    /// token so later requests can be silent.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> Url {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .expect("static auth URL is valid")
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

/// Google access tokens last an hour when the response omits a lifetime.
fn default_expires_in() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_verifier_length() {
        // 32 bytes base64url without padding
        assert_eq!(PkceFlow::new().verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_is_deterministic() {
        let a = PkceFlow::compute_challenge("verifier");
        let b = PkceFlow::compute_challenge("verifier");
        assert_eq!(a, b);
        assert_ne!(a, PkceFlow::compute_challenge("other"));
    }

    #[test]
    fn pkce_state_is_random() {
        assert_ne!(PkceFlow::new().state, PkceFlow::new().state);
    }

    #[test]
    fn auth_url_carries_scopes_and_offline_access() {
        let flow = PkceFlow::new();
        let url = flow.build_auth_url(
            "client.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &[
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
                "https://www.googleapis.com/auth/drive.file".to_string(),
            ],
        );

        assert!(url.as_str().starts_with(GOOGLE_AUTH_URL));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());

        assert_eq!(
            get("scope").as_deref(),
            Some(
                "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.file"
            )
        );
        assert_eq!(get("access_type").as_deref(), Some("offline"));
        assert_eq!(get("prompt").as_deref(), Some("consent"));
        assert_eq!(get("code_challenge_method").as_deref(), Some("S256"));
        assert_eq!(get("state"), Some(flow.state.clone()));
    }

    #[test]
    fn callback_with_code_and_state() {
        let result = parse_callback_request("GET /callback?code=4%2Fabc&state=xyz HTTP/1.1\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(result, ("4/abc".to_string(), "xyz".to_string()));
    }

    #[test]
    fn callback_with_denial() {
        let result =
            parse_callback_request("GET /callback?error=access_denied HTTP/1.1\r\n").unwrap();
        let err = result.unwrap_err();
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn unrelated_requests_are_ignored() {
        assert!(parse_callback_request("GET /favicon.ico HTTP/1.1\r\n").is_none());
        assert!(parse_callback_request("POST /callback HTTP/1.1\r\n").is_none());
        assert!(parse_callback_request("").is_none());
    }

    #[test]
    fn token_response_defaults_lifetime() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"ya29.a"}"#).unwrap();
        assert_eq!(token.expires_in, 3600);
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn scopes_are_split_on_whitespace() {
        assert_eq!(
            split_scopes("a  b\tc".to_string()),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
