//! Google provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// OAuth 2.0 client credentials from the Google Cloud Console.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret (installed-app clients still carry one).
    pub client_secret: String,
}

/// Layout of the credentials JSON downloaded from the Cloud Console.
///
/// Either an `installed`/`web` section, or `client_id`/`client_secret` at the
/// root.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read credentials file: {}", e))?;
        Self::from_json(&content)
    }

    /// Parses credentials from a Cloud Console JSON string.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse credentials JSON: {}", e))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(
                "credentials file must contain an 'installed'/'web' section or 'client_id'/'client_secret'"
                    .to_string(),
            ),
        }
    }

    /// Checks the credentials look like a Google OAuth client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Google identity and spreadsheet providers.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client credentials.
    pub credentials: OAuthCredentials,

    /// Optional API key, sent as `key=` on Drive and Sheets requests.
    pub api_key: Option<String>,

    /// Where the standing grant (refresh token) is kept.
    ///
    /// Defaults to `~/.local/share/dailytracker/google-grant.json`.
    pub grant_path: PathBuf,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Ports to try for the loopback redirect during consent.
    pub loopback_port_range: (u16, u16),

    /// Base URL of the Drive v3 API.
    pub drive_api_base: Url,

    /// Base URL of the Sheets v4 API.
    pub sheets_api_base: Url,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write access to spreadsheets.
    pub const SPREADSHEETS_SCOPE: &'static str = "https://www.googleapis.com/auth/spreadsheets";

    /// Drive access limited to files created by this app.
    pub const DRIVE_FILE_SCOPE: &'static str = "https://www.googleapis.com/auth/drive.file";

    /// Default Drive API base.
    pub const DRIVE_API_BASE: &'static str = "https://www.googleapis.com/drive/v3/";

    /// Default Sheets API base.
    pub const SHEETS_API_BASE: &'static str = "https://sheets.googleapis.com/v4/";

    /// Creates a configuration with default scopes, paths and endpoints.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            api_key: None,
            grant_path: Self::default_grant_path(),
            scopes: vec![
                Self::SPREADSHEETS_SCOPE.to_string(),
                Self::DRIVE_FILE_SCOPE.to_string(),
            ],
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            loopback_port_range: (8080, 8090),
            drive_api_base: Url::parse(Self::DRIVE_API_BASE).expect("valid drive base url"),
            sheets_api_base: Url::parse(Self::SHEETS_API_BASE).expect("valid sheets base url"),
        }
    }

    /// Returns the default grant storage path.
    pub fn default_grant_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dailytracker")
            .join("google-grant.json")
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the grant storage path.
    pub fn with_grant_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.grant_path = path.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the loopback port range for consent.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Overrides the Drive and Sheets API base URLs.
    ///
    /// Each base must end in `/` so that endpoint paths join beneath it.
    pub fn with_api_bases(mut self, drive: Url, sheets: Url) -> Self {
        self.drive_api_base = drive;
        self.sheets_api_base = sheets;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }

        for base in [&self.drive_api_base, &self.sheets_api_base] {
            if !base.path().ends_with('/') {
                return Err(format!("API base URL must end with '/': {}", base));
            }
        }

        if self.api_key.as_deref().is_some_and(str::is_empty) {
            return Err("api_key must not be empty when set".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("bad-id", "secret").validate().is_err());
        assert!(
            OAuthCredentials::new("x.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn default_scopes_cover_sheets_and_app_files() {
        let config = GoogleConfig::new(test_credentials());
        assert_eq!(
            config.scopes,
            vec![
                GoogleConfig::SPREADSHEETS_SCOPE.to_string(),
                GoogleConfig::DRIVE_FILE_SCOPE.to_string(),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_values() {
        let no_scopes = GoogleConfig::new(test_credentials()).with_scopes(vec![]);
        assert!(no_scopes.validate().is_err());

        let bad_ports = GoogleConfig::new(test_credentials()).with_loopback_port_range(9000, 8000);
        assert!(bad_ports.validate().is_err());

        let empty_key = GoogleConfig::new(test_credentials()).with_api_key("");
        assert!(empty_key.validate().is_err());

        let bad_base = GoogleConfig::new(test_credentials()).with_api_bases(
            Url::parse("http://127.0.0.1:1/drive").unwrap(),
            Url::parse("http://127.0.0.1:1/sheets/").unwrap(),
        );
        assert!(bad_base.validate().is_err());
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "daily-tracker"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret"
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "flat-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_invalid() {
        let result = OAuthCredentials::from_json(r#"{ "other": {} }"#);
        assert!(result.unwrap_err().contains("client_id"));

        let result = OAuthCredentials::from_json("not json");
        assert!(result.unwrap_err().contains("parse"));
    }
}
