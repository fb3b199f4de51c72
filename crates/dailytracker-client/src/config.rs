//! Client configuration.
//!
//! All settings live in `~/.config/dailytracker/config.toml` by default:
//!
//! ```toml
//! [google]
//! client_id = "xxx.apps.googleusercontent.com"
//! client_secret = "pass::google/dailytracker"
//! api_key = "env::DAILYTRACKER_API_KEY"
//!
//! [session]
//! refresh_interval_secs = 300
//!
//! [sheet]
//! name = "Daily Event Tracker"
//! range = "Sheet1!A1"
//! ```
//!
//! `client_id`, `client_secret` and `api_key` accept secret references, see
//! [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use dailytracker_providers::google::{GoogleConfig, OAuthCredentials};
use dailytracker_sync::{RefresherConfig, SheetConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the dailytracker client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google OAuth and API settings.
    pub google: Option<GoogleSettings>,

    /// Session persistence and refresh.
    pub session: SessionSettings,

    /// Target spreadsheet.
    pub sheet: SheetSettings,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dailytracker")
    }

    /// Returns the default data directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dailytracker")
    }

    /// Returns the Google settings, or an error telling the user how to add them.
    pub fn google(&self) -> Result<&GoogleSettings, String> {
        self.google.as_ref().ok_or_else(missing_credentials_message)
    }
}

/// Google provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// API key sent with Drive and Sheets calls (supports `pass::` and `env::`).
    pub api_key: Option<String>,

    /// Path of the stored refresh grant.
    pub grant_path: Option<PathBuf>,
}

impl GoogleSettings {
    /// Builds the provider configuration, resolving secret references.
    pub fn to_provider_config(&self) -> Result<GoogleConfig, String> {
        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(|e| e.to_string())?;

        let mut config = GoogleConfig::new(credentials);

        if let Some(api_key) = self.resolve_api_key()? {
            config = config.with_api_key(api_key);
        }

        if let Some(ref path) = self.grant_path {
            config = config.with_grant_path(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolves the OAuth client credentials.
    pub(crate) fn resolve_credentials(&self) -> Result<OAuthCredentials, String> {
        let raw_id = self
            .client_id
            .as_deref()
            .ok_or_else(missing_credentials_message)?;
        let raw_secret = self.client_secret.as_deref().ok_or_else(|| {
            "client_secret is missing from the [google] section of config.toml".to_string()
        })?;

        let client_id = crate::secret::resolve(raw_id)
            .map_err(|e| format!("failed to resolve client_id: {}", e))?;
        let client_secret = crate::secret::resolve(raw_secret)
            .map_err(|e| format!("failed to resolve client_secret: {}", e))?;

        Ok(OAuthCredentials::new(client_id, client_secret))
    }

    fn resolve_api_key(&self) -> Result<Option<String>, String> {
        self.api_key
            .as_deref()
            .map(|raw| {
                crate::secret::resolve(raw).map_err(|e| format!("failed to resolve api_key: {}", e))
            })
            .transpose()
    }
}

fn missing_credentials_message() -> String {
    format!(
        "Google credentials not found. Add to {}:\n  \
         [google]\n  \
         client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
         client_secret = \"YOUR_SECRET\"\n\n  \
         Or run: dailytracker auth login --client-id <ID> --client-secret <SECRET>",
        ClientConfig::default_path().display()
    )
}

/// Session persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Where the access token and its expiry are kept between runs.
    pub store_path: Option<PathBuf>,

    /// Seconds between background expiry checks.
    pub refresh_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            store_path: None,
            refresh_interval_secs: RefresherConfig::default().interval.as_secs(),
        }
    }
}

impl SessionSettings {
    /// Returns the session store path.
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join("session.json"))
    }

    pub fn refresher_config(&self) -> RefresherConfig {
        RefresherConfig::new(Duration::from_secs(self.refresh_interval_secs))
    }
}

/// Target spreadsheet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    /// Spreadsheet name, matched exactly.
    pub name: String,

    /// Anchor range for appends.
    pub range: String,
}

impl Default for SheetSettings {
    fn default() -> Self {
        let sheet = SheetConfig::default();
        Self {
            name: sheet.name,
            range: sheet.range,
        }
    }
}

impl SheetSettings {
    pub fn to_sheet_config(&self) -> SheetConfig {
        SheetConfig::new(&self.name, &self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert!(config.google.is_none());
        assert_eq!(config.sheet.name, "Daily Event Tracker");
        assert_eq!(config.sheet.range, "Sheet1!A1");
        assert_eq!(config.session.refresh_interval_secs, 300);
        assert!(config.session.store_path().ends_with("dailytracker/session.json"));
        assert!(config.google().unwrap_err().contains("credentials not found"));
    }

    #[test]
    fn parses_full_file() {
        let toml_content = r#"
[google]
client_id = "toml-id.apps.googleusercontent.com"
client_secret = "toml-secret"
api_key = "AIza-test"
grant_path = "/tmp/dt-grant.json"

[session]
store_path = "/tmp/dt-session.json"
refresh_interval_secs = 60

[sheet]
name = "Symptoms"
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.session.store_path(), PathBuf::from("/tmp/dt-session.json"));
        assert_eq!(
            config.session.refresher_config().interval,
            Duration::from_secs(60)
        );
        assert_eq!(
            config.sheet.to_sheet_config(),
            SheetConfig::new("Symptoms", "Sheet1!A1")
        );

        let provider = config.google().unwrap().to_provider_config().unwrap();
        assert_eq!(
            provider.credentials.client_id,
            "toml-id.apps.googleusercontent.com"
        );
        assert_eq!(provider.api_key.as_deref(), Some("AIza-test"));
        assert_eq!(provider.grant_path, PathBuf::from("/tmp/dt-grant.json"));
    }

    #[test]
    fn env_references_are_resolved() {
        unsafe {
            std::env::set_var("_DT_TEST_CLIENT_ID", "env-id.apps.googleusercontent.com");
            std::env::set_var("_DT_TEST_CLIENT_SECRET", "env-secret");
        }

        let settings = GoogleSettings {
            client_id: Some("env::_DT_TEST_CLIENT_ID".to_string()),
            client_secret: Some("env::_DT_TEST_CLIENT_SECRET".to_string()),
            ..Default::default()
        };
        let creds = settings.resolve_credentials().unwrap();
        assert_eq!(creds.client_id, "env-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "env-secret");

        unsafe {
            std::env::remove_var("_DT_TEST_CLIENT_ID");
            std::env::remove_var("_DT_TEST_CLIENT_SECRET");
        }
    }

    #[test]
    fn missing_secret_errors() {
        let settings = GoogleSettings {
            client_id: Some("id.apps.googleusercontent.com".to_string()),
            ..Default::default()
        };
        assert!(settings.resolve_credentials().unwrap_err().contains("client_secret"));
        assert!(GoogleSettings::default().resolve_credentials().is_err());
    }

    #[test]
    fn invalid_client_id_is_rejected() {
        let settings = GoogleSettings {
            client_id: Some("not-a-google-client".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(settings.to_provider_config().is_err());
    }

    #[test]
    fn load_from_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[session\n").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.contains("failed to parse"));
        assert!(err.contains("config.toml"));
    }
}
