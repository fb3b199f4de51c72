//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret::SecretRef;

/// Dumps the configuration to stdout with literal secrets masked.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&redacted(config))
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", config_path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validates the configuration, resolving secret references.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    if let Some(ref google) = config.google {
        google
            .to_provider_config()
            .map_err(|e| ClientError::Config(format!("invalid Google settings: {}", e)))?;
        println!("Google credentials are valid.");
    }

    if config.session.refresh_interval_secs == 0 {
        return Err(ClientError::Config(
            "session.refresh_interval_secs must be greater than zero".to_string(),
        ));
    }

    if config.sheet.name.trim().is_empty() {
        return Err(ClientError::Config("sheet.name must not be empty".to_string()));
    }
    if !config.sheet.range.contains('!') {
        return Err(ClientError::Config(format!(
            "sheet.range must name a sheet and a cell, e.g. Sheet1!A1 (got {:?})",
            config.sheet.range
        )));
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Shows the configuration file path.
pub fn path(config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    Ok(())
}

fn redacted(config: &ClientConfig) -> ClientConfig {
    let mut config = config.clone();
    if let Some(ref mut google) = config.google {
        for value in [&mut google.client_secret, &mut google.api_key]
            .into_iter()
            .flatten()
        {
            if !SecretRef::parse(value).is_reference() {
                *value = "<redacted>".to_string();
            }
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleSettings;

    fn google(secret: &str) -> GoogleSettings {
        GoogleSettings {
            client_id: Some("id.apps.googleusercontent.com".to_string()),
            client_secret: Some(secret.to_string()),
            api_key: Some("AIza-plain".to_string()),
            grant_path: None,
        }
    }

    #[test]
    fn redacts_literal_secrets_only() {
        let config = ClientConfig {
            google: Some(google("plain-secret")),
            ..Default::default()
        };
        let settings = redacted(&config).google.unwrap();
        assert_eq!(settings.client_id.as_deref(), Some("id.apps.googleusercontent.com"));
        assert_eq!(settings.client_secret.as_deref(), Some("<redacted>"));
        assert_eq!(settings.api_key.as_deref(), Some("<redacted>"));

        let config = ClientConfig {
            google: Some(google("pass::google/tracker")),
            ..Default::default()
        };
        assert_eq!(
            redacted(&config).google.unwrap().client_secret.as_deref(),
            Some("pass::google/tracker")
        );
    }

    #[test]
    fn validate_checks_sheet_settings() {
        let mut config = ClientConfig::default();
        assert!(validate(&config).is_ok());

        config.sheet.range = "A1".to_string();
        assert!(validate(&config).is_err());

        let mut config = ClientConfig::default();
        config.session.refresh_interval_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn validate_checks_credentials() {
        let config = ClientConfig {
            google: Some(GoogleSettings {
                client_id: Some("not-google".to_string()),
                client_secret: Some("secret".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }
}
