//! Session commands.

use std::path::{Path, PathBuf};

use dailytracker_providers::IdentityProvider;
use dailytracker_providers::google::{GoogleConfig, OAuthCredentials};
use dailytracker_sync::SessionState;
use tracing::{info, warn};

use crate::app::App;
use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Signs in with Google.
///
/// Credentials come from the command line, a credentials file, or
/// `config.toml`. Credentials given on the command line are saved into
/// `config.toml` once sign-in succeeds.
pub async fn login(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let (credentials, source) = resolve_google_credentials(
        client_id,
        client_secret,
        credentials_file,
        config.google.as_ref(),
    )?;
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let google = provider_config(credentials.clone(), config.google.as_ref())?;
    let app = App::new(&google, config)?;

    if force {
        app.session.sign_out().await;
    } else if app.session.restore().is_signed_in() {
        save_credentials_to_config(config_path, &credentials, &source)?;
        print_state(app.session.state());
        println!("Use --force to sign in again.");
        return Ok(());
    }

    if !app.identity.has_grant() {
        println!("A browser window will open for you to authorize access to Google Sheets.");
        println!("If it doesn't, check the terminal for a URL to copy.");
        println!();
    }

    let state = app.session.restore_or_authenticate().await;
    if !state.is_signed_in() {
        return Err(ClientError::AuthRequired(
            "sign-in did not complete, run with --debug for details".to_string(),
        ));
    }

    save_credentials_to_config(config_path, &credentials, &source)?;
    info!("signed in with Google");
    print_state(state);
    Ok(())
}

/// Revokes the token and forgets the session and the standing grant.
pub async fn logout(config: &ClientConfig) -> ClientResult<()> {
    let app = App::from_config(config)?;
    app.session.sign_out().await;

    // Nothing to revoke when the last token lapsed, but the grant still goes.
    app.identity.grants().clear()?;

    println!("Signed out.");
    Ok(())
}

/// Reports the persisted session without contacting Google.
pub fn status(config: &ClientConfig) -> ClientResult<()> {
    let app = match App::from_config(config) {
        Ok(app) => app,
        Err(ClientError::Config(msg)) => {
            println!("Not configured.");
            warn!("{}", msg);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    print_state(app.session.restore());
    println!(
        "Standing grant: {}",
        if app.identity.has_grant() {
            "yes"
        } else {
            "no"
        }
    );
    println!("Session store: {}", config.session.store_path().display());
    Ok(())
}

fn print_state(state: SessionState) {
    match state {
        SessionState::SignedIn { expires_at } => {
            println!(
                "Signed in, token valid until {}.",
                expires_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
            );
        }
        SessionState::SignedOut => println!("Signed out."),
    }
}

fn provider_config(
    credentials: OAuthCredentials,
    settings: Option<&GoogleSettings>,
) -> ClientResult<GoogleConfig> {
    // Reuse everything but the credentials from config.toml.
    let base = match settings {
        Some(settings) if settings.client_id.is_some() && settings.client_secret.is_some() => {
            settings.to_provider_config().ok()
        }
        _ => None,
    };

    let mut google = match base {
        Some(mut config) => {
            config.credentials = credentials;
            config
        }
        None => {
            let mut config = GoogleConfig::new(credentials);
            if let Some(path) = settings.and_then(|s| s.grant_path.as_ref()) {
                config = config.with_grant_path(path);
            }
            config
        }
    };

    if let Some(raw) = settings.and_then(|s| s.api_key.as_deref())
        && google.api_key.is_none()
    {
        let api_key = crate::secret::resolve(raw)
            .map_err(|e| ClientError::Config(format!("failed to resolve api_key: {}", e)))?;
        google = google.with_api_key(api_key);
    }

    google.validate().map_err(ClientError::Config)?;
    Ok(google)
}

/// Where the credentials were resolved from.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// From CLI flags or a credentials file.
    Cli,
    /// From config.toml.
    Config,
}

/// Saves credentials to `config.toml` under `[google]`.
///
/// A no-op when they were read from `config.toml` in the first place.
/// Other settings and comments in the file are preserved.
fn save_credentials_to_config(
    config_path: &Path,
    credentials: &OAuthCredentials,
    source: &CredentialSource,
) -> ClientResult<()> {
    if *source == CredentialSource::Config {
        return Ok(());
    }

    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::Config(format!(
            "could not parse {} for writing: {}",
            config_path.display(),
            e
        ))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::Config(format!(
            "`google` in {} is not a table",
            config_path.display()
        ))
    })?;
    google["client_id"] = toml_edit::value(credentials.client_id.as_str());
    google["client_secret"] = toml_edit::value(credentials.client_secret.as_str());

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;

    info!(path = %config_path.display(), "saved credentials");
    println!("Credentials saved to {}", config_path.display());
    Ok(())
}

/// Resolves Google credentials.
///
/// Priority (highest to lowest):
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file` (Google Cloud Console JSON)
/// 3. `[google]` in config.toml, with secret references resolved
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    match (cli_client_id, cli_client_secret) {
        (Some(id), Some(secret)) => {
            return Ok((OAuthCredentials::new(id, secret), CredentialSource::Cli));
        }
        (None, None) => {}
        _ => {
            return Err(ClientError::Config(
                "both --client-id and --client-secret are required when providing credentials directly"
                    .to_string(),
            ));
        }
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((creds, CredentialSource::Cli));
    }

    if let Some(google) = config_google
        && google.client_id.is_some()
        && google.client_secret.is_some()
    {
        let creds = google.resolve_credentials().map_err(|e| {
            ClientError::Config(format!(
                "failed to resolve Google credentials from config: {}",
                e
            ))
        })?;
        return Ok((creds, CredentialSource::Config));
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}
