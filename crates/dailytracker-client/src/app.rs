//! Wiring of providers and services for one CLI run.

use std::sync::Arc;

use dailytracker_providers::FileStore;
use dailytracker_providers::google::{GoogleConfig, GoogleIdentity, GoogleSheetsClient};
use dailytracker_sync::{SessionManager, SheetSyncService};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// The session and sync services, built from configuration.
pub struct App {
    pub identity: Arc<GoogleIdentity>,
    pub session: Arc<SessionManager>,
    pub sync: SheetSyncService,
}

impl App {
    /// Builds the services from the `[google]`, `[session]` and `[sheet]` sections.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let google = config
            .google()
            .and_then(|g| g.to_provider_config())
            .map_err(ClientError::Config)?;
        Self::new(&google, config)
    }

    /// Builds the services with an explicit provider configuration.
    pub fn new(google: &GoogleConfig, config: &ClientConfig) -> ClientResult<Self> {
        let store_path = config.session.store_path();
        debug!(
            store = %store_path.display(),
            grant = %google.grant_path.display(),
            "building services"
        );

        let identity = Arc::new(GoogleIdentity::new(google)?);
        let sheets = Arc::new(GoogleSheetsClient::new(google)?);
        let store = Arc::new(FileStore::new(store_path));

        let session = Arc::new(SessionManager::new(identity.clone(), store));
        let sync = SheetSyncService::new(session.clone(), sheets, config.sheet.to_sheet_config());

        Ok(Self {
            identity,
            session,
            sync,
        })
    }
}
