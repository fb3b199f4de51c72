//! Background token refresher.
//!
//! Checks the session for expiry once when started and then on a fixed
//! interval, replacing the token silently when it has run out. It runs
//! independently of submissions and never cancels requests in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::session::{RefreshOutcome, SessionManager};

/// Refresher configuration.
#[derive(Debug, Clone)]
pub struct RefresherConfig {
    /// Time between expiry checks.
    pub interval: Duration,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
        }
    }
}

impl RefresherConfig {
    /// Shortest interval a refresher will wait between checks.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Creates a config, raising `interval` to [`Self::MIN_INTERVAL`] if needed.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Self::MIN_INTERVAL),
        }
    }
}

/// Commands accepted by a running refresher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefresherCommand {
    /// Check for expiry now.
    CheckNow,
    /// Stop the refresher.
    Stop,
}

/// Counters describing what the refresher has done.
#[derive(Debug, Clone, Default)]
pub struct RefresherState {
    /// Number of expiry checks run.
    pub checks: u64,
    /// Checks that obtained a new token.
    pub refreshes: u64,
    /// Checks whose refresh was refused.
    pub failures: u64,
    /// When the last check ran.
    pub last_check: Option<DateTime<Utc>>,
    /// Message of the last refresh failure.
    pub last_error: Option<String>,
}

impl RefresherState {
    fn record(&mut self, outcome: &RefreshOutcome) {
        self.checks += 1;
        self.last_check = Some(Utc::now());
        match outcome {
            RefreshOutcome::Refreshed { .. } => {
                self.refreshes += 1;
                self.last_error = None;
            }
            RefreshOutcome::Failed(e) => {
                self.failures += 1;
                self.last_error = Some(e.to_string());
            }
            RefreshOutcome::NoSession | RefreshOutcome::NotNeeded => {}
        }
    }
}

type SharedRefresherState = Arc<RwLock<RefresherState>>;

/// Periodically refreshes the session's access token.
pub struct Refresher {
    config: RefresherConfig,
    session: Arc<SessionManager>,
    state: SharedRefresherState,
    command_tx: mpsc::Sender<RefresherCommand>,
    command_rx: mpsc::Receiver<RefresherCommand>,
}

impl Refresher {
    pub fn new(config: RefresherConfig, session: Arc<SessionManager>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            // Literal configs skip the clamp in `new`.
            config: RefresherConfig::new(config.interval),
            session,
            state: Arc::new(RwLock::new(RefresherState::default())),
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for controlling the refresher once it runs.
    pub fn handle(&self) -> RefresherHandle {
        RefresherHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Runs until stopped or every handle is dropped.
    pub async fn run(self) {
        let Self {
            config,
            session,
            state,
            command_tx,
            mut command_rx,
        } = self;
        // Only handles keep the channel open.
        drop(command_tx);

        info!(interval_secs = config.interval.as_secs(), "refresher started");

        check(&session, &state).await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(config.interval) => {
                    check(&session, &state).await;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(RefresherCommand::CheckNow) => {
                            debug!("received CheckNow command");
                            check(&session, &state).await;
                        }
                        Some(RefresherCommand::Stop) | None => {
                            info!("refresher stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn check(session: &SessionManager, state: &RwLock<RefresherState>) {
    let outcome = session.refresh_if_expired().await;
    match &outcome {
        RefreshOutcome::Refreshed { expires_at } => debug!(%expires_at, "token refreshed"),
        RefreshOutcome::Failed(e) => warn!(error = %e, "background refresh failed"),
        RefreshOutcome::NoSession | RefreshOutcome::NotNeeded => {}
    }
    state.write().await.record(&outcome);
}

/// Handle for a running [`Refresher`].
#[derive(Clone, Debug)]
pub struct RefresherHandle {
    command_tx: mpsc::Sender<RefresherCommand>,
    state: SharedRefresherState,
}

impl RefresherHandle {
    /// Requests an immediate expiry check.
    pub async fn check_now(&self) -> Result<(), mpsc::error::SendError<RefresherCommand>> {
        self.command_tx.send(RefresherCommand::CheckNow).await
    }

    /// Stops the refresher.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<RefresherCommand>> {
        self.command_tx.send(RefresherCommand::Stop).await
    }

    /// Returns a snapshot of the refresher counters.
    pub async fn state(&self) -> RefresherState {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIdentity;
    use dailytracker_providers::{MemoryStore, Prompt};

    async fn expiring_session(identity: &Arc<FakeIdentity>) -> Arc<SessionManager> {
        // Tokens expire the moment they are issued, so every check refreshes.
        identity.set_expires_in(0);
        let session = Arc::new(SessionManager::new(
            identity.clone(),
            Arc::new(MemoryStore::new()),
        ));
        session.restore_or_authenticate().await;
        session
    }

    #[test]
    fn default_interval_is_five_minutes() {
        assert_eq!(RefresherConfig::default().interval, Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn checks_on_start_and_every_interval() {
        let identity = Arc::new(FakeIdentity::new());
        let session = expiring_session(&identity).await;

        let refresher = Refresher::new(RefresherConfig::new(Duration::from_secs(300)), session);
        let handle = refresher.handle();
        let task = tokio::spawn(refresher.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.state().await.checks, 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        let state = handle.state().await;
        assert_eq!(state.checks, 2);
        assert_eq!(state.refreshes, 2);
        assert_eq!(
            identity.requests(),
            vec![Prompt::Consent, Prompt::None, Prompt::None]
        );

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[test]
    fn zero_interval_is_raised_to_minimum() {
        assert_eq!(
            RefresherConfig::new(Duration::ZERO).interval,
            RefresherConfig::MIN_INTERVAL
        );
        assert_eq!(
            RefresherConfig::new(Duration::from_secs(60)).interval,
            Duration::from_secs(60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_does_not_spin() {
        let identity = Arc::new(FakeIdentity::new());
        let session = Arc::new(SessionManager::new(identity, Arc::new(MemoryStore::new())));

        let config = RefresherConfig {
            interval: Duration::ZERO,
        };
        let refresher = Refresher::new(config, session);
        let handle = refresher.handle();
        let task = tokio::spawn(refresher.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.state().await.checks, 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.state().await.checks, 2);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn check_now_runs_immediately() {
        let identity = Arc::new(FakeIdentity::new());
        let session = Arc::new(SessionManager::new(
            identity.clone(),
            Arc::new(MemoryStore::new()),
        ));

        let refresher = Refresher::new(RefresherConfig::default(), session);
        let handle = refresher.handle();
        let task = tokio::spawn(refresher.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.check_now().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let state = handle.state().await;
        assert_eq!(state.checks, 2);
        assert_eq!(state.refreshes, 0);
        assert!(identity.requests().is_empty());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn refused_refresh_is_counted() {
        let identity = Arc::new(FakeIdentity::new());
        let session = expiring_session(&identity).await;
        identity.fail_requests(true);

        let refresher = Refresher::new(RefresherConfig::default(), session.clone());
        let handle = refresher.handle();
        let task = tokio::spawn(refresher.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        let state = handle.state().await;
        assert_eq!(state.failures, 1);
        assert!(state.last_error.is_some());
        assert!(!session.is_signed_in());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stops_when_handles_are_dropped() {
        let identity = Arc::new(FakeIdentity::new());
        let session = Arc::new(SessionManager::new(identity, Arc::new(MemoryStore::new())));

        let refresher = Refresher::new(RefresherConfig::default(), session);
        let handle = refresher.handle();
        let task = tokio::spawn(refresher.run());
        drop(handle);

        task.await.unwrap();
    }
}
