//! Authentication sequencer.
//!
//! Drives connect -> nonce -> sign -> login -> profile against injected
//! [`Wallet`] and [`Backend`] capabilities and persists the resulting
//! [`Session`]. Every step resets [`Status`] when it starts and converts its
//! failure into an error status; nothing is retried automatically.
//!
//! Profile fetches are scheduled by session transitions: entering
//! "credentials set, profile empty" schedules exactly one fetch. A session
//! rehydrated from storage schedules a silent fetch; a fresh login schedules
//! a visible one.
//!
//! State changes are published as [`Snapshot`]s on a watch channel so a front
//! end can render progress while a step is in flight. A step whose future is
//! dropped before completion restores the status it started from and releases
//! its pending connector, so the next trigger runs normally.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tokio::sync::watch;

use crate::backend::{Backend, LoginInput};
use crate::challenge::{challenge_message, normalize_address, truncate_address};
use crate::error::{AuthError, AuthErrorKind, AuthResult};
use crate::session::{Session, SessionStore, mask_secret};
use crate::status::Status;
use crate::wallet::{Connector, Wallet, WalletConnection};

/// Where the login control stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No wallet address available
    Disconnected,
    /// Wallet connected, no stored token
    Connected,
    /// Token stored, profile not fetched yet
    Authenticated,
    /// Steady state: identity is shown
    ProfileLoaded,
}

/// What the header control shows in place of the primary button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderControl {
    /// Connect button for the connector the primary action would use
    Connect(Option<Connector>),
    SignIn,
    LoadProfile,
    /// Profile name or truncated address
    Identity(String),
}

impl fmt::Display for HeaderControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderControl::Connect(Some(connector)) => write!(f, "Connect {}", connector.name),
            HeaderControl::Connect(None) => write!(f, "Connect wallet"),
            HeaderControl::SignIn => write!(f, "Sign in"),
            HeaderControl::LoadProfile => write!(f, "Load profile"),
            HeaderControl::Identity(name) => write!(f, "{name}"),
        }
    }
}

/// Observable state, published after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub status: Status,
    pub session: Session,
    pub connection: WalletConnection,
    /// Connectors whose connect call is in flight
    pub pending_connectors: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileFetch {
    Silent,
    Visible,
}

/// Orchestrates wallet connection, challenge/response login, and profile
/// retrieval.
pub struct AuthSequencer {
    wallet: Arc<dyn Wallet>,
    backend: Arc<dyn Backend>,
    store: SessionStore,
    connection: WalletConnection,
    session: Session,
    status: Status,
    chosen_connector: Option<String>,
    pending_connectors: BTreeSet<String>,
    scheduled_fetch: Option<ProfileFetch>,
    events: watch::Sender<Snapshot>,
}

impl fmt::Debug for AuthSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSequencer")
            .field("phase", &self.phase())
            .field("status", &self.status)
            .field("address", &self.connection.address)
            .field("user_id", &self.session.user_id())
            .finish_non_exhaustive()
    }
}

impl AuthSequencer {
    /// Creates a sequencer and rehydrates the persisted session.
    ///
    /// A stored session without a profile name schedules one silent profile
    /// fetch; run it with [`AuthSequencer::run_scheduled`].
    pub fn new(wallet: Arc<dyn Wallet>, backend: Arc<dyn Backend>, store: SessionStore) -> Self {
        let connection = WalletConnection::disconnected(wallet.connectors());
        let session = store.load();
        let scheduled_fetch = session.needs_profile().then_some(ProfileFetch::Silent);
        if session.is_authenticated() {
            tracing::debug!(
                user_id = session.user_id().unwrap_or_default(),
                needs_profile = session.needs_profile(),
                "rehydrated session"
            );
        }

        let initial = Snapshot {
            phase: Phase::Disconnected,
            status: Status::default(),
            session: session.clone(),
            connection: connection.clone(),
            pending_connectors: BTreeSet::new(),
        };
        let (events, _) = watch::channel(initial);

        let mut sequencer = Self {
            wallet,
            backend,
            store,
            connection,
            session,
            status: Status::default(),
            chosen_connector: None,
            pending_connectors: BTreeSet::new(),
            scheduled_fetch,
            events,
        };
        sequencer.publish();
        sequencer
    }

    /// Subscribes to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase(),
            status: self.status.clone(),
            session: self.session.clone(),
            connection: self.connection.clone(),
            pending_connectors: self.pending_connectors.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        if !self.connection.is_connected {
            Phase::Disconnected
        } else if !self.session.is_authenticated() {
            Phase::Connected
        } else if self.session.needs_profile() {
            Phase::Authenticated
        } else {
            Phase::ProfileLoaded
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn connection(&self) -> &WalletConnection {
        &self.connection
    }

    /// Returns true while the trigger is disabled (a step is in flight).
    pub fn is_busy(&self) -> bool {
        self.status.is_loading()
    }

    pub fn is_connector_pending(&self, connector_id: &str) -> bool {
        self.pending_connectors.contains(connector_id)
    }

    /// Remembers the connector the primary action should use.
    ///
    /// # Errors
    /// Returns `WalletUnavailable` if no connector has this id.
    pub fn choose_connector(&mut self, connector_id: &str) -> AuthResult<()> {
        if !self.connection.connectors.iter().any(|c| c.id == connector_id) {
            return Err(AuthError::wallet_unavailable(format!(
                "Unknown wallet connector: {connector_id}"
            )));
        }
        self.chosen_connector = Some(connector_id.to_string());
        Ok(())
    }

    /// The connector the primary action would connect with.
    pub fn default_connector(&self) -> Option<&Connector> {
        let connectors = &self.connection.connectors;
        self.chosen_connector
            .as_deref()
            .and_then(|id| connectors.iter().find(|c| c.id == id))
            .or_else(|| connectors.first())
    }

    /// Profile name, or the truncated wallet address.
    pub fn identity(&self) -> String {
        let name = self.session.profile_name();
        if !name.is_empty() {
            return name.to_string();
        }
        if !self.connection.address.is_empty() {
            return truncate_address(&self.connection.address);
        }
        String::new()
    }

    /// What the header shows for the current phase.
    pub fn header(&self) -> HeaderControl {
        match self.phase() {
            Phase::Disconnected => HeaderControl::Connect(self.default_connector().cloned()),
            Phase::Connected => HeaderControl::SignIn,
            Phase::Authenticated => HeaderControl::LoadProfile,
            Phase::ProfileLoaded => HeaderControl::Identity(self.identity()),
        }
    }

    /// Text of the header control: action label or identity.
    pub fn primary_label(&self) -> String {
        self.header().to_string()
    }

    /// Runs the single primary action for the current phase.
    ///
    /// Does nothing while a step is in flight or once the profile is loaded.
    ///
    /// # Errors
    /// Returns the failure of the step that ran; the status carries the same
    /// message.
    pub async fn primary_action(&mut self) -> AuthResult<()> {
        if self.is_busy() {
            tracing::debug!("primary action ignored: step in flight");
            return Ok(());
        }

        match self.phase() {
            Phase::Disconnected => self.connect(None).await,
            Phase::Connected => self.login(None).await,
            Phase::Authenticated => self.fetch_profile(false).await,
            Phase::ProfileLoaded => Ok(()),
        }
    }

    /// Connects the wallet.
    ///
    /// `None` uses the chosen connector, or the first available one.
    ///
    /// # Errors
    /// `WalletUnavailable` when no connector exists, or the wallet's own
    /// connect failure.
    pub async fn connect(&mut self, connector_id: Option<&str>) -> AuthResult<()> {
        let connector_id = match connector_id {
            Some(id) => id.to_string(),
            None => match self.default_connector() {
                Some(connector) => connector.id.clone(),
                None => {
                    return Err(self.fail(AuthError::wallet_unavailable(
                        "No wallet connector detected.",
                    )));
                }
            },
        };

        let mut step = self.begin_step(Some(connector_id.clone()));
        let result = step.connect_with(&connector_id).await;
        step.finish();
        result
    }

    async fn connect_with(&mut self, connector_id: &str) -> AuthResult<()> {
        self.set_status(Status::loading("Connecting wallet..."));

        let wallet = Arc::clone(&self.wallet);
        match wallet.connect(connector_id).await {
            Ok(address) => {
                self.connection.address = normalize_address(&address);
                self.connection.is_connected = true;
                self.connection.connectors = self.wallet.connectors();
                tracing::info!(connector = %connector_id, address = %self.connection.address, "connected");
                self.set_status(Status::success("Wallet connected."));
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Runs nonce -> sign -> login, persists the session, then fetches the
    /// profile.
    ///
    /// # Errors
    /// Returns the failure of the first step that failed.
    pub async fn login(&mut self, invite_code: Option<&str>) -> AuthResult<()> {
        let mut step = self.begin_step(None);
        let result = step.login_flow(invite_code).await;
        step.finish();
        result
    }

    async fn login_flow(&mut self, invite_code: Option<&str>) -> AuthResult<()> {
        if !self.connection.is_connected || self.connection.address.is_empty() {
            return Err(self.fail(AuthError::wallet_unavailable("Connect a wallet first.")));
        }
        let address = normalize_address(&self.connection.address);
        let backend = Arc::clone(&self.backend);
        let wallet = Arc::clone(&self.wallet);

        self.set_status(Status::loading("Requesting sign-in nonce..."));
        let nonce = match backend.get_nonce(&address).await {
            Ok(nonce) => nonce,
            Err(err) => return Err(self.fail(err)),
        };

        self.set_status(Status::loading("Waiting for wallet signature..."));
        let message = challenge_message(&nonce, &address);
        let signature = match wallet.sign_message(&message).await {
            Ok(signature) => signature,
            Err(err) if err.kind == AuthErrorKind::SignatureRejected => {
                return Err(self.fail(AuthError::signature_rejected()));
            }
            Err(err) => {
                let detail = match err.details {
                    Some(details) => format!("{}: {details}", err.message),
                    None => err.message,
                };
                return Err(self.fail(AuthError::signing_failed(detail)));
            }
        };

        self.set_status(Status::loading("Logging in..."));
        let input = LoginInput {
            address: &address,
            signature: &signature,
            invite_code: invite_code.map(str::trim).filter(|c| !c.is_empty()),
        };
        let grant = match backend.login(input).await {
            Ok(grant) => grant,
            Err(err) => return Err(self.fail(err)),
        };

        tracing::info!(
            user_id = %grant.user_id,
            token = %mask_secret(&grant.token),
            "login succeeded"
        );
        let session = Session::authenticated(grant.token, grant.user_id);
        if let Err(err) = self.replace_session(session, ProfileFetch::Visible) {
            return Err(self.fail(err));
        }
        self.set_status(Status::success("Logged in."));

        // Re-login onto a stored session that still lacks a profile is not a
        // transition, so the visible fetch is armed explicitly.
        self.scheduled_fetch = Some(ProfileFetch::Visible);
        self.run_scheduled().await
    }

    /// Runs the scheduled profile fetch, if any. Later calls do nothing until
    /// another transition schedules a fetch.
    ///
    /// # Errors
    /// Returns the failure of a visible fetch. Silent fetch failures are
    /// logged only.
    pub async fn run_scheduled(&mut self) -> AuthResult<()> {
        match self.scheduled_fetch.take() {
            Some(ProfileFetch::Silent) => {
                if let Err(err) = self.fetch_profile(true).await {
                    tracing::warn!(kind = %err.kind, error = %err, "silent profile fetch failed");
                }
                Ok(())
            }
            Some(ProfileFetch::Visible) => self.fetch_profile(false).await,
            None => Ok(()),
        }
    }

    /// Manually re-fetches the profile name.
    ///
    /// # Errors
    /// See [`AuthSequencer::fetch_profile`].
    pub async fn refresh_profile(&mut self) -> AuthResult<()> {
        self.fetch_profile(false).await
    }

    /// Fetches the profile name for the stored credentials and merges it
    /// into the session.
    ///
    /// Silent fetches leave the status untouched.
    ///
    /// # Errors
    /// `Auth` when there is no session or no name is returned, `Network` on
    /// transport failures.
    pub async fn fetch_profile(&mut self, silent: bool) -> AuthResult<()> {
        let mut step = self.begin_step(None);
        let result = step.fetch_profile_step(silent).await;
        step.finish();
        result
    }

    async fn fetch_profile_step(&mut self, silent: bool) -> AuthResult<()> {
        self.scheduled_fetch = None;
        let Some(credentials) = self.session.credentials().cloned() else {
            let err = AuthError::auth("Not logged in.");
            return Err(if silent { err } else { self.fail(err) });
        };

        if !silent {
            self.set_status(Status::loading("Loading profile..."));
        }

        let backend = Arc::clone(&self.backend);
        let result = backend
            .get_user_detail(&credentials.user_id, &credentials.token)
            .await;

        let name = match result {
            Ok(name) => name,
            Err(err) => return Err(if silent { err } else { self.fail(err) }),
        };

        if self.session.credentials() != Some(&credentials) {
            tracing::debug!("discarding profile for a replaced session");
            return Ok(());
        }

        let next = self.session.with_profile_name(name);
        if let Err(err) = self.replace_session(next, ProfileFetch::Silent) {
            return Err(if silent { err } else { self.fail(err) });
        }
        if !silent {
            self.set_status(Status::success("Profile loaded."));
        }
        Ok(())
    }

    /// Disconnects the wallet and clears the session.
    ///
    /// # Errors
    /// Returns a storage error if the empty session cannot be persisted; the
    /// in-memory session is cleared regardless.
    pub async fn logout(&mut self) -> AuthResult<()> {
        let wallet = Arc::clone(&self.wallet);
        if let Err(err) = wallet.disconnect().await {
            tracing::warn!(error = %err, "wallet disconnect failed during logout");
        }

        self.connection = WalletConnection::disconnected(self.wallet.connectors());
        let cleared = self.clear_session();
        self.set_status(Status::idle("Logged out."));
        tracing::info!("logged out");
        cleared
    }

    /// Handles a wallet disconnect reported by the wallet provider.
    ///
    /// # Errors
    /// Returns a storage error if the empty session cannot be persisted.
    pub fn on_wallet_disconnected(&mut self) -> AuthResult<()> {
        self.connection = WalletConnection::disconnected(self.wallet.connectors());
        let cleared = self.clear_session();
        self.publish();
        cleared
    }

    fn clear_session(&mut self) -> AuthResult<()> {
        self.session = Session::default();
        self.scheduled_fetch = None;
        self.store.clear()
    }

    /// Persists the session, then replaces it in memory and schedules a
    /// profile fetch when entering the "credentials set, profile empty"
    /// state. Nothing changes if the write fails.
    fn replace_session(&mut self, next: Session, fetch: ProfileFetch) -> AuthResult<()> {
        self.store.save(&next)?;

        let entering =
            next.needs_profile() && !(self.session.needs_profile() && self.session == next);
        self.session = next;
        if entering {
            self.scheduled_fetch = Some(fetch);
        }
        self.publish();
        Ok(())
    }

    /// Marks a step as started; see [`InFlight`].
    fn begin_step(&mut self, connector: Option<String>) -> InFlight<'_> {
        if let Some(id) = &connector {
            self.pending_connectors.insert(id.clone());
        }
        InFlight {
            restore: Some(self.status.clone()),
            connector,
            sequencer: self,
        }
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        self.publish();
    }

    /// Records a failure as an error status and hands it back.
    fn fail(&mut self, err: AuthError) -> AuthError {
        tracing::warn!(kind = %err.kind, error = %err, details = ?err.details, "login step failed");
        self.set_status(Status::error(err.message.clone()));
        err
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.events.send_replace(snapshot);
    }
}

/// Guard over a running step.
///
/// Always releases the step's pending connector. Unless [`InFlight::finish`]
/// ran, it also puts back the status from before the step, which is what
/// happens when the caller drops the step's future.
struct InFlight<'a> {
    sequencer: &'a mut AuthSequencer,
    restore: Option<Status>,
    connector: Option<String>,
}

impl InFlight<'_> {
    fn finish(&mut self) {
        self.restore = None;
    }
}

impl Deref for InFlight<'_> {
    type Target = AuthSequencer;

    fn deref(&self) -> &AuthSequencer {
        self.sequencer
    }
}

impl DerefMut for InFlight<'_> {
    fn deref_mut(&mut self) -> &mut AuthSequencer {
        self.sequencer
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.connector.take() {
            self.sequencer.pending_connectors.remove(&id);
        }
        if let Some(status) = self.restore.take() {
            tracing::debug!(status = %status, "step cancelled, restoring status");
            self.sequencer.status = status;
        }
        self.sequencer.publish();
    }
}
