//! The session state machine.
//!
//! `SessionManager` owns the token store and the current user, and is the
//! only place either is mutated. Share it as `Arc<SessionManager>`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::api::error::truncate_body;
use crate::api::{normalize_error, ApiClient, ApiResponse};
use crate::error::{SessionError, SessionResult};
use crate::models::{AuthResponse, User};

use super::identity::fetch_identity;
use super::storage::{StorageError, TokenStorage};
use super::tokens::TokenStore;
use super::view::SessionView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub enum SessionPhase {
    /// Nothing has asked for initialization yet
    Idle,
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// What just happened to the session.
#[derive(Debug, Clone)]
pub(crate) enum SessionEvent {
    InitStarted,
    SignedIn(User),
    SignedOut,
}

impl SessionPhase {
    pub(crate) fn next(self, event: &SessionEvent) -> SessionPhase {
        match (self, event) {
            (SessionPhase::Idle, SessionEvent::InitStarted) => SessionPhase::Initializing,
            // Only the first initialization leaves Idle
            (phase, SessionEvent::InitStarted) => phase,
            (_, SessionEvent::SignedIn(_)) => SessionPhase::Authenticated,
            (_, SessionEvent::SignedOut) => SessionPhase::Unauthenticated,
        }
    }

    /// True once a definite answer is known
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            SessionPhase::Authenticated | SessionPhase::Unauthenticated
        )
    }
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub user: Option<User>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            user: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated && self.user.is_some()
    }
}

pub struct SessionManager {
    api: ApiClient,
    tokens: Arc<TokenStore>,
    state: watch::Sender<SessionState>,
    init: OnceCell<SessionResult<Option<User>>>,
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    /// Build a session over `storage`, reading any tokens left by an earlier run
    pub fn new(api: ApiClient, storage: Arc<dyn TokenStorage>) -> Result<Self, StorageError> {
        let tokens = Arc::new(TokenStore::open(storage)?);
        let (state, _) = watch::channel(SessionState::new());
        Ok(Self {
            api,
            tokens,
            state,
            init: OnceCell::new(),
            refresh_gate: Mutex::new(()),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.access_token()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.refresh_token()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every phase/user change from now on
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Read-only handle for features that never mutate the session
    pub fn view(&self) -> SessionView {
        SessionView::new(Arc::clone(&self.tokens), self.state.subscribe())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Resolve the session at cold start.
    ///
    /// The first call performs the work; every other call, concurrent or
    /// later, gets the same outcome without touching the network.
    pub async fn initialize(&self) -> SessionResult<Option<User>> {
        self.init
            .get_or_init(|| self.run_initialize())
            .await
            .clone()
    }

    async fn run_initialize(&self) -> SessionResult<Option<User>> {
        self.apply(SessionEvent::InitStarted);

        let tokens = self.tokens.tokens();
        if tokens.is_empty() {
            debug!("No stored tokens, starting signed out");
            self.apply(SessionEvent::SignedOut);
            return Ok(None);
        }

        let outcome = self.initialize_from_tokens(tokens.refresh.is_some()).await;
        match outcome {
            Ok(Some(ref user)) => info!(user_id = user.id, "Session restored"),
            Ok(None) => {
                info!("Stored session is no longer valid");
                self.apply(SessionEvent::SignedOut);
            }
            Err(ref e) => {
                // Tokens are kept so a later refresh can still recover them
                warn!(error = %e, "Session initialization failed");
                self.apply(SessionEvent::SignedOut);
            }
        }
        outcome
    }

    async fn initialize_from_tokens(&self, has_refresh: bool) -> SessionResult<Option<User>> {
        if let Some(user) = self.identify().await? {
            return Ok(Some(user));
        }
        if has_refresh {
            debug!("Access token unusable, trying refresh");
            return self.refresh().await;
        }
        Ok(None)
    }

    /// Fetch the current identity and install it on success.
    async fn identify(&self) -> SessionResult<Option<User>> {
        let access_token = self.tokens.access_token();
        let user = fetch_identity(&self.api, access_token.as_deref()).await?;
        if let Some(ref user) = user {
            self.apply(SessionEvent::SignedIn(user.clone()));
        }
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> SessionResult<User> {
        debug!("Logging in");
        let response = self.api.login(email, password).await?;
        let user = self.accept_credentials(response)?;
        info!(user_id = user.id, "Logged in");
        Ok(user)
    }

    pub async fn register(&self, email: &str, password: &str, nickname: &str) -> SessionResult<User> {
        debug!("Registering account");
        let response = self.api.register(email, password, nickname).await?;
        let user = self.accept_credentials(response)?;
        info!(user_id = user.id, "Registered and logged in");
        Ok(user)
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// `Ok(None)` when there is no refresh token, or when the backend refused
    /// it; in the latter case the whole session is cleared. Callers queued
    /// behind an in-flight refresh share its result instead of sending the
    /// same (by then spent) refresh token again.
    pub async fn refresh(&self) -> SessionResult<Option<User>> {
        let observed = self.tokens.refresh_token();
        let _gate = self.refresh_gate.lock().await;

        let current = self.tokens.refresh_token();
        if current != observed {
            debug!("Refresh already settled by another caller");
            return Ok(self.current_user());
        }
        let Some(refresh_token) = current else {
            return Ok(None);
        };

        let response = self.api.refresh(&refresh_token).await?;
        if !response.is_success() {
            info!(
                status = %response.status(),
                reason = %normalize_error(&response),
                "Refresh token rejected, clearing session"
            );
            self.reset()?;
            return Ok(None);
        }

        let auth = Self::parse_auth(&response)?;
        let user = self.install(auth)?;
        debug!(user_id = user.id, "Session refreshed");
        Ok(Some(user))
    }

    /// Change the signed-in user's password. Tokens are left as they are.
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> SessionResult<()> {
        let access_token = self.tokens.access_token().ok_or(SessionError::Unauthenticated)?;

        let response = self
            .api
            .change_password(&access_token, current_password, new_password)
            .await?;
        if !response.is_success() {
            return Err(Self::rejection(&response));
        }
        info!("Password changed");
        Ok(())
    }

    /// Sign out locally, telling the backend when there is a refresh token
    /// to revoke. The backend's answer never blocks local cleanup.
    pub async fn logout(&self) -> SessionResult<()> {
        if let Some(refresh_token) = self.tokens.refresh_token() {
            match self.api.logout(&refresh_token).await {
                Ok(response) if response.is_success() => debug!("Refresh token revoked"),
                Ok(response) => warn!(
                    status = %response.status(),
                    body = %truncate_body(response.body()),
                    "Logout not acknowledged by server"
                ),
                Err(e) => warn!(error = %e, "Failed to notify server of logout"),
            }
        }
        self.reset()?;
        info!("Logged out");
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Publish a state change. The only place the current user is assigned.
    fn apply(&self, event: SessionEvent) {
        self.state.send_modify(|state| {
            let next = state.phase.next(&event);
            if next != state.phase {
                debug!(from = ?state.phase, to = ?next, "Session phase changed");
            }
            state.phase = next;
            match event {
                SessionEvent::InitStarted => {}
                SessionEvent::SignedIn(user) => state.user = Some(user),
                SessionEvent::SignedOut => state.user = None,
            }
        });
    }

    /// Handle a login/register response: install on success, reject otherwise
    fn accept_credentials(&self, response: ApiResponse) -> SessionResult<User> {
        if !response.is_success() {
            let err = Self::rejection(&response);
            debug!(status = %response.status(), error = %err, "Credentials rejected");
            return Err(err);
        }
        let auth = Self::parse_auth(&response)?;
        self.install(auth)
    }

    fn install(&self, auth: AuthResponse) -> SessionResult<User> {
        self.tokens.set_tokens(&auth.access_token, &auth.refresh_token)?;
        self.apply(SessionEvent::SignedIn(auth.user.clone()));
        Ok(auth.user)
    }

    /// Drop tokens and user. The user is cleared even if storage fails.
    fn reset(&self) -> SessionResult<()> {
        let cleared = self.tokens.clear_tokens();
        self.apply(SessionEvent::SignedOut);
        cleared.map_err(SessionError::from)
    }

    fn parse_auth(response: &ApiResponse) -> SessionResult<AuthResponse> {
        response
            .json()
            .map_err(|e| SessionError::InvalidResponse(format!("auth response: {}", e)))
    }

    fn rejection(response: &ApiResponse) -> SessionError {
        SessionError::AuthRejected {
            status: response.status().as_u16(),
            message: normalize_error(response),
        }
    }
}
