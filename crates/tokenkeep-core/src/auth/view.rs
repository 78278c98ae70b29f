use std::sync::Arc;

use tokio::sync::watch;

use crate::models::User;

use super::session::{SessionPhase, SessionState};
use super::tokens::TokenStore;

/// Read-only window onto a `SessionManager`.
///
/// Feature modules that only attach tokens and show who is signed in hold
/// one of these instead of the manager. Clone freely.
#[derive(Clone)]
pub struct SessionView {
    tokens: Arc<TokenStore>,
    state: watch::Receiver<SessionState>,
}

impl SessionView {
    pub(crate) fn new(tokens: Arc<TokenStore>, state: watch::Receiver<SessionState>) -> Self {
        Self { tokens, state }
    }

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

    /// Wait for the next phase/user change and return the new state.
    ///
    /// Returns `None` once the session manager has been dropped.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait until initialization (or a login) has produced a definite answer
    pub async fn settled(&mut self) -> Option<SessionState> {
        let state = self.state.wait_for(|s| s.phase.is_settled()).await.ok()?;
        Some(state.clone())
    }
}
