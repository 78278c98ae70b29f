use thiserror::Error;

use crate::api::TransportError;
use crate::auth::StorageError;

pub type SessionResult<T> = Result<T, SessionError>;

/// Failures surfaced by session operations.
///
/// Errors are `Clone` so that a single initialization outcome can be handed
/// to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The backend rejected the credentials or the state-changing request.
    /// Displays the normalized message verbatim.
    #[error("{message}")]
    AuthRejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    #[error("Please sign in first")]
    Unauthenticated,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),
}
