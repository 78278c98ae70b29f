//! Client-side session management for the todo/graph backend.
//!
//! The crate owns an authenticated user's credentials inside a long-lived
//! process: it persists the access/refresh token pair, tracks who is signed
//! in, and renews credentials without duplicating network work when several
//! consumers ask at once.
//!
//! - `auth`: token store, durable storage backends, the session state machine
//! - `api`: endpoint client over a pluggable HTTP transport
//! - `models`: wire payloads and the current user
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiClient, ApiRequest, ApiResponse, Transport, TransportError};
pub use auth::{SessionManager, SessionPhase, SessionState, SessionView, TokenStore};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use models::User;
