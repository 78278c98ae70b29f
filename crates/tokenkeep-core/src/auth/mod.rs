//! Authentication module for managing the user's session.
//!
//! This module provides:
//! - `TokenStore`: the access/refresh token pair, mirrored to durable storage
//! - `TokenStorage` backends: JSON file, OS keychain (keyring), memory
//! - `SessionManager`: login, register, refresh, password change, logout and
//!   single-flight cold-start initialization
//! - `SessionView`: read-only access for features that only consume tokens
//!
//! Tokens are never inspected for expiry. A rejected access token is renewed
//! with the refresh token; a rejected refresh token ends the session.

mod identity;
pub mod session;
pub mod storage;
pub mod tokens;
pub mod view;

pub use session::{SessionManager, SessionPhase, SessionState};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, StorageError, TokenStorage};
pub use tokens::{TokenStore, Tokens};
pub use view::SessionView;
