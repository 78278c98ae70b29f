use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use super::storage::{StorageError, TokenStorage};

/// Durable slot for the access token
pub const ACCESS_TOKEN_KEY: &str = "auth.accessToken";

/// Durable slot for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "auth.refreshToken";

/// In-memory copy of the durable slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl Tokens {
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Access/refresh token pair mirrored between durable storage and memory.
///
/// Reads never touch storage. Writes replace both tokens under one lock, so
/// no reader ever sees a new access token next to an old refresh token.
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    tokens: RwLock<Tokens>,
}

impl TokenStore {
    /// Read both slots from durable storage
    pub fn open(storage: Arc<dyn TokenStorage>) -> Result<Self, StorageError> {
        let tokens = Tokens {
            access: storage.load(ACCESS_TOKEN_KEY)?,
            refresh: storage.load(REFRESH_TOKEN_KEY)?,
        };
        debug!(
            has_access = tokens.access.is_some(),
            has_refresh = tokens.refresh.is_some(),
            "Token store opened"
        );
        Ok(Self {
            storage,
            tokens: RwLock::new(tokens),
        })
    }

    /// Overwrite both tokens.
    ///
    /// Memory is only updated once both durable writes succeeded.
    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), StorageError> {
        let mut tokens = self.write();
        self.storage.store(ACCESS_TOKEN_KEY, access)?;
        self.storage.store(REFRESH_TOKEN_KEY, refresh)?;
        *tokens = Tokens {
            access: Some(access.to_string()),
            refresh: Some(refresh.to_string()),
        };
        Ok(())
    }

    /// Remove both tokens. Idempotent.
    ///
    /// Memory is always cleared. Both durable slots are attempted before the
    /// first storage error, if any, is returned.
    pub fn clear_tokens(&self) -> Result<(), StorageError> {
        let mut tokens = self.write();
        *tokens = Tokens::default();

        let access = self.storage.remove(ACCESS_TOKEN_KEY);
        let refresh = self.storage.remove(REFRESH_TOKEN_KEY);
        if let Err(ref e) = access {
            warn!(error = %e, "Failed to remove stored access token");
        }
        if let Err(ref e) = refresh {
            warn!(error = %e, "Failed to remove stored refresh token");
        }
        access.and(refresh)
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh.clone()
    }

    /// Both tokens read under one lock
    pub fn tokens(&self) -> Tokens {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tokens> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tokens> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }
}
