//! API client for the backend's `/api/auth/*` endpoints.
//!
//! The client knows paths and payload shapes only. Deciding what a
//! non-success status means is left to the session state machine, so every
//! method returns the raw `ApiResponse`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::models::{
    ChangePasswordRequest, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest,
};

use super::{ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportError};

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const REFRESH_PATH: &str = "/api/auth/refresh";
const ME_PATH: &str = "/api/auth/me";
const PASSWORD_PATH: &str = "/api/auth/password";
const LOGOUT_PATH: &str = "/api/auth/logout";

/// API client for the auth backend.
/// Clone is cheap - the transport is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Create a client that talks to `config.api_base` over HTTP
    pub fn new(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(
            &config.api_base,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send an arbitrary request. Feature modules use this for their own
    /// endpoints, attaching the session's access token themselves.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.transport.send(request).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::post(LOGIN_PATH, &LoginRequest { email, password }))
            .await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        nickname: &str,
    ) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::post(
            REGISTER_PATH,
            &RegisterRequest {
                email,
                password,
                nickname,
            },
        ))
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::post(REFRESH_PATH, &RefreshRequest { refresh_token }))
            .await
    }

    pub async fn me(&self, access_token: &str) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::get(ME_PATH).with_bearer(access_token))
            .await
    }

    pub async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            ApiRequest::post(
                PASSWORD_PATH,
                &ChangePasswordRequest {
                    current_password,
                    new_password,
                },
            )
            .with_bearer(access_token),
        )
        .await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::post(LOGOUT_PATH, &LogoutRequest { refresh_token }))
            .await
    }
}
