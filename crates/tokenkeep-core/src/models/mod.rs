//! Data models for the auth API.
//!
//! - `User`: the authenticated principal as the backend reports it
//! - request bodies for the `/api/auth/*` endpoints
//! - `AuthResponse` / `MeResponse`: success payloads

pub mod user;

pub use user::{
    AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, MeResponse,
    RefreshRequest, RegisterRequest, User,
};
