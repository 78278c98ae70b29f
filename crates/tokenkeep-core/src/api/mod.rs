//! REST API client module for the todo/graph backend's auth endpoints.
//!
//! This module provides the `ApiClient` for talking to `/api/auth/*`, the
//! `Transport` seam it sends requests through, and the error normalizer
//! that turns failed responses into human-readable messages.
//!
//! Authenticated endpoints use bearer tokens obtained from login, register
//! or refresh.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::{normalize_error, TransportError};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
