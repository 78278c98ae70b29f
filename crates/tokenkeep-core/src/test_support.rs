//! In-process transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::api::{ApiRequest, ApiResponse, Transport, TransportError};

/// Answers requests from per-path queues and records everything it is sent.
///
/// Each send yields to the scheduler once before answering, so callers
/// joined on the same task interleave the way real network calls would.
/// Paths with an empty queue answer `404 {"error": "no scripted response"}`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Result<ApiResponse, TransportError>>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: Value) -> &Self {
        let response = ApiResponse::new(
            StatusCode::from_u16(status).unwrap(),
            serde_json::to_vec(&body).unwrap(),
        );
        self.push(path, Ok(response));
        self
    }

    pub fn respond_raw(&self, path: &str, status: u16, body: &str) -> &Self {
        let response = ApiResponse::new(
            StatusCode::from_u16(status).unwrap(),
            body.as_bytes().to_vec(),
        );
        self.push(path, Ok(response));
        self
    }

    pub fn fail(&self, path: &str, message: &str) -> &Self {
        self.push(path, Err(TransportError::new(message)));
        self
    }

    fn push(&self, path: &str, outcome: Result<ApiResponse, TransportError>) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, TransportError>> {
        Box::pin(async move {
            let path = request.path.clone();
            self.requests.lock().unwrap().push(request);

            tokio::task::yield_now().await;

            let next = self
                .routes
                .lock()
                .unwrap()
                .get_mut(&path)
                .and_then(|queue| queue.pop_front());
            next.unwrap_or_else(|| {
                Ok(ApiResponse::new(
                    StatusCode::NOT_FOUND,
                    serde_json::to_vec(&json!({"error": "no scripted response"})).unwrap(),
                ))
            })
        })
    }
}

/// A backend user payload
pub fn user_json(id: i64, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "nickname": email.split('@').next().unwrap_or(email),
        "created_at": "2024-01-01T00:00:00",
        "last_login_at": null,
    })
}

/// A login/register/refresh success payload
pub fn auth_json(access: &str, refresh: &str, id: i64, email: &str) -> Value {
    json!({
        "user": user_json(id, email),
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 900,
    })
}
