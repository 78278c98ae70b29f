//! "My todos", the reference consumer of the session.
//!
//! Feature code owns its retry policy: read the access token, send, and on a
//! 401 refresh once and retry once.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde::Deserialize;
use tokenkeep_core::api::{normalize_error, ApiRequest, ApiResponse};
use tokenkeep_core::{ApiClient, SessionManager};
use tracing::debug;

const MY_TODOS_PATH: &str = "/api/todos/mine";

#[derive(Debug, Clone, Deserialize)]
pub struct Todo {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub heat: i64,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

fn default_status() -> String {
    "Pending".to_string()
}

impl Todo {
    pub fn summary_line(&self) -> String {
        let created = self
            .created_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "#{:<5} [{:<11}] {} ({}, heat {})",
            self.id, self.status, self.title, created, self.heat
        )
    }
}

pub async fn fetch_my_todos(session: &SessionManager, api: &ApiClient) -> Result<Vec<Todo>> {
    let response = send_authorized(session, api, || ApiRequest::get(MY_TODOS_PATH)).await?;
    if !response.is_success() {
        bail!("{}", normalize_error(&response));
    }
    response.json().context("Failed to parse todos")
}

/// Send with the current access token, renewing the session and retrying
/// once if the backend answers 401.
async fn send_authorized(
    session: &SessionManager,
    api: &ApiClient,
    build: impl Fn() -> ApiRequest,
) -> Result<ApiResponse> {
    let token = session
        .access_token()
        .ok_or_else(|| anyhow!("Please sign in to view your ideas."))?;
    let response = api.send(build().with_bearer(token)).await?;
    if response.status() != StatusCode::UNAUTHORIZED {
        return Ok(response);
    }

    debug!("Access token rejected, refreshing once");
    if session.refresh().await?.is_none() {
        bail!("Your session has expired. Please sign in again.");
    }
    let token = session
        .access_token()
        .ok_or_else(|| anyhow!("Please sign in to view your ideas."))?;
    Ok(api.send(build().with_bearer(token)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use futures::future::BoxFuture;
    use serde_json::{json, Value};
    use tokenkeep_core::api::{Transport, TransportError};
    use tokenkeep_core::auth::MemoryStorage;

    /// Answers from one queue in order and records the requests
    #[derive(Default)]
    struct QueueTransport {
        responses: Mutex<VecDeque<(u16, Value)>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl QueueTransport {
        fn with(responses: Vec<(u16, Value)>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for QueueTransport {
        fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, TransportError>> {
            self.requests.lock().unwrap().push(request);
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            Box::pin(async move {
                Ok(ApiResponse::new(
                    StatusCode::from_u16(status).unwrap(),
                    serde_json::to_vec(&body).unwrap(),
                ))
            })
        }
    }

    fn auth_body(access: &str, refresh: &str) -> Value {
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "user": {"id": 1, "email": "a@b.com", "nickname": "a"},
        })
    }

    fn todo_list() -> Value {
        json!([{
            "id": 4,
            "title": "Water plants",
            "content": "",
            "status": "In Progress",
            "author": "a",
            "heat": 2,
            "created_at": "2024-05-01T08:00:00",
        }])
    }

    async fn signed_in(transport: Arc<QueueTransport>) -> (SessionManager, ApiClient) {
        let api = ApiClient::with_transport(transport);
        let session = SessionManager::new(api.clone(), Arc::new(MemoryStorage::new())).unwrap();
        session.login("a@b.com", "password1").await.unwrap();
        (session, api)
    }

    #[tokio::test]
    async fn test_fetch_with_valid_token() {
        let transport = QueueTransport::with(vec![(200, auth_body("A1", "R1")), (200, todo_list())]);
        let (session, api) = signed_in(transport.clone()).await;

        let todos = fetch_my_todos(&session, &api).await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Water plants");
        assert_eq!(transport.requests()[1].bearer.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_refreshes_and_retries_once_on_401() {
        let transport = QueueTransport::with(vec![
            (200, auth_body("A1", "R1")),
            (401, json!({"error": "access token expired"})),
            (200, auth_body("A2", "R2")),
            (200, todo_list()),
        ]);
        let (session, api) = signed_in(transport.clone()).await;

        let todos = fetch_my_todos(&session, &api).await.unwrap();
        assert_eq!(todos[0].id, 4);

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[2].path, "/api/auth/refresh");
        assert_eq!(requests[3].path, "/api/todos/mine");
        assert_eq!(requests[3].bearer.as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_does_not_retry_twice() {
        let transport = QueueTransport::with(vec![
            (200, auth_body("A1", "R1")),
            (401, json!({"error": "access token expired"})),
            (200, auth_body("A2", "R2")),
            (401, json!({"error": "account not available"})),
        ]);
        let (session, api) = signed_in(transport.clone()).await;

        let err = fetch_my_todos(&session, &api).await.unwrap_err();
        assert_eq!(err.to_string(), "account not available");
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_refresh_asks_to_sign_in() {
        let transport = QueueTransport::with(vec![
            (200, auth_body("A1", "R1")),
            (401, json!({"error": "access token expired"})),
            (401, json!({"error": "refresh token revoked"})),
        ]);
        let (session, api) = signed_in(transport).await;

        let err = fetch_my_todos(&session, &api).await.unwrap_err();
        assert_eq!(err.to_string(), "Your session has expired. Please sign in again.");
        assert_eq!(session.access_token(), None);
    }

    #[tokio::test]
    async fn test_requires_sign_in() {
        let transport = QueueTransport::with(vec![]);
        let api = ApiClient::with_transport(transport.clone());
        let session = SessionManager::new(api.clone(), Arc::new(MemoryStorage::new())).unwrap();

        let err = fetch_my_todos(&session, &api).await.unwrap_err();
        assert_eq!(err.to_string(), "Please sign in to view your ideas.");
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_summary_line() {
        let todos: Vec<Todo> = serde_json::from_value(todo_list()).unwrap();
        assert_eq!(
            todos[0].summary_line(),
            "#4     [In Progress] Water plants (2024-05-01, heat 2)"
        );
    }
}
