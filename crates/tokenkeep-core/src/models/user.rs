use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The signed-in user.
///
/// Timestamps arrive as ISO-8601 without an offset (server UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    #[serde(default)]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub last_login_at: Option<NaiveDateTime>,
}

impl User {
    /// Name to show in the UI, falling back to the email address
    pub fn display_name(&self) -> &str {
        if self.nickname.trim().is_empty() {
            &self.email
        } else {
            &self.nickname
        }
    }
}

/// Success body of login, register and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Access token lifetime in seconds. Informational only.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub nickname: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LogoutRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{
            "user": {
                "id": 42,
                "email": "a@b.com",
                "nickname": "Ada",
                "created_at": "2024-03-01T12:30:45.123456",
                "last_login_at": null
            },
            "access_token": "A1",
            "refresh_token": "R1",
            "token_type": "bearer",
            "expires_in": 900
        }"#;

        let auth: AuthResponse = serde_json::from_str(json).expect("Failed to parse auth JSON");
        assert_eq!(auth.access_token, "A1");
        assert_eq!(auth.refresh_token, "R1");
        assert_eq!(auth.token_type.as_deref(), Some("bearer"));
        assert_eq!(auth.expires_in, Some(900));
        assert_eq!(auth.user.id, 42);
        assert_eq!(
            auth.user.created_at.map(|t| t.to_string()).as_deref(),
            Some("2024-03-01 12:30:45.123456")
        );
        assert!(auth.user.last_login_at.is_none());
    }

    #[test]
    fn test_parse_user_without_timestamps() {
        let json = r#"{"user": {"id": 1, "email": "a@b.com", "nickname": "a"}}"#;
        let me: MeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(me.user.email, "a@b.com");
        assert!(me.user.created_at.is_none());
    }

    #[test]
    fn test_display_name() {
        let mut user = User {
            id: 1,
            email: "a@b.com".to_string(),
            nickname: "Ada".to_string(),
            created_at: None,
            last_login_at: None,
        };
        assert_eq!(user.display_name(), "Ada");
        user.nickname = "  ".to_string();
        assert_eq!(user.display_name(), "a@b.com");
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(ChangePasswordRequest {
            current_password: "old",
            new_password: "new-password",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"current_password": "old", "new_password": "new-password"})
        );
    }
}
