use serde::Deserialize;
use thiserror::Error;

use super::ApiResponse;

/// A request that could not be completed: connection, DNS, TLS or timeout
/// failures, or a response body that could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Self::new(format!("Could not connect: {}", err))
        } else {
            Self::new(err.to_string())
        }
    }
}

/// Maximum length for response bodies quoted in log messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Extract a human-readable message from a failed response.
///
/// Returns the payload's `error` field verbatim when it is a non-empty
/// string, otherwise `Request failed (<status>)`. Never fails.
pub fn normalize_error(response: &ApiResponse) -> String {
    match serde_json::from_slice::<ErrorBody>(response.body()) {
        Ok(ErrorBody {
            error: Some(message),
        }) if !message.is_empty() => message,
        _ => format!("Request failed ({})", response.status().as_u16()),
    }
}

/// Truncate a response body to avoid logging excessive data
pub(crate) fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_ERROR_BODY_LENGTH {
        text.into_owned()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &text[..end], body.len())
    }
}
