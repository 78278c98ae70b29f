use tracing::debug;

use crate::api::error::truncate_body;
use crate::api::ApiClient;
use crate::error::{SessionError, SessionResult};
use crate::models::{MeResponse, User};

/// Ask the backend who owns `access_token`.
///
/// `Ok(None)` means "no valid session": no token was given, or the backend
/// refused it. Transport failures stay errors. The caller is responsible for
/// installing the returned user.
pub(crate) async fn fetch_identity(
    api: &ApiClient,
    access_token: Option<&str>,
) -> SessionResult<Option<User>> {
    let Some(access_token) = access_token else {
        debug!("No access token, skipping identity fetch");
        return Ok(None);
    };

    let response = api.me(access_token).await?;
    if !response.is_success() {
        debug!(
            status = %response.status(),
            body = %truncate_body(response.body()),
            "Access token rejected by identity endpoint"
        );
        return Ok(None);
    }

    let me: MeResponse = response
        .json()
        .map_err(|e| SessionError::InvalidResponse(format!("identity response: {}", e)))?;
    Ok(Some(me.user))
}
