//! Authentication handlers.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;

use crate::dto::ActionResponse;
use crate::error::ApiError;
use crate::extractors::Caller;
use crate::middleware::guard::expired_credential_cookie;
use crate::state::AppState;

/// POST /api/auth/logout
///
/// Ends any emulation the caller holds and clears the credential cookies.
pub async fn logout(
    State(state): State<AppState>,
    caller: Caller,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ActionResponse>), ApiError> {
    state.emulation.stop(caller.identity.subject_id).await?;

    let auth = &state.config.auth;
    let jar = jar
        .remove(expired_credential_cookie(&auth.access_token_cookie))
        .remove(expired_credential_cookie(&auth.refresh_token_cookie));

    tracing::info!(subject_id = %caller.identity.subject_id, "User logged out");
    Ok((jar, Json(ActionResponse::success("Logged out successfully"))))
}
