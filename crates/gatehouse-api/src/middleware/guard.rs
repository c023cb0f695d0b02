//! Authorization guards.
//!
//! Both guards read the caller's credentials, run a decision pipeline, and
//! either hand the request on with a [`Caller`] attached or answer it
//! themselves. A token pair replaced during the run is written back as
//! cookies on whatever response goes out, unless the handler already set
//! that cookie itself.

use axum::extract::{OriginalUri, Request, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};

use gatehouse_auth::credentials::Credentials;
use gatehouse_auth::pipeline::{Pipeline, RequestState};
use gatehouse_auth::policy::AccessDecision;
use gatehouse_core::config::AuthConfig;
use gatehouse_core::error::AppError;

use crate::error::ApiError;
use crate::extractors::Caller;
use crate::state::AppState;

/// Guard for every non-API path.
pub async fn page_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.registry.is_api_path(request.uri().path()) {
        return next.run(request).await;
    }
    let pipeline = state.page_guard.clone();
    guard(&state, &pipeline, request, next).await
}

/// Guard for API routes.
pub async fn api_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let pipeline = state.api_guard.clone();
    guard(&state, &pipeline, request, next).await
}

async fn guard(state: &AppState, pipeline: &Pipeline, mut request: Request, next: Next) -> Response {
    // Nested routers see a stripped URI.
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());

    let auth = &state.config.auth;
    let credentials = credentials_from_headers(request.headers(), auth);
    let mut pipeline_state = RequestState::new(
        uri.path(),
        uri.query().map(str::to_string),
        credentials,
    );

    let response = match pipeline.run(&mut pipeline_state).await {
        Ok(AccessDecision::Allow) => {
            if let (Some(identity), Some(profile)) =
                (pipeline_state.identity.clone(), pipeline_state.profile.clone())
            {
                request.extensions_mut().insert(Caller { identity, profile });
            }
            next.run(request).await
        }
        Ok(AccessDecision::Redirect { target }) => Redirect::to(&target).into_response(),
        Ok(AccessDecision::Error { kind, message }) => {
            ApiError(AppError::new(kind, message)).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    };

    match &pipeline_state.session {
        Some(resolved) if resolved.refreshed => {
            let mut jar = CookieJar::new();
            for (name, value) in [
                (&auth.access_token_cookie, &resolved.session.access_token),
                (&auth.refresh_token_cookie, &resolved.session.refresh_token),
            ] {
                if !sets_cookie(response.headers(), name) {
                    jar = jar.add(credential_cookie(name, value, auth));
                }
            }
            (jar, response).into_response()
        }
        _ => response,
    }
}

/// Read the token pair from cookies, falling back to a bearer header for the
/// access token.
pub fn credentials_from_headers(headers: &HeaderMap, auth: &AuthConfig) -> Credentials {
    let jar = CookieJar::from_headers(headers);
    let cookie_value = |name: &str| {
        jar.get(name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    };

    let access_token = cookie_value(&auth.access_token_cookie).or_else(|| {
        headers
            .typed_get::<Authorization<Bearer>>()
            .map(|header| header.token().to_string())
    });

    Credentials {
        access_token,
        refresh_token: cookie_value(&auth.refresh_token_cookie),
    }
}

/// Whether a response already carries a `Set-Cookie` for `name`.
fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse(value).ok())
        .any(|cookie| cookie.name() == name)
}

/// Cookie carrying one credential.
pub fn credential_cookie(name: &str, value: &str, auth: &AuthConfig) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(true)
        .secure(auth.secure_cookies)
        .same_site(SameSite::Lax)
        .build()
}

/// Removal cookie for one credential.
pub fn expired_credential_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), String::new()))
        .path("/")
        .build()
}
