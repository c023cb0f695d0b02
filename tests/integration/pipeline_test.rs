//! Integration tests for the page and API guards.

mod helpers;

use chrono::Duration;
use http::StatusCode;
use serde_json::json;

use gatehouse_entity::{Profile, UserRole};
use helpers::{Client, TestApp};

#[tokio::test]
async fn test_anonymous_private_page_redirects_to_login() {
    let app = TestApp::new();

    let response = app
        .request("GET", "/profile", None, &Client::anonymous())
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/auth"));
}

#[tokio::test]
async fn test_anonymous_public_pages_are_served() {
    let app = TestApp::new();

    for path in ["/", "/auth", "/register", "/events/spring/register"] {
        let response = app.request("GET", path, None, &Client::anonymous()).await;
        assert_eq!(response.status, StatusCode::OK, "path {path}");
        assert!(response.body["identity"].is_null());
    }
}

#[tokio::test]
async fn test_anonymous_api_is_unauthenticated() {
    let app = TestApp::new();

    let response = app
        .request("GET", "/api/role-emulation", None, &Client::anonymous())
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["status"], "error");
    assert_eq!(response.body["error"], "UNAUTHENTICATED");
    assert!(response.location().is_none());
}

#[tokio::test]
async fn test_health_needs_no_session() {
    let app = TestApp::new();

    let response = app
        .request("GET", "/api/health", None, &Client::anonymous())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_qr_checker_allowed_on_own_page() {
    let app = TestApp::new();
    let subject = app.create_profile_with(
        Profile::new(uuid::Uuid::new_v4(), UserRole::EventQrChecker, None)
            .with_context("event_url", "123"),
    );
    let client = Client::cookies(&app.login(subject));

    let response = app
        .request("GET", "/events/123/qr-checker", None, &client)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.identity_role(), Some("event_qr_checker"));
}

#[tokio::test]
async fn test_qr_checker_redirected_to_own_landing_page() {
    let app = TestApp::new();
    let subject = app.create_profile_with(
        Profile::new(uuid::Uuid::new_v4(), UserRole::EventQrChecker, None)
            .with_context("event_url", "123"),
    );
    let client = Client::cookies(&app.login(subject));

    let response = app
        .request("GET", "/events/123/payments", None, &client)
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/events/123/qr-checker"));
}

#[tokio::test]
async fn test_forbidden_without_safe_redirect_is_policy_violation() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::EventQrChecker);
    let client = Client::cookies(&app.login(subject));

    let response = app
        .request("GET", "/events/123/payments", None, &client)
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "POLICY_VIOLATION");
}

#[tokio::test]
async fn test_authenticated_user_forwarded_off_login_page() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::User);
    let client = Client::cookies(&app.login(subject));

    let response = app.request("GET", "/auth", None, &client).await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/profile"));
}

#[tokio::test]
async fn test_signed_in_caller_without_profile_reaches_registration() {
    let app = TestApp::new();
    let client = Client::cookies(&app.login(uuid::Uuid::new_v4()));

    let response = app.request("GET", "/register", None, &client).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.identity_role(), None);
}

#[tokio::test]
async fn test_unconditional_role_reaches_unlisted_paths() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));

    let response = app
        .request("GET", "/orgs/5/settings/billing", None, &client)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.identity_role(), Some("super_admin"));
}

#[tokio::test]
async fn test_missing_profile_is_server_error() {
    let app = TestApp::new();
    let client = Client::cookies(&app.login(uuid::Uuid::new_v4()));

    let response = app
        .request("GET", "/api/role-emulation", None, &client)
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "PROFILE_MISSING");
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_and_written_back() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::User);
    let pair = app.login(subject);

    app.advance(Duration::minutes(61));
    let response = app
        .request("GET", "/profile", None, &Client::cookies(&pair))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let cookies = response.set_cookies();
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("gh-access-token=") && !c.contains(&pair.access_token))
    );
    assert!(cookies.iter().any(|c| c.starts_with("gh-refresh-token=")));
}

#[tokio::test]
async fn test_refreshed_cookies_written_on_redirect() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::User);
    let pair = app.login(subject);

    app.advance(Duration::minutes(61));
    let response = app
        .request("GET", "/auth", None, &Client::cookies(&pair))
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.set_cookies().len(), 2);
}

#[tokio::test]
async fn test_failed_refresh_fails_closed() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::User);
    let pair = app.login(subject);

    app.advance(Duration::minutes(61));
    let client = Client {
        cookie: Some(format!(
            "gh-access-token={}; gh-refresh-token=not-a-token",
            pair.access_token
        )),
        bearer: None,
    };

    let page = app.request("GET", "/profile", None, &client).await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/auth"));
    assert!(page.set_cookies().is_empty());

    let api = app
        .request("GET", "/api/role-emulation", None, &client)
        .await;
    assert_eq!(api.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_bearer_token_is_not_refreshed() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::User);
    let pair = app.login(subject);

    let fresh = app
        .request("GET", "/api/role-emulation", None, &Client::bearer(&pair))
        .await;
    assert_eq!(fresh.status, StatusCode::OK);
    assert_eq!(fresh.body["grant"], json!(null));

    app.advance(Duration::minutes(61));
    let stale = app
        .request("GET", "/api/role-emulation", None, &Client::bearer(&pair))
        .await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
}
