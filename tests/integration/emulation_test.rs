//! Integration tests for the role emulation endpoints.

mod helpers;

use chrono::Duration;
use http::StatusCode;
use serde_json::json;

use gatehouse_database::EmulationGrantStore;
use gatehouse_entity::{GrantEndReason, GrantStatus, UserRole};
use helpers::{Client, TestApp};

#[tokio::test]
async fn test_super_admin_starts_emulation() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));

    let response = app
        .request(
            "POST",
            "/api/role-emulation",
            Some(json!({ "emulatedRole": "org_admin" })),
            &client,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "success");
    assert_eq!(response.body["message"], "Role emulation started successfully");
    assert_eq!(response.body["grant"]["emulated_role"], "org_admin");
    assert_eq!(response.body["grant"]["original_role"], "super_admin");
    assert_eq!(response.body["grant"]["status"], "active");
    assert_eq!(
        response.body["grant"]["metadata"]["source"],
        "role_emulation_api"
    );

    let current = app
        .request("GET", "/api/role-emulation", None, &client)
        .await;
    assert_eq!(current.body["grant"]["id"], response.body["grant"]["id"]);
}

#[tokio::test]
async fn test_lesser_role_cannot_emulate() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::OrgAdmin);
    let client = Client::cookies(&app.login(subject));

    let response = app
        .request(
            "POST",
            "/api/role-emulation",
            Some(json!({ "emulatedRole": "user" })),
            &client,
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["status"], "error");
    assert_eq!(response.body["error"], "PERMISSION_DENIED");
    assert!(app.grants.history(subject).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_role_rejected_regardless_of_privilege() {
    let app = TestApp::new();

    for role in [UserRole::SuperAdmin, UserRole::User] {
        let subject = app.create_profile(role);
        let client = Client::cookies(&app.login(subject));

        let response = app
            .request(
                "POST",
                "/api/role-emulation",
                Some(json!({ "emulatedRole": "not_a_role" })),
                &client,
            )
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "caller {role}");
        assert_eq!(response.body["error"], "INVALID_ROLE");
    }
}

#[tokio::test]
async fn test_malformed_bodies_are_rejected() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));

    let truncated = app
        .request_raw("POST", "/api/role-emulation", "{".to_string(), &client)
        .await;
    assert_eq!(truncated.status, StatusCode::BAD_REQUEST);
    assert_eq!(truncated.body["status"], "error");

    let missing_role = app
        .request("POST", "/api/role-emulation", Some(json!({})), &client)
        .await;
    assert_eq!(missing_role.status, StatusCode::BAD_REQUEST);

    let bad_context = app
        .request(
            "POST",
            "/api/role-emulation",
            Some(json!({ "emulatedRole": "user", "context": { "event_url": null } })),
            &client,
        )
        .await;
    assert_eq!(bad_context.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_context.body["error"], "VALIDATION");
}

#[tokio::test]
async fn test_anonymous_cannot_emulate() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/role-emulation",
            Some(json!({ "emulatedRole": "user" })),
            &Client::anonymous(),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stop_without_emulation_succeeds() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::User);
    let client = Client::cookies(&app.login(subject));

    let response = app
        .request("DELETE", "/api/role-emulation", None, &client)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "success");
    assert_eq!(response.body["message"], "Role emulation stopped");
}

#[tokio::test]
async fn test_reissue_while_emulating_supersedes() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));

    for role in ["user", "event_admin"] {
        let response = app
            .request(
                "POST",
                "/api/role-emulation",
                Some(json!({ "emulatedRole": role })),
                &client,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "emulating {role}");
    }

    let history = app.grants.history(subject).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].emulated_role, UserRole::EventAdmin);
    assert_eq!(history[0].status, GrantStatus::Active);
    assert_eq!(history[1].end_reason, Some(GrantEndReason::Superseded));
}

#[tokio::test]
async fn test_concurrent_issuance_leaves_one_active_grant() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));

    let (first, second) = tokio::join!(
        app.request(
            "POST",
            "/api/role-emulation",
            Some(json!({ "emulatedRole": "org_admin" })),
            &client,
        ),
        app.request(
            "POST",
            "/api/role-emulation",
            Some(json!({ "emulatedRole": "event_admin" })),
            &client,
        ),
    );
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);

    let history = app.grants.history(subject).await.unwrap();
    let active = history
        .iter()
        .filter(|g| g.status == GrantStatus::Active)
        .count();
    assert_eq!(active, 1);

    let current = app
        .request("GET", "/api/role-emulation", None, &client)
        .await;
    assert!(current.body["grant"].is_object());
}

#[tokio::test]
async fn test_emulated_role_governs_pages() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));
    let org = uuid::Uuid::new_v4();

    let issued = app
        .request(
            "POST",
            "/api/role-emulation",
            Some(json!({
                "emulatedRole": "event_qr_checker",
                "emulatedOrgId": org,
                "context": { "event_url": "spring" },
            })),
            &client,
        )
        .await;
    assert_eq!(issued.status, StatusCode::OK);

    let allowed = app
        .request("GET", "/events/spring/qr-checker", None, &client)
        .await;
    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(allowed.identity_role(), Some("event_qr_checker"));
    assert_eq!(allowed.body["identity"]["is_emulated"], true);
    assert_eq!(allowed.body["identity"]["original_role"], "super_admin");
    assert_eq!(allowed.body["identity"]["tenant_id"], json!(org));

    let redirected = app
        .request("GET", "/events/spring/payments", None, &client)
        .await;
    assert_eq!(redirected.status, StatusCode::SEE_OTHER);
    assert_eq!(redirected.location(), Some("/events/spring/qr-checker"));
}

#[tokio::test]
async fn test_lapsed_emulation_forces_reload_then_reverts() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));

    app.request(
        "POST",
        "/api/role-emulation",
        Some(json!({ "emulatedRole": "org_admin" })),
        &client,
    )
    .await;

    let during = app.request("GET", "/orgs/5/settings", None, &client).await;
    assert_eq!(during.status, StatusCode::OK);
    assert_eq!(during.identity_role(), Some("org_admin"));

    app.advance(Duration::hours(4) + Duration::seconds(1));
    // Keep the session valid past the access token lifetime.
    let client = Client::cookies(&app.login(subject));

    let reload = app.request("GET", "/orgs/5/settings", None, &client).await;
    assert_eq!(reload.status, StatusCode::SEE_OTHER);
    assert_eq!(reload.location(), Some("/orgs/5/settings"));

    let after = app.request("GET", "/orgs/5/settings", None, &client).await;
    assert_eq!(after.status, StatusCode::OK);
    assert_eq!(after.identity_role(), Some("super_admin"));

    let history = app.grants.history(subject).await.unwrap();
    assert_eq!(history[0].end_reason, Some(GrantEndReason::TimedOut));
}

#[tokio::test]
async fn test_lapsed_emulation_does_not_redirect_api() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);

    let client = Client::cookies(&app.login(subject));
    app.request(
        "POST",
        "/api/role-emulation",
        Some(json!({ "emulatedRole": "user" })),
        &client,
    )
    .await;

    app.advance(Duration::hours(4) + Duration::seconds(1));
    let client = Client::cookies(&app.login(subject));

    let response = app
        .request("GET", "/api/role-emulation", None, &client)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["grant"], json!(null));
}

#[tokio::test]
async fn test_logout_ends_emulation_and_clears_cookies() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));

    app.request(
        "POST",
        "/api/role-emulation",
        Some(json!({ "emulatedRole": "user" })),
        &client,
    )
    .await;

    let response = app.request("POST", "/api/auth/logout", None, &client).await;

    assert_eq!(response.status, StatusCode::OK);
    let cookies = response.set_cookies();
    assert!(cookies.iter().any(|c| c.starts_with("gh-access-token=")));
    assert!(cookies.iter().any(|c| c.starts_with("gh-refresh-token=")));

    let history = app.grants.history(subject).await.unwrap();
    assert_eq!(history[0].end_reason, Some(GrantEndReason::Stopped));
}

#[tokio::test]
async fn test_logout_after_access_expiry_keeps_cookies_cleared() {
    let app = TestApp::new();
    let subject = app.create_profile(UserRole::SuperAdmin);
    let client = Client::cookies(&app.login(subject));

    // The access token lapses, so the guard refreshes the pair on the way in.
    app.advance(Duration::minutes(61));
    let response = app.request("POST", "/api/auth/logout", None, &client).await;

    assert_eq!(response.status, StatusCode::OK);
    let cookies = response.set_cookies();
    for name in ["gh-access-token", "gh-refresh-token"] {
        let prefix = format!("{name}=");
        let last = cookies
            .iter()
            .rfind(|c| c.starts_with(&prefix))
            .unwrap_or_else(|| panic!("no Set-Cookie for {name}"));
        let value = last[prefix.len()..].split(';').next().unwrap();
        assert!(value.is_empty(), "{name} was set again: {last}");
    }
}
