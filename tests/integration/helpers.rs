//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use chrono::{DateTime, Duration};
use http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use gatehouse_api::{AppState, build_router};
use gatehouse_auth::credentials::JwtCredentialBackend;
use gatehouse_auth::jwt::{JwtEncoder, TokenPair};
use gatehouse_core::config::AppConfig;
use gatehouse_core::traits::{Clock, ManualClock};
use gatehouse_database::{MemoryEmulationGrantStore, MemoryProfileStore};
use gatehouse_entity::{Profile, UserRole};

/// Test application backed by in-memory stores and a manual clock.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application config
    pub config: AppConfig,
    /// Clock shared with the engine
    pub clock: ManualClock,
    /// Profile store shared with the engine
    pub profiles: MemoryProfileStore,
    /// Grant store shared with the engine
    pub grants: MemoryEmulationGrantStore,
    encoder: JwtEncoder,
}

/// Credentials a test client presents.
#[derive(Debug, Clone, Default)]
pub struct Client {
    /// Cookie header value, if any
    pub cookie: Option<String>,
    /// Bearer token, if any
    pub bearer: Option<String>,
}

impl Client {
    /// Anonymous client.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Client sending both tokens as cookies.
    pub fn cookies(pair: &TokenPair) -> Self {
        Self {
            cookie: Some(format!(
                "gh-access-token={}; gh-refresh-token={}",
                pair.access_token, pair.refresh_token
            )),
            bearer: None,
        }
    }

    /// Client sending an access token as a bearer header.
    pub fn bearer(pair: &TokenPair) -> Self {
        Self {
            cookie: None,
            bearer: Some(pair.access_token.clone()),
        }
    }
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "integration-test-secret".to_string();

        let start = DateTime::from_timestamp(1_750_000_000, 0).expect("valid timestamp");
        let clock = ManualClock::new(start);
        let profiles = MemoryProfileStore::new();
        let grants = MemoryEmulationGrantStore::new();

        let state = AppState::new(
            config.clone(),
            Arc::new(JwtCredentialBackend::new(&config.auth)),
            Arc::new(profiles.clone()),
            Arc::new(grants.clone()),
            Arc::new(clock.clone()),
        )
        .expect("Failed to build app state");

        Self {
            router: build_router(state),
            encoder: JwtEncoder::new(&config.auth),
            config,
            clock,
            profiles,
            grants,
        }
    }

    /// Create a profile and return its subject ID
    pub fn create_profile(&self, role: UserRole) -> Uuid {
        self.create_profile_with(Profile::new(Uuid::new_v4(), role, None))
    }

    /// Store `profile` and return its subject ID
    pub fn create_profile_with(&self, profile: Profile) -> Uuid {
        let subject_id = profile.subject_id;
        self.profiles.upsert(profile);
        subject_id
    }

    /// Issue a token pair for `subject_id` at the current test time
    pub fn login(&self, subject_id: Uuid) -> TokenPair {
        self.encoder
            .generate_token_pair(subject_id, self.clock.now())
            .expect("Failed to sign tokens")
    }

    /// Move the test clock forward
    pub fn advance(&self, delta: Duration) {
        self.clock.advance(delta);
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        client: &Client,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();
        self.request_raw(method, path, body_str, client).await
    }

    /// Make an HTTP request with a raw body
    pub async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: String,
        client: &Client,
    ) -> TestResponse {
        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(cookie) = &client.cookie {
            req = req.header("Cookie", cookie);
        }
        if let Some(token) = &client.bearer {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req.body(Body::from(body)).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `Location` header, if any
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Every `Set-Cookie` header value
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    /// The role the page guard allowed the request for
    pub fn identity_role(&self) -> Option<&str> {
        self.body
            .get("identity")
            .and_then(|identity| identity.get("role"))
            .and_then(Value::as_str)
    }
}
