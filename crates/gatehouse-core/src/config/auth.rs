//! Credential and session configuration.

use serde::{Deserialize, Serialize};

/// Authentication and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_minutes: u64,
    /// Refresh token TTL in hours.
    #[serde(default = "default_refresh_ttl")]
    pub jwt_refresh_ttl_hours: u64,
    /// Cookie carrying the access token.
    #[serde(default = "default_access_cookie")]
    pub access_token_cookie: String,
    /// Cookie carrying the refresh token.
    #[serde(default = "default_refresh_cookie")]
    pub refresh_token_cookie: String,
    /// Whether credential cookies are marked `Secure`.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Upper bound on a single call to the credential backend, in milliseconds.
    #[serde(default = "default_backend_timeout")]
    pub backend_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_access_ttl_minutes: default_access_ttl(),
            jwt_refresh_ttl_hours: default_refresh_ttl(),
            access_token_cookie: default_access_cookie(),
            refresh_token_cookie: default_refresh_cookie(),
            secure_cookies: false,
            backend_timeout_ms: default_backend_timeout(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    60
}

fn default_refresh_ttl() -> u64 {
    24 * 7
}

fn default_access_cookie() -> String {
    "gh-access-token".to_string()
}

fn default_refresh_cookie() -> String {
    "gh-refresh-token".to_string()
}

fn default_backend_timeout() -> u64 {
    3000
}
