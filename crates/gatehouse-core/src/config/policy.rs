//! Role policy configuration.
//!
//! The built-in role table lives in `gatehouse-auth`; this section only
//! carries the surrounding paths and optional per-role overrides. Role keys
//! are validated against the closed role enum when the registry is built, so
//! an unknown key fails startup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Path policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// The login surface.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Generic error page.
    #[serde(default = "default_error_path")]
    pub error_path: String,
    /// Requests under this prefix get status codes instead of redirects.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Paths reachable by anyone, matched literally.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
    /// Parametric public paths, using the role pattern grammar.
    #[serde(default = "default_public_patterns")]
    pub public_patterns: Vec<String>,
    /// Per-role overrides keyed by role name.
    #[serde(default)]
    pub roles: BTreeMap<String, RolePolicyOverride>,
}

/// Replaces parts of a built-in role policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolePolicyOverride {
    /// Replacement pattern list.
    #[serde(default)]
    pub allowed_paths: Option<Vec<String>>,
    /// Replacement landing template, e.g. `/events/{event_url}`.
    #[serde(default)]
    pub default_path: Option<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            error_path: default_error_path(),
            api_prefix: default_api_prefix(),
            public_paths: default_public_paths(),
            public_patterns: default_public_patterns(),
            roles: BTreeMap::new(),
        }
    }
}

fn default_login_path() -> String {
    "/auth".to_string()
}

fn default_error_path() -> String {
    "/error".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_public_paths() -> Vec<String> {
    ["/", "/auth", "/error", "/register", "/constrack", "/dokmutya"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_public_patterns() -> Vec<String> {
    vec!["/events/*/register".to_string()]
}
