//! Role policy registry.
//!
//! Built once at startup from the built-in role table plus configured
//! overrides, then shared read-only for the life of the process.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use gatehouse_core::config::PolicyConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::{Context, UserRole};

use super::matcher::{PathPattern, normalize_path};

/// Allowed path patterns and landing path of one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    role: UserRole,
    patterns: Vec<PathPattern>,
    default_path: String,
}

impl RolePolicy {
    /// Compile a policy. `default_path` may contain `{key}` placeholders
    /// filled from the identity context.
    pub fn new<S: AsRef<str>>(
        role: UserRole,
        patterns: &[S],
        default_path: impl Into<String>,
    ) -> AppResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| PathPattern::parse(p.as_ref()))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self {
            role,
            patterns,
            default_path: default_path.into(),
        })
    }

    /// The role this policy belongs to.
    pub fn role(&self) -> UserRole {
        self.role
    }

    /// Allowed patterns, in declaration order.
    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// Whether any pattern is a whole-path wildcard.
    pub fn is_unconditional(&self) -> bool {
        self.patterns.iter().any(PathPattern::is_unconditional)
    }

    /// Whether the role may reach `path`.
    pub fn allows(&self, path: &str) -> bool {
        self.is_unconditional() || self.patterns.iter().any(|p| p.matches(path))
    }

    /// The unrendered landing template.
    pub fn default_template(&self) -> &str {
        &self.default_path
    }

    /// Render the landing path for `context`. `None` when a placeholder has
    /// no usable value.
    pub fn default_path(&self, context: &Context) -> Option<String> {
        render_template(&self.default_path, context)
    }
}

fn render_template(template: &str, context: &Context) -> Option<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        rendered.push_str(&rest[..open]);
        let value = match context.get(&rest[open + 1..close])? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        rendered.push_str(&value);
        rest = &rest[close + 1..];
    }
    rendered.push_str(rest);
    Some(rendered)
}

/// Built-in patterns and landing template of every role.
fn builtin(role: UserRole) -> (&'static [&'static str], &'static str) {
    match role {
        UserRole::SuperAdmin | UserRole::OrgAdmin => (&["/**"], "/"),
        UserRole::User => (&["/auth", "/profile"], "/profile"),
        UserRole::EventAdmin => (
            &[
                "/events/**",
                "/events/*/payments",
                "/events/*/qr-checker",
                "/events/*/name-tags",
                "/events/*/test",
                "/api/**",
            ],
            "/events/{event_url}",
        ),
        UserRole::EventQrChecker => (&["/events/*/qr-checker"], "/events/{event_url}/qr-checker"),
        UserRole::PropertyAdmin => (&["/dorm", "/dorm/**"], "/dorm"),
        UserRole::PropertyManager => (&["/property", "/property/*/manage"], "/property"),
        UserRole::PropertyAccountant => (&["/property", "/property/*/accounting"], "/property"),
        UserRole::PropertyMaintenance => (&["/property", "/property/*/maintenance"], "/property"),
        UserRole::PropertyUtility => (&["/property", "/property/*/utility"], "/property"),
        UserRole::PropertyFrontdesk => (&["/property", "/property/*/frontdesk"], "/property"),
        UserRole::PropertyTenant => (&["/property", "/property/*/tenant"], "/property"),
        UserRole::PropertyGuest => (&["/property", "/property/*/guest"], "/property"),
        UserRole::IdGenAdmin => (&["/id-gen", "/id-gen/**"], "/id-gen"),
        UserRole::IdGenUser => (
            &["/id-gen/use-template", "/id-gen/use-template/**"],
            "/id-gen/use-template",
        ),
    }
}

/// Process-wide role policy table plus the public path allowlist.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    policies: BTreeMap<UserRole, RolePolicy>,
    public_paths: BTreeSet<String>,
    public_patterns: Vec<PathPattern>,
    login_path: String,
    error_path: String,
    api_prefix: String,
}

impl RoleRegistry {
    /// Build the registry from the built-in table and configured overrides.
    ///
    /// Fails on an override keyed by an unknown role or a malformed pattern.
    /// The login and error paths are always public.
    pub fn from_config(config: &PolicyConfig) -> AppResult<Self> {
        let mut overrides = BTreeMap::new();
        for (key, role_override) in &config.roles {
            let role: UserRole = key.parse().map_err(|e: AppError| {
                AppError::configuration(format!("Unknown role in policy overrides: {}", e.message))
            })?;
            overrides.insert(role, role_override);
        }

        let mut policies = BTreeMap::new();
        for role in UserRole::ALL {
            let (patterns, default_path) = builtin(role);
            let role_override = overrides.get(&role);
            let policy = match role_override.and_then(|o| o.allowed_paths.as_ref()) {
                Some(custom) => RolePolicy::new(role, custom.as_slice(), default_path)?,
                None => RolePolicy::new(role, patterns, default_path)?,
            };
            let policy = match role_override.and_then(|o| o.default_path.clone()) {
                Some(template) => RolePolicy {
                    default_path: template,
                    ..policy
                },
                None => policy,
            };
            policies.insert(role, policy);
        }

        let login_path = normalize_path(&config.login_path).to_string();
        let error_path = normalize_path(&config.error_path).to_string();

        let mut public_paths: BTreeSet<String> = config
            .public_paths
            .iter()
            .map(|p| normalize_path(p).to_string())
            .collect();
        public_paths.insert(login_path.clone());
        public_paths.insert(error_path.clone());

        let public_patterns = config
            .public_patterns
            .iter()
            .map(|p| PathPattern::parse(p))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            policies,
            public_paths,
            public_patterns,
            login_path,
            error_path,
            api_prefix: normalize_path(&config.api_prefix).to_string(),
        })
    }

    /// Replace the policy of a role. Only meaningful before the registry is shared.
    pub fn insert(&mut self, policy: RolePolicy) -> Option<RolePolicy> {
        self.policies.insert(policy.role, policy)
    }

    /// Drop the policy of a role, leaving it with no registry entry.
    pub fn remove(&mut self, role: UserRole) -> Option<RolePolicy> {
        self.policies.remove(&role)
    }

    /// The policy of `role`, if registered.
    pub fn policy(&self, role: UserRole) -> Option<&RolePolicy> {
        self.policies.get(&role)
    }

    /// Every registered policy, ordered by role.
    pub fn policies(&self) -> impl Iterator<Item = &RolePolicy> {
        self.policies.values()
    }

    /// Whether `path` bypasses role checks for every caller.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(normalize_path(path))
            || self.public_patterns.iter().any(|p| p.matches(path))
    }

    /// The login surface.
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Generic error page.
    pub fn error_path(&self) -> &str {
        &self.error_path
    }

    /// Whether `path` belongs to the API surface.
    pub fn is_api_path(&self, path: &str) -> bool {
        let path = normalize_path(path);
        path == self.api_prefix
            || path
                .strip_prefix(self.api_prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}
