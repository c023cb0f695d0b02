//! Access evaluator.

use tracing::debug;

use gatehouse_core::error::ErrorKind;
use gatehouse_entity::{Context, UserRole};

use super::matcher::normalize_path;
use super::registry::RoleRegistry;

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Continue to the handler.
    Allow,
    /// Send the caller to `target`.
    Redirect {
        /// Where to go.
        target: String,
    },
    /// Refuse with an error.
    Error {
        /// Error category.
        kind: ErrorKind,
        /// Human-readable reason.
        message: String,
    },
}

impl AccessDecision {
    /// A redirect to `target`.
    pub fn redirect(target: impl Into<String>) -> Self {
        Self::Redirect {
            target: target.into(),
        }
    }

    /// An error decision.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Whether the request may proceed.
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether `role` may reach `path`.
///
/// Pure: no I/O and no clock. `role` is `None` for anonymous callers. The
/// outcome never redirects to `path` itself.
pub fn evaluate(
    registry: &RoleRegistry,
    role: Option<UserRole>,
    path: &str,
    original_role: Option<UserRole>,
    context: &Context,
) -> AccessDecision {
    if registry.is_public(path) {
        return AccessDecision::Allow;
    }

    let Some(policy) = role.and_then(|r| registry.policy(r)) else {
        debug!(path = %path, role = ?role, "No policy for role");
        return AccessDecision::redirect(registry.login_path());
    };

    if policy.allows(path) {
        return AccessDecision::Allow;
    }

    let Some(target) = policy.default_path(context) else {
        debug!(path = %path, role = %policy.role(), "Landing path could not be rendered");
        return AccessDecision::redirect(registry.login_path());
    };

    if !policy.allows(&target) {
        debug!(
            path = %path,
            role = %policy.role(),
            target = %target,
            "Landing path is not allowed for its own role"
        );
        return AccessDecision::redirect(registry.login_path());
    }

    if normalize_path(&target) == normalize_path(path) {
        return AccessDecision::redirect(registry.login_path());
    }

    debug!(
        path = %path,
        role = %policy.role(),
        original_role = ?original_role,
        target = %target,
        "Redirecting to landing path"
    );
    AccessDecision::redirect(target)
}
