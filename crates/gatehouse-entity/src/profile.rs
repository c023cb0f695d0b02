//! Durable actor profile.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::UserRole;

/// Free-form key/value context attached to profiles and grants
/// (e.g. `event_url`, `org_id`).
pub type Context = serde_json::Map<String, serde_json::Value>;

/// One profile per actor, maintained by administrative tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// The subject this profile belongs to.
    pub subject_id: Uuid,
    /// Durable role.
    pub role: UserRole,
    /// Organization the actor belongs to, if any.
    pub tenant_id: Option<Uuid>,
    /// Role-specific context used to compute landing paths.
    #[serde(default)]
    pub context: Context,
}

impl Profile {
    /// Creates a profile with an empty context.
    pub fn new(subject_id: Uuid, role: UserRole, tenant_id: Option<Uuid>) -> Self {
        Self {
            subject_id,
            role,
            tenant_id,
            context: Context::new(),
        }
    }

    /// Adds a string context entry.
    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context
            .insert(key.to_string(), serde_json::Value::String(value.into()));
        self
    }
}
