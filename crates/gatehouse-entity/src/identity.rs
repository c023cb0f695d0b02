//! The identity an access decision is made for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::{Context, Profile};
use crate::role::UserRole;

/// Derived, never persisted: the durable profile with any active emulation
/// grant applied on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveIdentity {
    /// The authenticated subject.
    pub subject_id: Uuid,
    /// Role used for access decisions.
    pub role: UserRole,
    /// Organization in effect.
    pub tenant_id: Option<Uuid>,
    /// Whether `role` comes from an emulation grant.
    pub is_emulated: bool,
    /// Durable role while emulating.
    pub original_role: Option<UserRole>,
    /// Grant in force, if emulating.
    pub grant_id: Option<Uuid>,
    /// When the emulation ends, if emulating.
    pub emulation_expires_at: Option<DateTime<Utc>>,
    /// Context used to compute landing paths.
    pub context: Context,
}

impl EffectiveIdentity {
    /// An identity that mirrors the profile exactly.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            subject_id: profile.subject_id,
            role: profile.role,
            tenant_id: profile.tenant_id,
            is_emulated: false,
            original_role: None,
            grant_id: None,
            emulation_expires_at: None,
            context: profile.context.clone(),
        }
    }

    /// The durable role, whether or not emulation is in effect.
    pub fn durable_role(&self) -> UserRole {
        self.original_role.unwrap_or(self.role)
    }
}
