//! Role emulation grants.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::profile::Context;
use crate::role::UserRole;

/// Lifecycle state of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "emulation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// In force until `expires_at`.
    Active,
    /// No longer in force.
    Expired,
}

/// Why a grant stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "emulation_end_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrantEndReason {
    /// A newer grant was issued for the same subject.
    Superseded,
    /// The subject ended the emulation explicitly.
    Stopped,
    /// A read observed the grant past its expiry.
    TimedOut,
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl fmt::Display for GrantEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Superseded => write!(f, "superseded"),
            Self::Stopped => write!(f, "stopped"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// A time-boxed grant letting a subject act under another role.
///
/// Grants are never deleted; expired ones remain as the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulationGrant {
    /// Grant ID.
    pub id: Uuid,
    /// Subject holding the grant.
    pub subject_id: Uuid,
    /// Durable role at issuance.
    pub original_role: UserRole,
    /// Role in force while the grant is active.
    pub emulated_role: UserRole,
    /// Current status.
    pub status: GrantStatus,
    /// Fixed expiry set at issuance.
    pub expires_at: DateTime<Utc>,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// When the grant left the active state.
    pub ended_at: Option<DateTime<Utc>>,
    /// Why the grant left the active state.
    pub end_reason: Option<GrantEndReason>,
    /// Context supplied at issuance.
    #[serde(default)]
    pub metadata: Context,
}

impl EmulationGrant {
    /// Builds an active grant from an issuance request.
    pub fn issue(new: NewEmulationGrant, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: new.subject_id,
            original_role: new.original_role,
            emulated_role: new.emulated_role,
            status: GrantStatus::Active,
            expires_at: now + new.lifetime,
            created_at: now,
            ended_at: None,
            end_reason: None,
            metadata: new.metadata,
        }
    }

    /// Marked active and not yet past its expiry.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active && self.expires_at > now
    }

    /// Still marked active in storage although its expiry has passed.
    pub fn has_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active && self.expires_at <= now
    }

    /// Moves an active grant to `expired`. No-op on an already expired grant.
    pub fn end(&mut self, reason: GrantEndReason, now: DateTime<Utc>) {
        if self.status == GrantStatus::Active {
            self.status = GrantStatus::Expired;
            self.ended_at = Some(now);
            self.end_reason = Some(reason);
        }
    }

    /// Organization carried in the grant metadata, if any.
    pub fn org_id(&self) -> Option<Uuid> {
        self.metadata
            .get("org_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

/// Input for issuing a grant.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmulationGrant {
    /// Subject receiving the grant.
    pub subject_id: Uuid,
    /// Durable role of the subject.
    pub original_role: UserRole,
    /// Role to emulate.
    pub emulated_role: UserRole,
    /// How long the grant stays active.
    pub lifetime: Duration,
    /// Context recorded with the grant.
    pub metadata: Context,
}
