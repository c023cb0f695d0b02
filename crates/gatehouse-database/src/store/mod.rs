//! Store traits the authorization engine is written against.
//!
//! Implemented for PostgreSQL in [`crate::repositories`] and in memory in
//! [`memory`] for single-node development and tests.

pub mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::{EmulationGrant, NewEmulationGrant, Profile};

pub use memory::{MemoryEmulationGrantStore, MemoryProfileStore};

/// Read access to durable profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync + Debug + 'static {
    /// Load the profile of `subject_id`, if one exists.
    ///
    /// A stored role outside the closed role set is an `InvalidRole` error.
    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Option<Profile>>;
}

/// Result of looking up the active grant of a subject.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveGrant {
    /// A grant is in force.
    Active(EmulationGrant),
    /// A grant was still marked active but past its expiry, and this lookup
    /// just moved it to `expired`.
    Lapsed(EmulationGrant),
    /// No grant is in force.
    Absent,
}

impl ActiveGrant {
    /// The grant in force, if any.
    pub fn into_active(self) -> Option<EmulationGrant> {
        match self {
            Self::Active(grant) => Some(grant),
            Self::Lapsed(_) | Self::Absent => None,
        }
    }

    /// Whether this lookup expired a grant.
    pub fn is_lapsed(&self) -> bool {
        matches!(self, Self::Lapsed(_))
    }
}

/// Durable emulation grants.
///
/// Implementations serialize every mutation per subject so that at most one
/// grant per subject is ever `active`.
#[async_trait]
pub trait EmulationGrantStore: Send + Sync + Debug + 'static {
    /// Return the grant in force at `now`, lazily expiring any grant that is
    /// still marked active past its expiry.
    async fn find_active(&self, subject_id: Uuid, now: DateTime<Utc>) -> AppResult<ActiveGrant>;

    /// Expire every active grant of the subject, then insert a new active
    /// grant expiring at `now + lifetime`, as one operation.
    async fn issue(&self, new: NewEmulationGrant, now: DateTime<Utc>) -> AppResult<EmulationGrant>;

    /// Expire the active grant of the subject, if any. Idempotent.
    async fn stop(&self, subject_id: Uuid, now: DateTime<Utc>)
    -> AppResult<Option<EmulationGrant>>;

    /// Every grant ever issued to the subject, newest first.
    async fn history(&self, subject_id: Uuid) -> AppResult<Vec<EmulationGrant>>;
}
