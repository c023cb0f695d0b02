//! In-memory stores for single-node deployments and tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_entity::{EmulationGrant, GrantEndReason, NewEmulationGrant, Profile};

use super::{ActiveGrant, EmulationGrantStore, ProfileStore};

/// Profiles kept in a concurrent map.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<DashMap<Uuid, Profile>>,
}

impl MemoryProfileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a profile.
    pub fn upsert(&self, profile: Profile) {
        self.profiles.insert(profile.subject_id, profile);
    }

    /// Removes a profile.
    pub fn remove(&self, subject_id: Uuid) -> Option<Profile> {
        self.profiles.remove(&subject_id).map(|(_, profile)| profile)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_by_subject(&self, subject_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.profiles.get(&subject_id).map(|p| p.value().clone()))
    }
}

/// Grant history of one subject, in issuance order.
type GrantLedger = Arc<Mutex<Vec<EmulationGrant>>>;

/// Emulation grants kept in memory.
///
/// Each subject has its own ledger behind a Tokio mutex; every read-modify-write
/// for a subject happens while holding that lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryEmulationGrantStore {
    ledgers: Arc<DashMap<Uuid, GrantLedger>>,
}

impl MemoryEmulationGrantStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self, subject_id: Uuid) -> GrantLedger {
        self.ledgers.entry(subject_id).or_default().value().clone()
    }
}

/// Expire every grant still marked active. Grants past their deadline are
/// recorded as timed out; the one in force is ended with `reason` and returned.
fn end_active(
    grants: &mut [EmulationGrant],
    reason: GrantEndReason,
    now: DateTime<Utc>,
) -> Option<EmulationGrant> {
    let mut ended = None;
    for grant in grants.iter_mut() {
        if grant.has_lapsed_at(now) {
            grant.end(GrantEndReason::TimedOut, now);
        } else if grant.is_active_at(now) {
            grant.end(reason, now);
            ended = Some(grant.clone());
        }
    }
    ended
}

#[async_trait]
impl EmulationGrantStore for MemoryEmulationGrantStore {
    async fn find_active(&self, subject_id: Uuid, now: DateTime<Utc>) -> AppResult<ActiveGrant> {
        // Read-only lookups never create a ledger.
        let Some(ledger) = self.ledgers.get(&subject_id).map(|l| l.value().clone()) else {
            return Ok(ActiveGrant::Absent);
        };
        let mut grants = ledger.lock().await;

        let mut lapsed = None;
        for grant in grants.iter_mut().filter(|g| g.has_lapsed_at(now)) {
            grant.end(GrantEndReason::TimedOut, now);
            info!(
                subject_id = %subject_id,
                grant_id = %grant.id,
                "Emulation grant expired"
            );
            lapsed = Some(grant.clone());
        }

        if let Some(active) = grants.iter().find(|g| g.is_active_at(now)) {
            return Ok(ActiveGrant::Active(active.clone()));
        }
        Ok(lapsed.map_or(ActiveGrant::Absent, ActiveGrant::Lapsed))
    }

    async fn issue(&self, new: NewEmulationGrant, now: DateTime<Utc>) -> AppResult<EmulationGrant> {
        let ledger = self.ledger(new.subject_id);
        let mut grants = ledger.lock().await;

        let superseded = end_active(&mut grants, GrantEndReason::Superseded, now);
        if let Some(previous) = superseded {
            info!(
                subject_id = %previous.subject_id,
                grant_id = %previous.id,
                "Emulation grant superseded"
            );
        }

        let grant = EmulationGrant::issue(new, now);
        grants.push(grant.clone());
        Ok(grant)
    }

    async fn stop(
        &self,
        subject_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<EmulationGrant>> {
        let Some(ledger) = self.ledgers.get(&subject_id).map(|l| l.value().clone()) else {
            return Ok(None);
        };
        let mut grants = ledger.lock().await;
        let stopped = end_active(&mut grants, GrantEndReason::Stopped, now);
        Ok(stopped)
    }

    async fn history(&self, subject_id: Uuid) -> AppResult<Vec<EmulationGrant>> {
        let Some(ledger) = self.ledgers.get(&subject_id).map(|l| l.value().clone()) else {
            return Ok(Vec::new());
        };
        let grants = ledger.lock().await;
        Ok(grants.iter().rev().cloned().collect())
    }
}
