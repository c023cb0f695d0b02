//! Emulation service: issuance, stop, and lookup of role emulation grants.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use uuid::Uuid;

use gatehouse_core::config::EmulationConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::Clock;
use gatehouse_database::store::{ActiveGrant, EmulationGrantStore};
use gatehouse_entity::{Context, EmulationGrant, NewEmulationGrant, Profile, UserRole};

/// Wraps the grant store with the clock, the fixed grant lifetime and a
/// bounded store timeout.
#[derive(Debug, Clone)]
pub struct EmulationService {
    store: Arc<dyn EmulationGrantStore>,
    clock: Arc<dyn Clock>,
    lifetime: chrono::Duration,
    timeout: Duration,
}

impl EmulationService {
    /// Creates the service. Fails on a grant lifetime out of range.
    pub fn new(
        store: Arc<dyn EmulationGrantStore>,
        clock: Arc<dyn Clock>,
        config: &EmulationConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            store,
            clock,
            lifetime: config.lifetime()?,
            timeout: Duration::from_millis(config.store_timeout_ms),
        })
    }

    /// Lifetime given to every new grant.
    pub fn lifetime(&self) -> chrono::Duration {
        self.lifetime
    }

    /// The grant in force for `subject_id`, lazily expiring a lapsed one.
    pub async fn get_active_grant(&self, subject_id: Uuid) -> AppResult<ActiveGrant> {
        let now = self.clock.now();
        self.bounded(self.store.find_active(subject_id, now)).await
    }

    /// Issue a grant letting `caller` act as `requested_role`, superseding any
    /// grant the caller already holds.
    ///
    /// The requested role is validated before the caller's privilege, so an
    /// unknown role is always `InvalidRole`. Only the caller's durable role
    /// counts; it must be the most privileged role.
    pub async fn issue(
        &self,
        caller: &Profile,
        requested_role: &str,
        metadata: Context,
    ) -> AppResult<EmulationGrant> {
        let emulated_role: UserRole = requested_role.parse()?;

        if !caller.role.is_most_privileged() {
            return Err(AppError::permission_denied(format!(
                "Role '{}' may not emulate other roles",
                caller.role
            )));
        }

        let request = NewEmulationGrant {
            subject_id: caller.subject_id,
            original_role: caller.role,
            emulated_role,
            lifetime: self.lifetime,
            metadata,
        };
        let now = self.clock.now();
        let grant = self.bounded(self.store.issue(request, now)).await?;

        info!(
            subject_id = %grant.subject_id,
            grant_id = %grant.id,
            original_role = %grant.original_role,
            emulated_role = %grant.emulated_role,
            expires_at = %grant.expires_at,
            "Role emulation started"
        );
        Ok(grant)
    }

    /// End the caller's emulation, if any. Succeeds when nothing was active.
    pub async fn stop(&self, subject_id: Uuid) -> AppResult<Option<EmulationGrant>> {
        let now = self.clock.now();
        let stopped = self.bounded(self.store.stop(subject_id, now)).await?;
        match &stopped {
            Some(grant) => info!(
                subject_id = %subject_id,
                grant_id = %grant.id,
                "Role emulation stopped"
            ),
            None => info!(subject_id = %subject_id, "No active role emulation to stop"),
        }
        Ok(stopped)
    }

    /// Every grant the subject ever held, newest first.
    pub async fn history(&self, subject_id: Uuid) -> AppResult<Vec<EmulationGrant>> {
        self.bounded(self.store.history(subject_id)).await
    }

    async fn bounded<T>(&self, call: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        let result = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AppError::store_failure("Emulation grant store timed out"))
            .and_then(|inner| inner);
        if let Err(e) = &result {
            if e.kind == gatehouse_core::ErrorKind::StoreFailure {
                error!(error = %e, "Emulation grant store failure");
            }
        }
        result
    }
}
