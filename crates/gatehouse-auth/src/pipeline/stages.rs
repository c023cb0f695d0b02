//! Built-in pipeline stages.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_database::store::{ActiveGrant, ProfileStore};

use super::{RequestState, Stage, StageOutcome};
use crate::emulation::EmulationService;
use crate::identity::compose;
use crate::policy::{AccessDecision, RoleRegistry, evaluate, normalize_path};
use crate::session::SessionResolver;

/// How a stage answers an anonymous or stale request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Page,
    Api,
}

/// Resolves the session, then lets any caller through to a public path.
///
/// Authenticated callers on the login path are the exception: they continue
/// so the access stage can send them to their landing path. Resolution still
/// runs first on public paths so a refreshed token pair is written back.
#[derive(Debug)]
pub struct SessionStage {
    resolver: Arc<SessionResolver>,
    registry: Arc<RoleRegistry>,
    surface: Surface,
}

impl SessionStage {
    /// Anonymous callers on private paths are redirected to login.
    pub fn page(resolver: Arc<SessionResolver>, registry: Arc<RoleRegistry>) -> Self {
        Self {
            resolver,
            registry,
            surface: Surface::Page,
        }
    }

    /// Anonymous callers on private paths get `Unauthenticated`.
    pub fn api(resolver: Arc<SessionResolver>, registry: Arc<RoleRegistry>) -> Self {
        Self {
            resolver,
            registry,
            surface: Surface::Api,
        }
    }
}

#[async_trait]
impl Stage for SessionStage {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn run(&self, state: &mut RequestState) -> AppResult<StageOutcome> {
        state.session = self.resolver.resolve(&state.credentials).await;
        let on_login = normalize_path(&state.path) == self.registry.login_path();

        if state.session.is_some() {
            if self.registry.is_public(&state.path) && !on_login {
                return Ok(StageOutcome::Halt(AccessDecision::Allow));
            }
            return Ok(StageOutcome::Continue);
        }
        if self.registry.is_public(&state.path) {
            return Ok(StageOutcome::Halt(AccessDecision::Allow));
        }
        Ok(StageOutcome::Halt(match self.surface {
            Surface::Page => AccessDecision::redirect(self.registry.login_path()),
            Surface::Api => {
                AccessDecision::error(ErrorKind::Unauthenticated, "Authentication required")
            }
        }))
    }
}

/// Looks up the caller's active grant, expiring a lapsed one.
///
/// On pages, a grant that lapsed during this lookup forces a redirect back to
/// the same location so the client discards state cached under the emulated
/// role; the next pass is evaluated under the durable role.
#[derive(Debug)]
pub struct EmulationSweepStage {
    emulation: Arc<EmulationService>,
    surface: Surface,
}

impl EmulationSweepStage {
    /// Sweep that forces a reload on lapse.
    pub fn page(emulation: Arc<EmulationService>) -> Self {
        Self {
            emulation,
            surface: Surface::Page,
        }
    }

    /// Sweep that continues under the durable role on lapse.
    pub fn api(emulation: Arc<EmulationService>) -> Self {
        Self {
            emulation,
            surface: Surface::Api,
        }
    }
}

#[async_trait]
impl Stage for EmulationSweepStage {
    fn name(&self) -> &'static str {
        "emulation_sweep"
    }

    async fn run(&self, state: &mut RequestState) -> AppResult<StageOutcome> {
        let Some(resolved) = &state.session else {
            return Err(AppError::unauthenticated("No active session"));
        };
        let subject_id = resolved.session.subject_id;

        match self.emulation.get_active_grant(subject_id).await? {
            ActiveGrant::Active(grant) => {
                state.grant = Some(grant);
                Ok(StageOutcome::Continue)
            }
            ActiveGrant::Absent => Ok(StageOutcome::Continue),
            ActiveGrant::Lapsed(grant) => {
                state.emulation_lapsed = true;
                info!(
                    subject_id = %subject_id,
                    grant_id = %grant.id,
                    path = %state.path,
                    "Role emulation lapsed, reverting to durable role"
                );
                match self.surface {
                    Surface::Page => Ok(StageOutcome::Halt(AccessDecision::redirect(
                        state.location(),
                    ))),
                    Surface::Api => Ok(StageOutcome::Continue),
                }
            }
        }
    }
}

/// Loads the profile and composes the effective identity.
#[derive(Debug)]
pub struct IdentityStage {
    profiles: Arc<dyn ProfileStore>,
}

impl IdentityStage {
    /// Creates the stage.
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl Stage for IdentityStage {
    fn name(&self) -> &'static str {
        "identity"
    }

    async fn run(&self, state: &mut RequestState) -> AppResult<StageOutcome> {
        let session = state.session.as_ref().map(|r| &r.session);
        let profile = match session {
            Some(session) => self.profiles.find_by_subject(session.subject_id).await?,
            None => None,
        };

        let identity = compose(session, profile.as_ref(), state.grant.as_ref())?;
        state.profile = profile;
        state.identity = Some(identity);
        Ok(StageOutcome::Continue)
    }
}

/// Applies the path policy to the composed identity.
///
/// Authenticated callers on the login path are sent forward to their landing
/// path. A policy redirect to the login path means no safe landing path
/// exists, which for an authenticated caller is a `PolicyViolation`.
#[derive(Debug)]
pub struct AccessStage {
    registry: Arc<RoleRegistry>,
}

impl AccessStage {
    /// Creates the stage.
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Stage for AccessStage {
    fn name(&self) -> &'static str {
        "access"
    }

    async fn run(&self, state: &mut RequestState) -> AppResult<StageOutcome> {
        let Some(identity) = &state.identity else {
            return Err(AppError::unauthenticated("No effective identity"));
        };
        let login_path = self.registry.login_path();

        if normalize_path(&state.path) == login_path {
            let landing = self
                .registry
                .policy(identity.role)
                .and_then(|policy| {
                    policy
                        .default_path(&identity.context)
                        .filter(|target| policy.allows(target))
                })
                .filter(|target| normalize_path(target) != login_path);
            if let Some(target) = landing {
                return Ok(StageOutcome::Halt(AccessDecision::redirect(target)));
            }
        }

        let decision = evaluate(
            &self.registry,
            Some(identity.role),
            &state.path,
            identity.original_role,
            &identity.context,
        );
        Ok(match decision {
            AccessDecision::Allow => StageOutcome::Continue,
            AccessDecision::Redirect { target } if normalize_path(&target) == login_path => {
                debug!(
                    subject_id = %identity.subject_id,
                    role = %identity.role,
                    path = %state.path,
                    "No safe landing path"
                );
                StageOutcome::Halt(AccessDecision::error(
                    ErrorKind::PolicyViolation,
                    format!("Role '{}' may not access '{}'", identity.role, state.path),
                ))
            }
            other => StageOutcome::Halt(other),
        })
    }
}
