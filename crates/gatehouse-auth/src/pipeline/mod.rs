//! The per-request decision pipeline.
//!
//! A request moves through an ordered list of [`Stage`]s. Each stage either
//! lets the request continue or halts it with a terminal [`AccessDecision`];
//! an error halts it as well. Stages always run in the order session,
//! emulation sweep, identity, access, so a decision is never made against a
//! grant that has already lapsed.

pub mod stages;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use gatehouse_core::result::AppResult;
use gatehouse_database::store::ProfileStore;
use gatehouse_entity::{EffectiveIdentity, EmulationGrant, Profile};

use crate::credentials::Credentials;
use crate::emulation::EmulationService;
use crate::policy::{AccessDecision, RoleRegistry};
use crate::session::{ResolvedSession, SessionResolver};

pub use stages::{AccessStage, EmulationSweepStage, IdentityStage, SessionStage};

/// What the pipeline knows about one request so far.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    /// Request path, without query.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Credentials carried by the request.
    pub credentials: Credentials,
    /// Set by the session stage.
    pub session: Option<ResolvedSession>,
    /// Set by the emulation sweep when a grant is in force.
    pub grant: Option<EmulationGrant>,
    /// Set by the emulation sweep when it expired a grant.
    pub emulation_lapsed: bool,
    /// Set by the identity stage.
    pub profile: Option<Profile>,
    /// Set by the identity stage.
    pub identity: Option<EffectiveIdentity>,
}

impl RequestState {
    /// State for a request to `path` carrying `credentials`.
    pub fn new(path: impl Into<String>, query: Option<String>, credentials: Credentials) -> Self {
        Self {
            path: path.into(),
            query,
            credentials,
            ..Self::default()
        }
    }

    /// The path and query the request was made to.
    pub fn location(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{query}", self.path),
            _ => self.path.clone(),
        }
    }
}

/// Result of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Hand the request to the next stage.
    Continue,
    /// Stop here with this decision.
    Halt(AccessDecision),
}

/// One step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync + Debug + 'static {
    /// Stage name for logs.
    fn name(&self) -> &'static str;

    /// Run the stage against the request state.
    async fn run(&self, state: &mut RequestState) -> AppResult<StageOutcome>;
}

/// Everything the built-in stages depend on.
#[derive(Debug, Clone)]
pub struct PipelineDeps {
    /// Role policy table.
    pub registry: Arc<RoleRegistry>,
    /// Session resolver.
    pub resolver: Arc<SessionResolver>,
    /// Emulation service.
    pub emulation: Arc<EmulationService>,
    /// Profile store.
    pub profiles: Arc<dyn ProfileStore>,
}

/// An ordered list of stages run by a small runner.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// A pipeline running `stages` in order.
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Guard for page requests: anonymous callers and lapsed emulation get
    /// redirects, and the path policy is enforced.
    pub fn page_guard(deps: &PipelineDeps) -> Self {
        Self::new(vec![
            Arc::new(SessionStage::page(deps.resolver.clone(), deps.registry.clone())),
            Arc::new(EmulationSweepStage::page(deps.emulation.clone())),
            Arc::new(IdentityStage::new(deps.profiles.clone())),
            Arc::new(AccessStage::new(deps.registry.clone())),
        ])
    }

    /// Guard for API requests: anonymous callers get `Unauthenticated`, a
    /// lapsed grant does not force a reload, and handlers authorize
    /// themselves from the resulting identity.
    pub fn api_guard(deps: &PipelineDeps) -> Self {
        Self::new(vec![
            Arc::new(SessionStage::api(deps.resolver.clone(), deps.registry.clone())),
            Arc::new(EmulationSweepStage::api(deps.emulation.clone())),
            Arc::new(IdentityStage::new(deps.profiles.clone())),
        ])
    }

    /// Run every stage until one halts. Reaching the end is an allow.
    pub async fn run(&self, state: &mut RequestState) -> AppResult<AccessDecision> {
        for stage in &self.stages {
            match stage.run(state).await {
                Ok(StageOutcome::Continue) => {}
                Ok(StageOutcome::Halt(decision)) => {
                    debug!(stage = stage.name(), path = %state.path, ?decision, "Pipeline halted");
                    return Ok(decision);
                }
                Err(e) => {
                    debug!(stage = stage.name(), path = %state.path, error = %e, "Pipeline failed");
                    return Err(e);
                }
            }
        }
        Ok(AccessDecision::Allow)
    }
}
