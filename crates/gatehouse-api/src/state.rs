//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_auth::credentials::CredentialBackend;
use gatehouse_auth::emulation::EmulationService;
use gatehouse_auth::pipeline::{Pipeline, PipelineDeps};
use gatehouse_auth::policy::RoleRegistry;
use gatehouse_auth::session::SessionResolver;
use gatehouse_core::config::AppConfig;
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::Clock;
use gatehouse_database::store::{EmulationGrantStore, ProfileStore};

/// Application state passed to every handler via `State<AppState>`.
///
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Time source for every expiry comparison.
    pub clock: Arc<dyn Clock>,
    /// Role policy table, read-only after startup.
    pub registry: Arc<RoleRegistry>,
    /// Role emulation lifecycle.
    pub emulation: Arc<EmulationService>,
    /// Guard for page requests.
    pub page_guard: Arc<Pipeline>,
    /// Guard for API requests.
    pub api_guard: Arc<Pipeline>,
}

impl AppState {
    /// Wire the authorization engine from configuration and its stores.
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialBackend>,
        profiles: Arc<dyn ProfileStore>,
        grants: Arc<dyn EmulationGrantStore>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let registry = Arc::new(RoleRegistry::from_config(&config.policy)?);
        let resolver = Arc::new(SessionResolver::new(
            credentials,
            clock.clone(),
            Duration::from_millis(config.auth.backend_timeout_ms),
        ));
        let emulation = Arc::new(EmulationService::new(
            grants,
            clock.clone(),
            &config.emulation,
        )?);

        let deps = PipelineDeps {
            registry: registry.clone(),
            resolver,
            emulation: emulation.clone(),
            profiles,
        };

        Ok(Self {
            page_guard: Arc::new(Pipeline::page_guard(&deps)),
            api_guard: Arc::new(Pipeline::api_guard(&deps)),
            config: Arc::new(config),
            clock,
            registry,
            emulation,
        })
    }
}
