//! Route definitions.

use axum::Router;
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{guard, logging};
use crate::state::AppState;

/// Build the complete application router.
///
/// API routes sit under the configured prefix behind the API guard; every
/// other path is a page behind the page guard.
pub fn build_router(state: AppState) -> Router {
    let guarded_api = Router::new()
        .route(
            "/role-emulation",
            post(handlers::emulation::start_emulation)
                .delete(handlers::emulation::stop_emulation)
                .get(handlers::emulation::current_emulation),
        )
        .route("/auth/logout", post(handlers::auth::logout))
        .route_layer(axum_mw::from_fn_with_state(state.clone(), guard::api_guard));

    let api = Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(guarded_api)
        .fallback(handlers::emulation::api_not_found);

    let api_prefix = state.config.policy.api_prefix.clone();

    Router::new()
        .nest(&api_prefix, api)
        .fallback(handlers::page::render)
        .layer(axum_mw::from_fn_with_state(state.clone(), guard::page_guard))
        .layer(axum_mw::from_fn(logging::request_logging))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
