//! Role emulation handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde_json::Value;
use validator::Validate;

use gatehouse_core::error::AppError;
use gatehouse_entity::Context;

use crate::dto::{
    ActionResponse, CurrentEmulationResponse, EmulationStartedResponse, IssueEmulationRequest,
};
use crate::error::ApiError;
use crate::extractors::Caller;
use crate::state::AppState;

/// POST /api/role-emulation
///
/// Starts emulating a role, superseding any emulation already in force. Only
/// the caller's durable role is considered.
pub async fn start_emulation(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<IssueEmulationRequest>, JsonRejection>,
) -> Result<Json<EmulationStartedResponse>, ApiError> {
    let Json(req) =
        body.map_err(|e| AppError::validation(format!("Invalid request body: {}", e.body_text())))?;
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;

    let mut metadata = match req.context {
        Some(Value::Object(map)) => map,
        _ => Context::new(),
    };
    if let Some(org_id) = req.emulated_org_id {
        metadata.insert("org_id".to_string(), Value::String(org_id.to_string()));
    }
    metadata.insert(
        "source".to_string(),
        Value::String("role_emulation_api".to_string()),
    );
    metadata.insert(
        "created_at".to_string(),
        Value::String(state.clock.now().to_rfc3339()),
    );

    let grant = state
        .emulation
        .issue(&caller.profile, &req.emulated_role, metadata)
        .await?;

    Ok(Json(EmulationStartedResponse {
        status: "success".to_string(),
        message: "Role emulation started successfully".to_string(),
        grant,
    }))
}

/// DELETE /api/role-emulation
pub async fn stop_emulation(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ActionResponse>, ApiError> {
    state.emulation.stop(caller.identity.subject_id).await?;
    Ok(Json(ActionResponse::success("Role emulation stopped")))
}

/// GET /api/role-emulation
pub async fn current_emulation(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<CurrentEmulationResponse>, ApiError> {
    let grant = state
        .emulation
        .get_active_grant(caller.identity.subject_id)
        .await?
        .into_active();
    Ok(Json(CurrentEmulationResponse {
        status: "success".to_string(),
        grant,
    }))
}

/// Fallback for unknown API routes.
pub async fn api_not_found() -> ApiError {
    AppError::not_found("No such API route").into()
}
