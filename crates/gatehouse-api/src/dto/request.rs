//! Request DTOs with validation.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Body of the emulation issuance request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueEmulationRequest {
    /// Role to emulate, by wire name. Checked against the role set by the
    /// emulation service, not here.
    #[validate(length(min = 1, max = 64, message = "emulatedRole is required"))]
    pub emulated_role: String,
    /// Organization to act within while emulating.
    #[serde(default)]
    pub emulated_org_id: Option<Uuid>,
    /// Extra context for landing paths, e.g. `event_url`.
    #[serde(default)]
    #[validate(custom(function = "validate_context"))]
    pub context: Option<Value>,
}

fn validate_context(value: &Value) -> Result<(), ValidationError> {
    let Some(map) = value.as_object() else {
        return Err(ValidationError::new("context_not_object"));
    };
    if map.values().any(Value::is_null) {
        return Err(ValidationError::new("context_null_value"));
    }
    Ok(())
}
