//! Response DTOs.

use serde::{Deserialize, Serialize};

use gatehouse_entity::EmulationGrant;

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Always `"success"`.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
}

impl ActionResponse {
    /// A success acknowledgement.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// Response to a successful emulation issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulationStartedResponse {
    /// Always `"success"`.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
    /// The grant now in force.
    pub grant: EmulationGrant,
}

/// The caller's grant in force, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentEmulationResponse {
    /// Always `"success"`.
    pub status: String,
    /// `null` when the caller is not emulating.
    pub grant: Option<EmulationGrant>,
}
