//! Role emulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Role emulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulationConfig {
    /// Fixed lifetime of a new grant, set at issuance. There is no renewal.
    #[serde(default = "default_lifetime_hours")]
    pub default_lifetime_hours: u64,
    /// Upper bound on a single grant-store call, in milliseconds.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            default_lifetime_hours: default_lifetime_hours(),
            store_timeout_ms: default_store_timeout(),
        }
    }
}

impl EmulationConfig {
    /// Grant lifetime as a duration. Rejects values chrono cannot represent.
    pub fn lifetime(&self) -> Result<chrono::Duration, AppError> {
        i64::try_from(self.default_lifetime_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .ok_or_else(|| {
                AppError::configuration(format!(
                    "emulation.default_lifetime_hours out of range: {}",
                    self.default_lifetime_hours
                ))
            })
    }
}

fn default_lifetime_hours() -> u64 {
    4
}

fn default_store_timeout() -> u64 {
    3000
}
