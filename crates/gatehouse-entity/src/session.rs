//! Authenticated session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A verified caller session for the duration of one request.
///
/// Built from the request credentials and mutated in place when the
/// resolver refreshes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The authenticated subject.
    pub subject_id: Uuid,
    /// Current access token.
    pub access_token: String,
    /// Current refresh token.
    pub refresh_token: String,
    /// Access token expiry, seconds since the Unix epoch.
    pub expires_at_epoch_seconds: i64,
}

impl Session {
    /// A session is expired only once `now` is strictly past its expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expires_at_epoch_seconds
    }

    /// Replaces the token fields after a successful refresh.
    pub fn replace_tokens(
        &mut self,
        access_token: String,
        refresh_token: String,
        expires_at_epoch_seconds: i64,
    ) {
        self.access_token = access_token;
        self.refresh_token = refresh_token;
        self.expires_at_epoch_seconds = expires_at_epoch_seconds;
    }
}
