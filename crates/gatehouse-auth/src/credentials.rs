//! Credential backend seam.
//!
//! The session resolver never looks inside tokens itself; it asks a
//! [`CredentialBackend`] to verify an access token or exchange a refresh
//! token for a new pair.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatehouse_core::config::AuthConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

use gatehouse_entity::Session;

use crate::jwt::{JwtDecoder, JwtEncoder, TokenType};

/// The opaque token pair a request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Access token, from the access cookie or a bearer header.
    pub access_token: Option<String>,
    /// Refresh token, from the refresh cookie.
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Whether the request carries no credential at all.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// What a verified access token says, regardless of expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectedToken {
    /// The subject the token was issued to.
    pub subject_id: Uuid,
    /// Token expiry, seconds since the Unix epoch.
    pub expires_at_epoch_seconds: i64,
}

/// Verifies and refreshes credentials.
#[async_trait]
pub trait CredentialBackend: Send + Sync + Debug + 'static {
    /// Verify an access token's authenticity without rejecting it for expiry.
    async fn inspect(&self, access_token: &str) -> AppResult<InspectedToken>;

    /// Exchange a refresh token for a new pair, returned as a fresh session.
    async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> AppResult<Session>;
}

/// HS256 JWT credential backend.
#[derive(Debug, Clone)]
pub struct JwtCredentialBackend {
    encoder: JwtEncoder,
    decoder: JwtDecoder,
}

impl JwtCredentialBackend {
    /// Creates a backend signing and verifying with the configured secret.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoder: JwtEncoder::new(config),
            decoder: JwtDecoder::new(config),
        }
    }
}

#[async_trait]
impl CredentialBackend for JwtCredentialBackend {
    async fn inspect(&self, access_token: &str) -> AppResult<InspectedToken> {
        let claims = self.decoder.decode(access_token, TokenType::Access)?;
        Ok(InspectedToken {
            subject_id: claims.sub,
            expires_at_epoch_seconds: claims.exp,
        })
    }

    async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> AppResult<Session> {
        let claims = self.decoder.decode(refresh_token, TokenType::Refresh)?;
        if claims.is_expired_at(now) {
            return Err(AppError::unauthenticated("Refresh token has expired"));
        }
        let pair = self.encoder.generate_token_pair(claims.sub, now)?;
        Ok(Session {
            subject_id: claims.sub,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_at_epoch_seconds: pair.access_expires_at.timestamp(),
        })
    }
}
