//! Extractor for the caller identified by the guard.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use gatehouse_core::error::AppError;
use gatehouse_entity::{EffectiveIdentity, Profile};

use crate::error::ApiError;

/// The authenticated caller of a request.
///
/// Inserted into request extensions by the guard middleware once the
/// pipeline allows the request. Handlers authorize against `identity` and use
/// `profile` where only the durable role may count.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Identity with any emulation applied.
    pub identity: EffectiveIdentity,
    /// Durable profile.
    pub profile: Profile,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| AppError::unauthenticated("Authentication required").into())
    }
}

impl<S> OptionalFromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned())
    }
}
