//! Merges a durable profile with an active emulation grant.

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::{EffectiveIdentity, EmulationGrant, Profile, Session};

/// Compose the identity an access decision is made for.
///
/// - no session: `Unauthenticated`
/// - no profile: `ProfileMissing`
/// - no grant: the profile, unchanged
/// - a grant: the emulated role, with grant metadata layered over the profile
///   context and the grant's `org_id` preferred as tenant
pub fn compose(
    session: Option<&Session>,
    profile: Option<&Profile>,
    grant: Option<&EmulationGrant>,
) -> AppResult<EffectiveIdentity> {
    let session = session.ok_or_else(|| AppError::unauthenticated("No active session"))?;
    let profile = profile.ok_or_else(|| {
        AppError::profile_missing(format!("No profile for subject {}", session.subject_id))
    })?;
    if profile.subject_id != session.subject_id {
        return Err(AppError::internal("Profile does not belong to the session subject"));
    }

    let Some(grant) = grant else {
        return Ok(EffectiveIdentity::from_profile(profile));
    };
    if grant.subject_id != session.subject_id {
        return Err(AppError::internal("Emulation grant does not belong to the session subject"));
    }

    let mut context = profile.context.clone();
    context.extend(grant.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));

    Ok(EffectiveIdentity {
        subject_id: session.subject_id,
        role: grant.emulated_role,
        tenant_id: grant.org_id().or(profile.tenant_id),
        is_emulated: true,
        original_role: Some(profile.role),
        grant_id: Some(grant.id),
        emulation_expires_at: Some(grant.expires_at),
        context,
    })
}
