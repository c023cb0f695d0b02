//! # gatehouse-entity
//!
//! Domain records shared by the authorization engine and its storage
//! backends. Nothing in here performs I/O.

pub mod emulation;
pub mod identity;
pub mod profile;
pub mod role;
pub mod session;

pub use emulation::{EmulationGrant, GrantEndReason, GrantStatus, NewEmulationGrant};
pub use identity::EffectiveIdentity;
pub use profile::{Context, Profile};
pub use role::UserRole;
pub use session::Session;
