//! # gatehouse-auth
//!
//! The authorization engine: every inbound request is resolved to an
//! authenticated actor, assigned an effective role, and checked against a
//! per-role path policy before any business logic runs.
//!
//! ## Modules
//!
//! - `jwt`: token pair creation and validation
//! - `credentials`: the credential backend seam and its JWT implementation
//! - `session`: session resolution with lazy refresh
//! - `policy`: path patterns, the role policy registry, and the access evaluator
//! - `emulation`: the role emulation lifecycle
//! - `identity`: effective identity composition
//! - `pipeline`: the staged per-request decision

pub mod credentials;
pub mod emulation;
pub mod identity;
pub mod jwt;
pub mod pipeline;
pub mod policy;
pub mod session;

pub use credentials::{CredentialBackend, Credentials, InspectedToken, JwtCredentialBackend};
pub use emulation::EmulationService;
pub use identity::compose;
pub use jwt::{Claims, JwtDecoder, JwtEncoder, TokenPair, TokenType};
pub use pipeline::{Pipeline, PipelineDeps, RequestState, Stage, StageOutcome};
pub use policy::{AccessDecision, PathPattern, RolePolicy, RoleRegistry, evaluate};
pub use session::{ResolvedSession, SessionResolver};
