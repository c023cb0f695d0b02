//! Path policy: pattern matching, the role policy registry, and the access
//! evaluator built on both.

pub mod evaluator;
pub mod matcher;
pub mod registry;

pub use evaluator::{AccessDecision, evaluate};
pub use matcher::{PathPattern, normalize_path};
pub use registry::{RolePolicy, RoleRegistry};
