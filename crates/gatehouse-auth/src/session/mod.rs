//! Session resolution.

pub mod resolver;

pub use resolver::{ResolvedSession, SessionResolver};
