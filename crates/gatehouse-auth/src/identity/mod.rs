//! Effective identity composition.

pub mod composer;

pub use composer::compose;
