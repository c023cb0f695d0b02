//! # gatehouse-core
//!
//! Core crate for Gatehouse. Contains configuration schemas, the unified
//! error system, and the clock abstraction every time comparison goes through.
//!
//! This crate has **no** internal dependencies on other Gatehouse crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use traits::clock::{Clock, ManualClock, SystemClock};
