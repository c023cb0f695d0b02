//! # gatehouse-api
//!
//! HTTP surface for Gatehouse built on Axum.
//!
//! Every request passes a guard that runs the authorization pipeline before
//! any handler. Page requests get redirects; API requests get status codes.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
