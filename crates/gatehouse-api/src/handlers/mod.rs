//! HTTP request handlers.

pub mod auth;
pub mod emulation;
pub mod health;
pub mod page;
